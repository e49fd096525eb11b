//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección de métricas del servidor para `GET /metrics`:
//! - Contadores de requests por código y por ruta
//! - Latencias (p50, p95, p99)
//! - Conexiones activas
//! - Contadores de ejecuciones del job

pub mod collector;

pub use collector::{LatencySummary, MetricsCollector};
