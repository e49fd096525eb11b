//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas del servidor en tiempo real.

use crate::jobs::RunStats;
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar para los percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
    started_at: DateTime<Local>,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,

    /// Requests por código de estado
    status_codes: HashMap<u16, u64>,

    /// Ventana de latencias (microsegundos), las más antiguas salen primero
    latencies: VecDeque<u64>,

    requests_per_path: HashMap<String, u64>,

    active_connections: u64,
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub stddev: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
            started_at: Local::now(),
        }
    }

    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un request ya respondido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.data();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_path.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn connection_opened(&self) {
        self.data().active_connections += 1;
    }

    pub fn connection_closed(&self) {
        let mut data = self.data();
        data.active_connections = data.active_connections.saturating_sub(1);
    }

    pub fn active_connections(&self) -> u64 {
        self.data().active_connections
    }

    pub fn total_requests(&self) -> u64 {
        self.data().total_requests
    }

    pub fn latency_summary(&self) -> LatencySummary {
        summarize(&self.data().latencies)
    }

    /// Documento de `GET /metrics`
    pub fn to_json(&self, runs: &RunStats) -> Value {
        let data = self.data();
        let latency = summarize(&data.latencies);

        let status_codes: serde_json::Map<String, Value> = data
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), json!(count)))
            .collect();

        // Top 10 rutas más accedidas
        let mut paths: Vec<_> = data.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths: Vec<Value> = paths
            .into_iter()
            .take(10)
            .map(|(path, count)| json!({"path": path, "count": count}))
            .collect();

        json!({
            "server": {
                "uptime_seconds": self.start_time.elapsed().as_secs(),
                "start_time": self.started_at.to_rfc3339(),
            },
            "requests": {
                "total": data.total_requests,
                "active_connections": data.active_connections,
                "status_codes": status_codes,
                "top_paths": top_paths,
            },
            "latency_us": {
                "p50": latency.p50,
                "p95": latency.p95,
                "p99": latency.p99,
                "avg": latency.avg,
                "stddev": (latency.stddev * 100.0).round() / 100.0,
                "samples": data.latencies.len(),
            },
            "jobs": runs.to_json(),
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(latencies: &VecDeque<u64>) -> LatencySummary {
    if latencies.is_empty() {
        return LatencySummary::default();
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let avg = sorted.iter().sum::<u64>() / len as u64;
    let variance = sorted
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / len as f64;

    LatencySummary {
        p50: sorted[len * 50 / 100],
        p95: sorted[len * 95 / 100],
        p99: sorted[len * 99 / 100],
        avg,
        stddev: variance.sqrt(),
    }
}
