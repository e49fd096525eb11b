//! # Sistema de Jobs
//!
//! Ejecuta el script de limpieza en background, un solo job a la vez,
//! sin bloquear las conexiones HTTP.
//!
//! ## Componentes
//!
//! - `runner`: lanza el proceso y expone su salida línea por línea
//! - `status`: registro compartido `{running, output, error}` y su lector
//! - `controller`: single-flight + thread de background
//! - `options`: payload de `/api/run` → flags del script
//!
//! ## Endpoints
//!
//! - `POST /api/run` - Lanzar el script
//! - `GET /api/status` - Consultar estado y salida acumulada

pub mod controller;
pub mod handlers;
pub mod options;
pub mod runner;
pub mod status;

pub use controller::{JobController, RunStats};
pub use options::{RunOptions, ScriptType};
pub use runner::{ExitOutcome, ProcessRunner, RunningProcess};
pub use status::{JobStatus, JobStatusSnapshot, OutputLine, SharedStatus, StatusQuery};
