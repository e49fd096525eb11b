//! # Estado del Job
//! src/jobs/status.rs
//!
//! Registro único y compartido del job en curso. Lo crea el servidor al
//! arrancar y lo reciben por inyección el [`JobController`] (escritor) y
//! el [`StatusQuery`] (lector).
//!
//! Todas las lecturas y escrituras pasan por un único `Mutex`, así el
//! test-and-set de `running` es atómico y un lector nunca ve un `output`
//! reordenado.
//!
//! [`JobController`]: crate::jobs::JobController

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle compartido al registro de estado
pub type SharedStatus = Arc<Mutex<JobStatus>>;

/// Una línea de salida del proceso con su hora de captura
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Hora local ISO-8601 con microsegundos
    pub timestamp: String,

    /// Texto sin el salto de línea final
    pub line: String,
}

impl OutputLine {
    /// Envuelve una línea con la hora actual
    pub fn now(line: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp_now(),
            line: line.into(),
        }
    }
}

/// Copia del estado tal como se entrega en `GET /api/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub running: bool,
    pub output: Vec<OutputLine>,
    pub error: Option<String>,
}

/// Estado mutable del job
#[derive(Debug, Default)]
pub struct JobStatus {
    running: bool,
    output: Vec<OutputLine>,
    error: Option<String>,
}

impl JobStatus {
    /// Crea el registro inicial (`running=false`, sin salida, sin error)
    pub fn shared() -> SharedStatus {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Test-and-set de `running`.
    ///
    /// Si no había job, lo marca en ejecución y reinicia `output` y `error`.
    /// Retorna `false` sin tocar nada si ya había uno corriendo.
    pub fn try_begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.output.clear();
        self.error = None;
        true
    }

    pub fn push_line(&mut self, line: OutputLine) {
        self.output.push(line);
    }

    /// Cierra el job: registra el error (si hubo) y baja `running`.
    ///
    /// Ambos cambios ocurren bajo el mismo lock, así ningún lector ve
    /// `running=true` junto con un `error`.
    pub fn finish(&mut self, error: Option<String>) {
        if error.is_some() {
            self.error = error;
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn snapshot(&self) -> JobStatusSnapshot {
        JobStatusSnapshot {
            running: self.running,
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

/// Toma el lock recuperándose de un envenenamiento.
///
/// Un panic en el worker no debe dejar `/api/status` inutilizable.
pub fn lock_status(status: &SharedStatus) -> MutexGuard<'_, JobStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Acceso de solo lectura al estado para los handlers HTTP
#[derive(Clone)]
pub struct StatusQuery {
    status: SharedStatus,
}

impl StatusQuery {
    pub fn new(status: SharedStatus) -> Self {
        Self { status }
    }

    /// Retorna una copia del estado actual.
    ///
    /// El lock solo se mantiene durante la copia; nunca espera al job.
    pub fn get_status(&self) -> JobStatusSnapshot {
        lock_status(&self.status).snapshot()
    }
}

/// Hora local en formato `YYYY-MM-DDTHH:MM:SS.ffffff`
pub fn timestamp_now() -> String {
    format_timestamp(Local::now().naive_local())
}

pub fn format_timestamp(time: chrono::NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let status = JobStatus::shared();
        let snapshot = StatusQuery::new(status).get_status();
        assert_eq!(snapshot, JobStatusSnapshot::default());
    }

    #[test]
    fn test_try_begin_resets_output_and_error() {
        let mut status = JobStatus::default();
        status.push_line(OutputLine::now("old"));
        status.finish(Some("Process exited with code 1".to_string()));

        assert!(status.try_begin());
        let snapshot = status.snapshot();
        assert!(snapshot.running);
        assert!(snapshot.output.is_empty());
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_try_begin_while_running_changes_nothing() {
        let mut status = JobStatus::default();
        assert!(status.try_begin());
        status.push_line(OutputLine::now("first"));

        assert!(!status.try_begin());
        let snapshot = status.snapshot();
        assert_eq!(snapshot.output.len(), 1);
        assert_eq!(snapshot.output[0].line, "first");
    }

    #[test]
    fn test_finish_sets_error_and_clears_running() {
        let mut status = JobStatus::default();
        assert!(status.try_begin());
        status.push_line(OutputLine::now("partial"));

        status.finish(Some("Process exited with code 3".to_string()));
        let snapshot = status.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.output.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some("Process exited with code 3"));
    }

    #[test]
    fn test_finish_without_error() {
        let mut status = JobStatus::default();
        assert!(status.try_begin());

        status.finish(None);
        let snapshot = status.snapshot();
        assert!(!snapshot.running);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let status = JobStatus::shared();
        let query = StatusQuery::new(status.clone());
        lock_status(&status).try_begin();

        let before = query.get_status();
        lock_status(&status).push_line(OutputLine::now("later"));

        assert!(before.output.is_empty());
        assert_eq!(query.get_status().output.len(), 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = JobStatusSnapshot {
            running: false,
            output: vec![OutputLine {
                timestamp: "2024-05-01T13:45:12.123456".to_string(),
                line: "hello".to_string(),
            }],
            error: None,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "running": false,
                "output": [{"timestamp": "2024-05-01T13:45:12.123456", "line": "hello"}],
                "error": null
            })
        );
    }

    #[test]
    fn test_timestamp_format() {
        let time = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(13, 45, 12, 123_456)
            .unwrap();
        assert_eq!(format_timestamp(time), "2024-05-01T13:45:12.123456");
        assert_eq!(timestamp_now().len(), "2024-05-01T13:45:12.123456".len());
    }
}
