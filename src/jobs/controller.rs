//! # Controlador de Jobs
//! src/jobs/controller.rs
//!
//! Orquesta `POST /api/run`:
//!
//! 1. Test-and-set atómico de `running` (single-flight)
//! 2. Armado del argv a partir de [`RunOptions`]
//! 3. Lanzamiento del proceso en un thread de background
//! 4. Volcado incremental de la salida al [`JobStatus`]
//! 5. Registro del error y liberación de `running` al terminar
//!
//! El request HTTP retorna apenas el job queda aceptado; el thread
//! `job-runner` vive más que la conexión que lo creó.
//!
//! [`JobStatus`]: crate::jobs::status::JobStatus

use crate::error::{JobError, JobResult};
use crate::jobs::options::RunOptions;
use crate::jobs::runner::{ExitOutcome, ProcessRunner};
use crate::jobs::status::{lock_status, SharedStatus};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// Contadores de ejecuciones para `/metrics`
#[derive(Debug, Default)]
pub struct RunStats {
    started: AtomicU64,
    rejected: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl RunStats {
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "started": self.started(),
            "rejected": self.rejected(),
            "succeeded": self.succeeded(),
            "failed": self.failed(),
        })
    }
}

/// Punto de entrada para lanzar el job
pub struct JobController {
    runner: ProcessRunner,
    status: SharedStatus,
    stats: Arc<RunStats>,
}

impl JobController {
    pub fn new(runner: ProcessRunner, status: SharedStatus) -> Self {
        Self {
            runner,
            status,
            stats: Arc::new(RunStats::default()),
        }
    }

    /// Acepta o rechaza una ejecución.
    ///
    /// Retorna `Ok(())` en cuanto el worker quedó lanzado, sin esperar al
    /// proceso. Con un job en curso retorna `JobError::AlreadyRunning` sin
    /// tocar el estado.
    pub fn start_run(&self, options: RunOptions) -> JobResult<()> {
        let args = options.to_args();

        if !lock_status(&self.status).try_begin() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            info!("run rechazado: ya hay un proceso en ejecución");
            return Err(JobError::AlreadyRunning);
        }
        self.stats.started.fetch_add(1, Ordering::Relaxed);

        let worker = Worker {
            runner: self.runner.clone(),
            status: Arc::clone(&self.status),
            stats: Arc::clone(&self.stats),
        };

        let spawned = thread::Builder::new()
            .name("job-runner".to_string())
            .spawn(move || worker.run(args));

        if let Err(e) = spawned {
            let err = JobError::Worker(e);
            lock_status(&self.status).finish(Some(err.to_string()));
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            error!(error = %err, "no se pudo lanzar el worker del job");
            return Err(err);
        }

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock_status(&self.status).is_running()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}

/// Lo que se mueve al thread `job-runner`
struct Worker {
    runner: ProcessRunner,
    status: SharedStatus,
    stats: Arc<RunStats>,
}

impl Worker {
    fn run(self, args: Vec<String>) {
        // Se declara primero: se libera último, con el error ya decidido
        let mut release = RunningGuard {
            status: Arc::clone(&self.status),
            error: None,
        };

        info!(command = ?self.runner.command_line(&args), "iniciando job");

        match self.execute(&args) {
            Ok(outcome) if outcome.is_success() => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                info!("job terminado correctamente");
            }
            Ok(outcome) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(code = outcome.code, "job terminó con código distinto de cero");
                release.error = Some(format!("Process exited with code {}", outcome.code));
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "job falló");
                release.error = Some(e.to_string());
            }
        }
    }

    fn execute(&self, args: &[String]) -> JobResult<ExitOutcome> {
        let mut process = self.runner.spawn(args)?;
        info!(pid = process.pid(), "proceso lanzado");

        for line in process.by_ref() {
            lock_status(&self.status).push_line(line);
        }

        process.finish()
    }
}

/// Baja `running` al salir del worker por cualquier camino, panic incluido
struct RunningGuard {
    status: SharedStatus,
    error: Option<String>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let error = if thread::panicking() {
            Some("Job worker panicked".to_string())
        } else {
            self.error.take()
        };
        lock_status(&self.status).finish(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::options::ScriptType;
    use crate::jobs::status::{JobStatus, JobStatusSnapshot, StatusQuery};
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};

    fn controller(script: &str) -> (JobController, StatusQuery) {
        let status = JobStatus::shared();
        let runner = ProcessRunner::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "runner".to_string()],
            std::env::temp_dir(),
        );
        (
            JobController::new(runner, Arc::clone(&status)),
            StatusQuery::new(status),
        )
    }

    fn wait_idle(query: &StatusQuery) -> JobStatusSnapshot {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let snapshot = query.get_status();
            if !snapshot.running {
                return snapshot;
            }
            assert!(Instant::now() < deadline, "job did not finish in time");
            thread::sleep(Duration::from_millis(10));
        }
    }

    // ==================== Ejecución normal ====================

    #[test]
    fn test_successful_run_collects_output() {
        let (controller, query) = controller("echo hello; echo world");
        controller.start_run(RunOptions::default()).unwrap();

        let snapshot = wait_idle(&query);
        let lines: Vec<&str> = snapshot.output.iter().map(|l| l.line.as_str()).collect();
        assert_eq!(lines, vec!["hello", "world"]);
        assert!(snapshot.error.is_none());
        assert_eq!(controller.stats().succeeded(), 1);
    }

    #[test]
    fn test_options_reach_the_process() {
        let (controller, query) = controller(r#"for a in "$@"; do echo "$a"; done"#);
        let options = RunOptions {
            script_type: ScriptType::FindOnly,
            dry_run: true,
            filter: Some("movies".to_string()),
            ..RunOptions::default()
        };
        controller.start_run(options).unwrap();

        let lines: Vec<String> = wait_idle(&query).output.into_iter().map(|l| l.line).collect();
        assert_eq!(lines, vec!["--find-only", "--dry-run", "--filter=movies"]);
    }

    // ==================== Errores ====================

    #[test]
    fn test_nonzero_exit_sets_error() {
        let (controller, query) = controller("echo partial; exit 7");
        controller.start_run(RunOptions::default()).unwrap();

        let snapshot = wait_idle(&query);
        assert_eq!(snapshot.error.as_deref(), Some("Process exited with code 7"));
        assert_eq!(snapshot.output.len(), 1);
        assert_eq!(controller.stats().failed(), 1);
    }

    #[test]
    fn test_launch_failure_clears_running() {
        let status = JobStatus::shared();
        let runner = ProcessRunner::new("/nonexistent/cleanup-runner", vec![], std::env::temp_dir());
        let controller = JobController::new(runner, Arc::clone(&status));
        let query = StatusQuery::new(status);

        controller.start_run(RunOptions::default()).unwrap();

        let snapshot = wait_idle(&query);
        let error = snapshot.error.expect("launch failure must be recorded");
        assert!(error.starts_with("Failed to start process"));
        assert!(snapshot.output.is_empty());
        assert!(!controller.is_running());
    }

    #[test]
    fn test_error_never_visible_while_running() {
        let (controller, query) = controller("exit 3");
        let stop = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicU64::new(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let query = query.clone();
                let stop = Arc::clone(&stop);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let snapshot = query.get_status();
                        if snapshot.running && snapshot.error.is_some() {
                            overlaps.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            controller.start_run(RunOptions::default()).unwrap();
            let snapshot = wait_idle(&query);
            assert_eq!(snapshot.error.as_deref(), Some("Process exited with code 3"));
        }

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::Relaxed), 0);
        assert_eq!(controller.stats().failed(), 50);
    }

    // ==================== Single-flight ====================

    #[test]
    fn test_second_start_is_rejected_without_side_effects() {
        let (controller, query) = controller("echo started; sleep 1");
        controller.start_run(RunOptions::default()).unwrap();

        // Esperar a que aparezca la primera línea
        let deadline = Instant::now() + Duration::from_secs(5);
        while query.get_status().output.is_empty() {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(10));
        }
        let before = query.get_status();

        let second = controller.start_run(RunOptions::default());
        assert!(matches!(second, Err(JobError::AlreadyRunning)));

        let after = query.get_status();
        assert!(after.running);
        assert_eq!(after.output, before.output);
        assert_eq!(after.error, before.error);
        assert_eq!(controller.stats().rejected(), 1);

        wait_idle(&query);
    }

    #[test]
    fn test_concurrent_starts_accept_exactly_one() {
        let (controller, query) = controller("sleep 1");
        let controller = Arc::new(controller);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                thread::spawn(move || controller.start_run(RunOptions::default()).is_ok())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(controller.stats().rejected(), 7);
        wait_idle(&query);
    }

    #[test]
    fn test_start_returns_before_job_finishes() {
        let (controller, query) = controller("sleep 2");
        let start = Instant::now();
        controller.start_run(RunOptions::default()).unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(query.get_status().running);
        wait_idle(&query);
    }

    // ==================== Estado ====================

    #[test]
    fn test_new_run_resets_previous_state() {
        let (controller, query) = controller("echo line; exit 1");
        controller.start_run(RunOptions::default()).unwrap();
        assert!(wait_idle(&query).error.is_some());

        controller.start_run(RunOptions::default()).unwrap();
        let snapshot = wait_idle(&query);
        // Solo la salida de la segunda corrida
        assert_eq!(snapshot.output.len(), 1);
        assert_eq!(controller.stats().started(), 2);
    }

    #[test]
    fn test_output_grows_monotonically() {
        let (controller, query) =
            controller("i=0; while [ $i -lt 20 ]; do echo line-$i; i=$((i+1)); sleep 0.01; done");
        controller.start_run(RunOptions::default()).unwrap();

        let mut previous = query.get_status().output;
        loop {
            let snapshot = query.get_status();
            assert!(snapshot.output.len() >= previous.len());
            assert_eq!(&snapshot.output[..previous.len()], &previous[..]);
            previous = snapshot.output;
            if !snapshot.running {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let expected: Vec<String> = (0..20).map(|i| format!("line-{}", i)).collect();
        let lines: Vec<String> = previous.into_iter().map(|l| l.line).collect();
        assert_eq!(lines, expected);
    }
}
