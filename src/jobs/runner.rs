//! # Ejecución del Proceso Externo
//! src/jobs/runner.rs
//!
//! Lanza el script de limpieza como proceso hijo y expone su salida
//! combinada (stdout + stderr) como un iterador perezoso de líneas.
//!
//! ## Flujo
//!
//! ```text
//! spawn(args) ──► RunningProcess ──next()──► OutputLine ... ──finish()──► ExitOutcome
//!                    ▲        ▲
//!             thread stdout  thread stderr   (mpsc, orden de llegada)
//! ```

use crate::error::{JobError, JobResult};
use crate::jobs::status::OutputLine;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, warn};

/// Resultado final del proceso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Código de salida; `-signal` si lo mató una señal
    pub code: i32,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Sabe cómo lanzar el programa externo
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Ejecutable (ej: "bash")
    program: String,

    /// Argumentos fijos antes de los flags del request (ej: "./media_cleanup.sh")
    base_args: Vec<String>,

    /// Directorio de trabajo del hijo
    work_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, base_args: Vec<String>, work_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            base_args,
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Línea de comando completa, para logs
    pub fn command_line(&self, args: &[String]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.base_args.iter().cloned())
            .chain(args.iter().cloned())
            .collect()
    }

    /// Lanza el proceso con `args` agregados después de los argumentos base.
    ///
    /// # Errores
    ///
    /// `JobError::Launch` si el ejecutable no se puede iniciar,
    /// `JobError::Worker` si no se pudieron crear los threads lectores.
    pub fn spawn(&self, args: &[String]) -> JobResult<RunningProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(JobError::Launch)?;

        debug!(pid = child.id(), program = %self.program, "proceso hijo iniciado");

        let (tx, lines) = mpsc::channel();
        let pipes = (child.stdout.take(), child.stderr.take());
        let started = match pipes {
            (Some(stdout), Some(stderr)) => pump("job-stdout", stdout, tx.clone())
                .and_then(|_| pump("job-stderr", stderr, tx)),
            _ => Err(io::Error::new(io::ErrorKind::BrokenPipe, "child pipes not captured")),
        };

        if let Err(e) = started {
            let _ = child.kill();
            let _ = child.wait();
            return Err(JobError::Worker(e));
        }

        Ok(RunningProcess {
            child,
            lines,
            stream_error: None,
        })
    }
}

/// Proceso en ejecución.
///
/// Itera las líneas a medida que llegan; el iterador termina cuando ambos
/// pipes llegan a EOF o ante el primer error de lectura. Después hay que
/// llamar a [`RunningProcess::finish`].
pub struct RunningProcess {
    child: Child,
    lines: Receiver<io::Result<OutputLine>>,
    stream_error: Option<io::Error>,
}

impl RunningProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Espera a que termine el hijo.
    ///
    /// Si el stream se cortó por un error de I/O se reporta como
    /// `JobError::Stream` aunque el proceso haya salido con 0.
    pub fn finish(mut self) -> JobResult<ExitOutcome> {
        let status = self.child.wait().map_err(JobError::Stream)?;

        if let Some(e) = self.stream_error.take() {
            return Err(JobError::Stream(e));
        }

        Ok(ExitOutcome {
            code: exit_code(status),
        })
    }
}

impl Iterator for RunningProcess {
    type Item = OutputLine;

    fn next(&mut self) -> Option<OutputLine> {
        if self.stream_error.is_some() {
            return None;
        }

        match self.lines.recv() {
            Ok(Ok(line)) => Some(line),
            Ok(Err(e)) => {
                warn!(error = %e, "error leyendo la salida del proceso");
                self.stream_error = Some(e);
                None
            }
            // Ambos lectores terminaron
            Err(_) => None,
        }
    }
}

/// Lee `source` línea por línea y envía cada una al canal
fn pump<R>(name: &str, source: R, tx: Sender<io::Result<OutputLine>>) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(strip_newline(&buf)).into_owned();
                    if tx.send(Ok(OutputLine::now(text))).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    })?;
    Ok(())
}

fn strip_newline(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
