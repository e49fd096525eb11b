//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de limpieza con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./cleanup_server --port 5000 \
//!   --work-dir /srv/media-cleanup \
//!   --runner bash --runner-arg ./media_cleanup.sh
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=5000 WORK_DIR=/srv/media-cleanup ./cleanup_server
//! ```

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::info;

/// Configuración del servidor HTTP/1.0
#[derive(Debug, Clone, Parser)]
#[command(name = "cleanup_server")]
#[command(about = "Servidor HTTP de control para el script de limpieza de medios")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "5000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio de trabajo del script: config, .env y reportes viven acá
    #[arg(long = "work-dir", default_value = ".", env = "WORK_DIR")]
    pub work_dir: PathBuf,

    /// Directorio con `index.html`
    #[arg(long = "static-dir", default_value = "./templates", env = "STATIC_DIR")]
    pub static_dir: PathBuf,

    // === Script ===

    /// Programa que ejecuta el script
    #[arg(long, default_value = "bash", env = "RUNNER")]
    pub runner: String,

    /// Argumentos fijos antes de los flags de cada ejecución
    #[arg(
        long = "runner-arg",
        default_value = "./media_cleanup.sh",
        env = "RUNNER_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub runner_args: Vec<String>,

    // === Límites ===

    /// Tamaño máximo de un request (headers + body) en bytes
    #[arg(long = "max-request-bytes", default_value = "1048576", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Verbosidad de logs (-v debug, -vv trace); `RUST_LOG` tiene prioridad
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use cleanup_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:5000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Nivel de log por defecto según `-v`
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.runner.trim().is_empty() {
            return Err("Runner program must not be empty".to_string());
        }
        if self.max_request_bytes == 0 {
            return Err("Max request bytes must be > 0".to_string());
        }
        Ok(())
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            work_dir = %self.work_dir.display(),
            static_dir = %self.static_dir.display(),
            "configuración de red"
        );
        info!(
            runner = %self.runner,
            args = ?self.runner_args,
            max_request_bytes = self.max_request_bytes,
            "configuración del script"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            work_dir: PathBuf::from("."),
            static_dir: PathBuf::from("./templates"),
            runner: "bash".to_string(),
            runner_args: vec!["./media_cleanup.sh".to_string()],
            max_request_bytes: 1024 * 1024,
            verbose: 0,
        }
    }
}
