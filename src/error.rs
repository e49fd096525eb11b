//! # Errores del Servidor
//! src/error.rs
//!
//! Errores tipados del subsistema de jobs y de los stores en disco.

use std::io;
use std::result;
use thiserror::Error;

/// Errores del ciclo de vida de un job
#[derive(Error, Debug)]
pub enum JobError {
    /// Ya hay un proceso en ejecución (single-flight)
    #[error("A process is already running")]
    AlreadyRunning,

    /// El programa externo no se pudo iniciar
    #[error("Failed to start process: {0}")]
    Launch(#[source] io::Error),

    /// Error de lectura sobre stdout/stderr a mitad de ejecución
    #[error("Failed to read process output: {0}")]
    Stream(#[source] io::Error),

    /// No se pudo crear el thread de background
    #[error("Failed to spawn job worker: {0}")]
    Worker(#[source] io::Error),
}

/// Errores de los stores de configuración y reportes
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found")]
    NotFound,

    #[error("Invalid file type")]
    InvalidType,

    /// El body recibido no tiene la forma esperada
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type JobResult<T> = result::Result<T, JobError>;
pub type StoreResult<T> = result::Result<T, StoreError>;
