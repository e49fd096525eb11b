//! # Reportes del Script
//! src/store/reports.rs
//!
//! El script deja sus resultados en el directorio de trabajo como
//! `*_report.json` o `*_duplicates.json` (prefijo vacío incluido). Este store los lista
//! y los sirve; cualquier otro archivo queda fuera.

use crate::error::{StoreError, StoreResult};
use crate::jobs::status::format_timestamp;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Entrada de `GET /api/reports`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,

    /// Tamaño en bytes
    pub size: u64,

    /// Última modificación, hora local ISO-8601
    pub modified: String,
}

/// Nombre simple (sin separadores) con uno de los dos sufijos permitidos
pub fn is_report_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^/\\]*_(report|duplicates)\.json$").expect("static regex"))
        .is_match(name)
}

pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Lista los reportes ordenados por nombre
    pub fn list(&self) -> StoreResult<Vec<ReportEntry>> {
        let mut reports = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !is_report_name(&name) {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let modified: DateTime<Local> = metadata.modified()?.into();
            reports.push(ReportEntry {
                name,
                size: metadata.len(),
                modified: format_timestamp(modified.naive_local()),
            });
        }

        reports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(reports)
    }

    /// Contenido de un reporte.
    ///
    /// # Errores
    ///
    /// - `InvalidType` si el nombre no es de reporte (se valida primero)
    /// - `NotFound` si el archivo no existe
    pub fn get(&self, name: &str) -> StoreResult<Vec<u8>> {
        if !is_report_name(name) {
            return Err(StoreError::InvalidType);
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StoreError::NotFound);
        }

        Ok(fs::read(path)?)
    }
}
