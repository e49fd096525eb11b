//! # Archivos JSON de Configuración
//! src/store/json_file.rs
//!
//! Un documento JSON libre por archivo. Si el archivo no existe se
//! devuelve una forma por defecto; al guardar se escribe con indentación
//! de 4 espacios.

use crate::error::StoreResult;
use crate::store::atomic_write;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const CONFIG_FILE: &str = "config.json";
pub const PROTECTED_DIRS_FILE: &str = "protected_dirs.json";

/// Store de un documento JSON
pub struct JsonStore {
    path: PathBuf,
    default: Value,

    /// Serializa escrituras concurrentes sobre el mismo `.tmp`
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>, default: Value) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            default,
            write_lock: Mutex::new(()),
        }
    }

    /// `config.json` con credenciales de Sonarr/Radarr
    pub fn config(work_dir: &Path) -> Self {
        Self::new(
            work_dir.join(CONFIG_FILE),
            json!({
                "sonarr": {"url": "", "api_key": ""},
                "radarr": {"url": "", "api_key": ""}
            }),
        )
    }

    /// `protected_dirs.json` con los directorios que el script no toca
    pub fn protected_dirs(work_dir: &Path) -> Self {
        Self::new(work_dir.join(PROTECTED_DIRS_FILE), json!({"protected_dirs": []}))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lee el documento o retorna la forma por defecto si no existe
    pub fn get(&self) -> StoreResult<Value> {
        if !self.path.exists() {
            return Ok(self.default.clone());
        }
        let contents = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Reemplaza el documento completo
    pub fn set(&self, value: &Value) -> StoreResult<()> {
        let mut contents = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut contents, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut serializer)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        atomic_write(&self.path, &contents)?;
        Ok(())
    }
}
