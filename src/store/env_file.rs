//! # Variables de Entorno del Script
//! src/store/env_file.rs
//!
//! Lee y escribe el `.env` que consume el script de limpieza.
//!
//! ```text
//! # comentario         → ignorado
//! SONARR_URL=http://x  → {"SONARR_URL": "http://x"}
//! TOKEN=a=b            → {"TOKEN": "a=b"}   (se corta en el primer '=')
//! sin_igual            → ignorado
//! ```

use crate::error::{StoreError, StoreResult};
use crate::store::atomic_write;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const ENV_FILE: &str = ".env";

pub struct EnvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EnvStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(work_dir: &Path) -> Self {
        Self::new(work_dir.join(ENV_FILE))
    }

    /// Variables del archivo; vacío si no existe
    pub fn get(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(parse_env(&contents))
    }

    /// Reescribe el archivo completo con una línea `KEY=VALUE` por entrada.
    ///
    /// Solo se aceptan valores escalares; `null` se escribe vacío.
    pub fn set(&self, vars: &Map<String, Value>) -> StoreResult<()> {
        let mut contents = String::new();

        for (key, value) in vars {
            if key.is_empty() || key.contains(['=', '\n', '\r']) {
                return Err(StoreError::InvalidPayload(format!("invalid variable name: {:?}", key)));
            }
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => {
                    return Err(StoreError::InvalidPayload(format!(
                        "value of {} must be a string, number or boolean",
                        key
                    )))
                }
            };
            if value.contains(['\n', '\r']) {
                return Err(StoreError::InvalidPayload(format!("value of {} spans multiple lines", key)));
            }
            contents.push_str(&format!("{}={}\n", key, value));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        atomic_write(&self.path, contents.as_bytes())?;
        Ok(())
    }
}

fn parse_env(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_env() {
        let vars = parse_env("# header\n\nSONARR_URL=http://sonarr\nTOKEN=a=b\nbroken line\n  SPACED=1  \n");

        assert_eq!(vars.len(), 3);
        assert_eq!(vars["SONARR_URL"], "http://sonarr");
        assert_eq!(vars["TOKEN"], "a=b");
        assert_eq!(vars["SPACED"], "1");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EnvStore::in_dir(dir.path()).get().unwrap().is_empty());
    }

    #[test]
    fn test_set_writes_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvStore::in_dir(dir.path());
        let vars = json!({"DRY_RUN": true, "MIN_SIZE": 500, "NAME": "movies", "EMPTY": null});

        store.set(vars.as_object().unwrap()).unwrap();

        let text = fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert_eq!(text, "DRY_RUN=true\nEMPTY=\nMIN_SIZE=500\nNAME=movies\n");
        assert_eq!(store.get().unwrap()["NAME"], "movies");
    }

    #[test]
    fn test_set_rejects_nested_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvStore::in_dir(dir.path());
        let vars = json!({"LIST": [1, 2]});

        let result = store.set(vars.as_object().unwrap());
        assert!(matches!(result, Err(StoreError::InvalidPayload(_))));
        assert!(!dir.path().join(ENV_FILE).exists());
    }

    #[test]
    fn test_set_rejects_multiline_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvStore::in_dir(dir.path());
        let vars = json!({"A": "x\nB=injected"});

        assert!(store.set(vars.as_object().unwrap()).is_err());
    }
}
