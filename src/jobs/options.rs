//! # Opciones de Ejecución
//! src/jobs/options.rs
//!
//! Traduce el payload de `POST /api/run` a la lista de flags que recibe
//! el script de limpieza.
//!
//! ```text
//! {"script_type": "find_only", "options": {"dry_run": true, "filter": "movies"}}
//!     → ["--find-only", "--dry-run", "--filter=movies"]
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Modo de ejecución del script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    /// Buscar y limpiar (sin flag extra)
    #[default]
    Full,

    /// Solo buscar candidatos
    FindOnly,

    /// Solo limpiar a partir de un reporte previo
    CleanupOnly,
}

impl ScriptType {
    /// Flag que activa este modo, si tiene uno
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            ScriptType::Full => None,
            ScriptType::FindOnly => Some("--find-only"),
            ScriptType::CleanupOnly => Some("--cleanup-only"),
        }
    }
}

/// Body de `POST /api/run` tal como llega por la red
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub script_type: ScriptType,

    #[serde(default)]
    pub options: RunFlags,
}

/// Sub-objeto `options` del body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFlags {
    #[serde(default)]
    pub dry_run: Option<bool>,

    #[serde(default)]
    pub auto: Option<bool>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub filter: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub min_size: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub max_size: Option<String>,
}

/// Opciones tipadas de una ejecución.
///
/// Se construyen una vez por request y se consumen al armar el argv.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub script_type: ScriptType,
    pub dry_run: bool,
    pub auto: bool,
    pub filter: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
}

impl RunOptions {
    /// Parsea el body JSON de `POST /api/run`; un body vacío es un error
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let request: RunRequest = serde_json::from_slice(body)?;
        Ok(request.into())
    }

    /// Construye la lista de flags para el script.
    ///
    /// El orden es fijo: modo, `--dry-run`, `--auto`, `--filter`,
    /// `--min-size`, `--max-size`. Los valores vacíos se omiten.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(flag) = self.script_type.flag() {
            args.push(flag.to_string());
        }
        if self.dry_run {
            args.push("--dry-run".to_string());
        }
        if self.auto {
            args.push("--auto".to_string());
        }

        let valued = [
            ("--filter", &self.filter),
            ("--min-size", &self.min_size),
            ("--max-size", &self.max_size),
        ];
        for (flag, value) in valued {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                args.push(format!("{}={}", flag, value));
            }
        }

        args
    }
}

impl From<RunRequest> for RunOptions {
    fn from(request: RunRequest) -> Self {
        let flags = request.options;
        Self {
            script_type: request.script_type,
            dry_run: flags.dry_run.unwrap_or(false),
            auto: flags.auto.unwrap_or(false),
            filter: flags.filter,
            min_size: flags.min_size,
            max_size: flags.max_size,
        }
    }
}

/// Acepta `"500M"`, `500` o `null`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}
