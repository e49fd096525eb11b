//! # Handlers HTTP de los Stores
//! src/store/handlers.rs
//!
//! - `GET|POST /api/config`
//! - `GET|POST /api/protected-dirs`
//! - `GET|POST /api/env`
//! - `GET /api/reports`, `GET /api/reports/<name>`
//! - `GET /` (página estática)

use crate::error::StoreError;
use crate::http::{Request, Response, StatusCode};
use crate::store::{EnvStore, JsonStore, ReportStore};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const REPORTS_PREFIX: &str = "/api/reports/";

/// Traduce un `StoreError` a la respuesta que ve el cliente
pub fn store_error_response(err: &StoreError) -> Response {
    match err {
        StoreError::NotFound => Response::error(StatusCode::NotFound, &err.to_string()),
        StoreError::InvalidType => Response::error(StatusCode::BadRequest, &err.to_string()),
        StoreError::InvalidPayload(_) => Response::outcome(StatusCode::BadRequest, false, &err.to_string()),
        StoreError::Io(_) | StoreError::Json(_) => {
            error!(error = %err, "error de disco en store");
            Response::error(StatusCode::InternalServerError, &err.to_string())
        }
    }
}

fn invalid_body(err: &serde_json::Error) -> Response {
    Response::outcome(StatusCode::BadRequest, false, &format!("Invalid JSON body: {}", err))
}

/// `GET /api/config` y `GET /api/protected-dirs`
pub fn get_json(store: &JsonStore) -> Response {
    match store.get() {
        Ok(value) => Response::json(StatusCode::Ok, &value),
        Err(e) => store_error_response(&e),
    }
}

/// `POST /api/config` y `POST /api/protected-dirs`
pub fn save_json(req: &Request, store: &JsonStore, message: &str) -> Response {
    let value: Value = match req.json() {
        Ok(value) => value,
        Err(e) => return invalid_body(&e),
    };

    match store.set(&value) {
        Ok(()) => {
            info!(path = %store.path().display(), "documento guardado");
            Response::outcome(StatusCode::Ok, true, message)
        }
        Err(e) => store_error_response(&e),
    }
}

/// `GET /api/env`
pub fn get_env(store: &EnvStore) -> Response {
    match store.get() {
        Ok(vars) => Response::json(StatusCode::Ok, &vars),
        Err(e) => store_error_response(&e),
    }
}

/// `POST /api/env`; el body tiene que ser un objeto
pub fn save_env(req: &Request, store: &EnvStore) -> Response {
    let vars = match req.json::<Value>() {
        Ok(Value::Object(vars)) => vars,
        Ok(_) => return Response::outcome(StatusCode::BadRequest, false, "Expected a JSON object"),
        Err(e) => return invalid_body(&e),
    };

    match store.set(&vars) {
        Ok(()) => Response::outcome(StatusCode::Ok, true, "Environment variables saved"),
        Err(e) => store_error_response(&e),
    }
}

/// `GET /api/reports`
pub fn list_reports(store: &ReportStore) -> Response {
    match store.list() {
        Ok(reports) => Response::json(StatusCode::Ok, &reports),
        Err(e) => store_error_response(&e),
    }
}

/// `GET /api/reports/<name>`
pub fn get_report(req: &Request, store: &ReportStore) -> Response {
    let name = req.path().strip_prefix(REPORTS_PREFIX).unwrap_or_default();

    match store.get(name) {
        Ok(contents) => Response::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_header("Content-Disposition", &format!("inline; filename=\"{}\"", name))
            .with_body_bytes(contents),
        Err(e) => store_error_response(&e),
    }
}

/// `GET /`: sirve `index.html` del directorio estático
pub fn index_page(static_dir: &Path) -> Response {
    match fs::read(static_dir.join("index.html")) {
        Ok(contents) => Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body_bytes(contents),
        Err(_) => Response::error(StatusCode::NotFound, "index.html not found"),
    }
}
