//! # Handlers HTTP para el Job
//! src/jobs/handlers.rs
//!
//! - `POST /api/run`: lanza el script (202) o lo rechaza (400)
//! - `GET /api/status`: snapshot del estado

use crate::error::JobError;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::controller::JobController;
use crate::jobs::options::RunOptions;
use crate::jobs::status::StatusQuery;

/// Handler para `POST /api/run`
///
/// # Body
/// ```json
/// {"script_type": "find_only", "options": {"dry_run": true, "filter": "movies"}}
/// ```
///
/// # Respuestas
/// - 202 `{"success": true, "message": "Process started"}`
/// - 400 `{"success": false, "message": "A process is already running"}`
/// - 400 si el body no es válido
pub fn run_handler(req: &Request, controller: &JobController) -> Response {
    let options = match RunOptions::from_json(req.body()) {
        Ok(options) => options,
        Err(e) => {
            return Response::outcome(
                StatusCode::BadRequest,
                false,
                &format!("Invalid run request: {}", e),
            );
        }
    };

    match controller.start_run(options) {
        Ok(()) => Response::outcome(StatusCode::Accepted, true, "Process started"),
        Err(e @ JobError::AlreadyRunning) => {
            Response::outcome(StatusCode::BadRequest, false, &e.to_string())
        }
        Err(e) => Response::outcome(StatusCode::InternalServerError, false, &e.to_string()),
    }
}

/// Handler para `GET /api/status`
///
/// # Ejemplo de response
/// ```json
/// {
///   "running": true,
///   "output": [{"timestamp": "2024-05-01T13:45:12.123456", "line": "Scanning..."}],
///   "error": null
/// }
/// ```
pub fn status_handler(_req: &Request, query: &StatusQuery) -> Response {
    Response::json(StatusCode::Ok, &query.get_status())
}
