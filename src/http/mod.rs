//! # Módulo HTTP
//!
//! Implementa el protocolo HTTP/1.0 desde cero, sin librerías de alto
//! nivel:
//!
//! - Parsing de requests (incluye body JSON de los POST)
//! - Construcción de responses
//! - Status codes
//!
//! Cada conexión atiende un solo request (`Connection: close`).
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 202 Accepted\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 44\r\n
//! \r\n
//! {"message":"Process started","success":true}
//! ```

pub mod request;
pub mod response;
pub mod status;

pub use request::{header_end, Method, Request};
pub use response::Response;
pub use status::StatusCode;
