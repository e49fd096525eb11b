//! # Códigos de Estado HTTP
//!
//! Códigos que usa el servidor:
//!
//! - **2xx**: Éxito (200 OK, 202 Accepted para `POST /api/run`)
//! - **4xx**: Error del cliente (400, 404, 405, 411, 413)
//! - **5xx**: Error del servidor (500)

/// Códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 202 Accepted - El job quedó lanzado en background
    Accepted = 202,

    /// 400 Bad Request - Body inválido o job ya en ejecución
    BadRequest = 400,

    /// 404 Not Found - Ruta o archivo no encontrado
    NotFound = 404,

    /// 405 Method Not Allowed - La ruta existe pero no para este método
    MethodNotAllowed = 405,

    /// 411 Length Required - POST sin `Content-Length`
    LengthRequired = 411,

    /// 413 Payload Too Large - Request más grande que `max_request_bytes`
    PayloadTooLarge = 413,

    /// 500 Internal Server Error - Error de disco u otro error interno
    InternalServerError = 500,
}

impl StatusCode {
    /// # Ejemplo
    /// ```
    /// use cleanup_server::http::StatusCode;
    /// assert_eq!(StatusCode::Accepted.as_u16(), 202);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón estándar (RFC 1945 / RFC 7231)
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::Accepted)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
