//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! - Path sin handler → 404 Not Found
//! - Path con handler pero otro método → 405 Method Not Allowed
//! - HEAD se atiende con el handler de GET

use crate::http::{Method, Request, Response, StatusCode};
use std::sync::Arc;

/// Un handler recibe un Request y retorna una Response.
///
/// Puede capturar estado (controller, stores), por eso es un closure.
pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

#[derive(Debug, Clone)]
enum PathPattern {
    /// Coincidencia exacta: "/api/status"
    Exact(String),

    /// Todo lo que empieza con el prefijo: "/api/reports/"
    Prefix(String),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()) && path.len() > p.len(),
        }
    }
}

struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Handler,
}

/// Router que mapea paths a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta exacta
    ///
    /// # Ejemplo
    /// ```
    /// use cleanup_server::router::Router;
    /// use cleanup_server::http::{Method, Response, StatusCode};
    /// use serde_json::json;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req| {
    ///     Response::json(StatusCode::Ok, &json!({"message": "hello"}))
    /// });
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: PathPattern::Exact(path.to_string()),
            handler: Arc::new(handler),
        });
    }

    /// Registra un prefijo; el handler recibe el path completo
    pub fn register_prefix<F>(&mut self, method: Method, prefix: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: PathPattern::Prefix(prefix.to_string()),
            handler: Arc::new(handler),
        });
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        let method = match request.method() {
            Method::HEAD => Method::GET,
            other => other,
        };

        let mut allowed: Vec<&'static str> = Vec::new();
        for route in self.routes.iter().filter(|r| r.pattern.matches(path)) {
            if route.method == method {
                let mut response = (route.handler)(request);
                self.add_common_headers(&mut response);
                return response;
            }
            allowed.push(route.method.as_str());
        }

        let mut response = if allowed.is_empty() {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        } else {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed on {}", request.method().as_str(), path),
            )
            .with_header("Allow", &allowed.join(", "))
        };
        self.add_common_headers(&mut response);
        response
    }

    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "CleanupServer-HTTP/1.0");
        response.add_header("Connection", "close");
    }
}
