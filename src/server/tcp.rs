//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que atiende cada conexión en su propio thread. `Server::new`
//! es la raíz de composición: crea el `JobStatus` compartido y se lo pasa al
//! `JobController` y al `StatusQuery`, arma los stores sobre el directorio de
//! trabajo y registra todas las rutas.

use crate::config::Config;
use crate::http::{header_end, Method, Request, Response, StatusCode};
use crate::jobs::{handlers as job_handlers, JobController, JobStatus, ProcessRunner, StatusQuery};
use crate::metrics::MetricsCollector;
use crate::router::Router;
use crate::store::handlers::{self as store_handlers, REPORTS_PREFIX};
use crate::store::{EnvStore, JsonStore, ReportStore};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

const READ_CHUNK: usize = 8192;
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Lo que cada thread de conexión necesita
#[derive(Clone)]
struct Shared {
    router: Arc<Router>,
    metrics: Arc<MetricsCollector>,
    max_request_bytes: usize,
}

/// Servidor HTTP/1.0 concurrente con métricas
pub struct Server {
    config: Config,
    shared: Shared,
    listener: Option<TcpListener>,
}

enum ReadOutcome {
    Complete(Vec<u8>),
    Closed,
    TooLarge,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let status = JobStatus::shared();
        let runner = ProcessRunner::new(config.runner.clone(), config.runner_args.clone(), &config.work_dir);
        let controller = Arc::new(JobController::new(runner, Arc::clone(&status)));
        let query = Arc::new(StatusQuery::new(status));
        let metrics = Arc::new(MetricsCollector::new());

        let router = build_router(&config, &controller, &query, &metrics);

        Self {
            shared: Shared {
                router: Arc::new(router),
                metrics,
                max_request_bytes: config.max_request_bytes,
            },
            config,
            listener: None,
        }
    }

    /// Abre el socket; con puerto 0 el SO elige uno libre
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.address())?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Acepta conexiones para siempre, un thread por conexión
    pub fn run(&mut self) -> io::Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };

        info!(address = %listener.local_addr()?, "servidor escuchando (un thread por conexión)");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let shared = self.shared.clone();
                    let peer = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!(%peer, "nueva conexión");

                    shared.metrics.connection_opened();
                    let spawned = thread::Builder::new().name("http-conn".to_string()).spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, &shared) {
                            warn!(%peer, error = %e, "error atendiendo conexión");
                        }
                        shared.metrics.connection_closed();
                    });

                    if let Err(e) = spawned {
                        self.shared.metrics.connection_closed();
                        error!(error = %e, "no se pudo crear el thread de la conexión");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "error al aceptar conexión");
                }
            }
        }

        Ok(())
    }

    fn handle_connection(mut stream: TcpStream, shared: &Shared) -> io::Result<()> {
        let start = Instant::now();
        let request_id = next_request_id();
        let thread_id = format!("{:?}", thread::current().id());

        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let raw = match read_request(&mut stream, shared.max_request_bytes)? {
            ReadOutcome::Complete(raw) => raw,
            ReadOutcome::Closed => {
                debug!(request_id = %request_id, "conexión cerrada sin datos");
                return Ok(());
            }
            ReadOutcome::TooLarge => {
                warn!(request_id = %request_id, limit = shared.max_request_bytes, "request demasiado grande");
                let response = Response::error(StatusCode::PayloadTooLarge, "Request too large");
                return Self::finish(stream, shared, response, false, "/error", &request_id, &thread_id, start);
            }
        };

        let (response, path, is_head) = match Request::parse(&raw) {
            Ok(request) => {
                debug!(
                    request_id = %request_id,
                    method = request.method().as_str(),
                    path = request.path(),
                    "request recibido"
                );
                let missing_length =
                    request.method() == Method::POST && request.header("content-length").is_none();
                let response = if missing_length {
                    Response::outcome(StatusCode::LengthRequired, false, "Content-Length required")
                        .with_header("Connection", "close")
                } else {
                    shared.router.route(&request)
                };
                (response, request.path().to_string(), request.method() == Method::HEAD)
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "request inválido");
                let response = Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e));
                (response, "/error".to_string(), false)
            }
        };

        Self::finish(stream, shared, response, is_head, &path, &request_id, &thread_id, start)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        mut stream: TcpStream,
        shared: &Shared,
        mut response: Response,
        is_head: bool,
        path: &str,
        request_id: &str,
        thread_id: &str,
        start: Instant,
    ) -> io::Result<()> {
        response.add_header("X-Request-Id", request_id);
        response.add_header("X-Worker-Thread", thread_id);
        response.add_header("X-Worker-Pid", &std::process::id().to_string());

        let bytes = if is_head { response.head_bytes() } else { response.to_bytes() };
        stream.write_all(&bytes)?;
        stream.flush()?;

        let latency = start.elapsed();
        let status = response.status().as_u16();
        shared.metrics.record_request(path, status, latency);

        info!(
            request_id = %request_id,
            path = %path,
            status,
            latency_ms = latency.as_secs_f64() * 1000.0,
            "request atendido"
        );
        Ok(())
    }
}

fn build_router(
    config: &Config,
    controller: &Arc<JobController>,
    query: &Arc<StatusQuery>,
    metrics: &Arc<MetricsCollector>,
) -> Router {
    let mut router = Router::new();

    // === Job ===

    let c = Arc::clone(controller);
    router.register(Method::POST, "/api/run", move |req| job_handlers::run_handler(req, &c));

    let q = Arc::clone(query);
    router.register(Method::GET, "/api/status", move |req| job_handlers::status_handler(req, &q));

    // === Configuración ===

    let config_store = Arc::new(JsonStore::config(&config.work_dir));
    let s = Arc::clone(&config_store);
    router.register(Method::GET, "/api/config", move |_| store_handlers::get_json(&s));
    let s = Arc::clone(&config_store);
    router.register(Method::POST, "/api/config", move |req| {
        store_handlers::save_json(req, &s, "Configuration saved")
    });

    let protected = Arc::new(JsonStore::protected_dirs(&config.work_dir));
    let s = Arc::clone(&protected);
    router.register(Method::GET, "/api/protected-dirs", move |_| store_handlers::get_json(&s));
    let s = Arc::clone(&protected);
    router.register(Method::POST, "/api/protected-dirs", move |req| {
        store_handlers::save_json(req, &s, "Protected directories saved")
    });

    let env = Arc::new(EnvStore::in_dir(&config.work_dir));
    let s = Arc::clone(&env);
    router.register(Method::GET, "/api/env", move |_| store_handlers::get_env(&s));
    let s = Arc::clone(&env);
    router.register(Method::POST, "/api/env", move |req| store_handlers::save_env(req, &s));

    // === Reportes ===

    let reports = Arc::new(ReportStore::new(&config.work_dir));
    let s = Arc::clone(&reports);
    router.register(Method::GET, "/api/reports", move |_| store_handlers::list_reports(&s));
    let s = Arc::clone(&reports);
    router.register_prefix(Method::GET, REPORTS_PREFIX, move |req| store_handlers::get_report(req, &s));

    // === Página y métricas ===

    let static_dir = config.static_dir.clone();
    router.register(Method::GET, "/", move |_| store_handlers::index_page(&static_dir));

    let m = Arc::clone(metrics);
    let c = Arc::clone(controller);
    router.register(Method::GET, "/metrics", move |_| {
        Response::json(StatusCode::Ok, &m.to_json(c.stats()))
    });

    router
}

/// Lee headers y, si hay `Content-Length`, el body completo
fn read_request(stream: &mut TcpStream, max_bytes: usize) -> io::Result<ReadOutcome> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        if let Some(end) = header_end(&buffer) {
            match content_length(&buffer[..end]) {
                Some(length) => {
                    let expected = end.saturating_add(length);
                    if expected > max_bytes {
                        return Ok(ReadOutcome::TooLarge);
                    }
                    if buffer.len() >= expected {
                        buffer.truncate(expected);
                        return Ok(ReadOutcome::Complete(buffer));
                    }
                }
                None => return Ok(ReadOutcome::Complete(buffer)),
            }
        }
        if buffer.len() > max_bytes {
            return Ok(ReadOutcome::TooLarge);
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(if buffer.is_empty() {
                ReadOutcome::Closed
            } else {
                ReadOutcome::Complete(buffer)
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut hasher = DefaultHasher::new();
    COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Shutdown;
    use std::path::Path;

    fn test_config(work_dir: &Path) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            work_dir: work_dir.to_path_buf(),
            static_dir: work_dir.to_path_buf(),
            runner: "sh".to_string(),
            runner_args: vec!["-c".to_string(), "echo hello".to_string(), "runner".to_string()],
            ..Config::default()
        }
    }

    /// Atiende una sola conexión con `handle_connection` y retorna lo que
    /// recibió el cliente
    fn serve_once(server: &Server, writes: &[&[u8]]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = server.shared.clone();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            Server::handle_connection(stream, &shared).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        for (i, bytes) in writes.iter().enumerate() {
            if i > 0 {
                thread::sleep(Duration::from_millis(50));
            }
            client.write_all(bytes).unwrap();
        }
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        t.join().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    // ==================== Conexiones ====================

    #[test]
    fn test_status_has_observability_headers() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        let text = serve_once(&server, &[b"GET /api/status HTTP/1.0\r\n\r\n"]);
        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.contains("X-Request-Id:"));
        assert!(text.contains("X-Worker-Thread:"));
        assert!(text.contains("X-Worker-Pid:"));
        assert!(text.contains("Connection: close"));
        assert!(text.contains("\"running\":false"));
    }

    #[test]
    fn test_metrics_include_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        let text = serve_once(&server, &[b"GET /metrics HTTP/1.0\r\n\r\n"]);
        assert!(text.contains("200 OK"));
        assert!(text.contains("\"jobs\""));
        assert!(text.contains("\"latency_us\""));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        let text = serve_once(&server, &[b"\x00\x01\x02\x03garbage"]);
        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Invalid request:"));
    }

    #[test]
    fn test_peer_closed_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = server.shared.clone();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            Server::handle_connection(stream, &shared).unwrap();
        });

        drop(TcpStream::connect(addr).unwrap());
        t.join().unwrap();
        assert_eq!(server.shared.metrics.total_requests(), 0);
    }

    #[test]
    fn test_body_split_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));
        let body = br#"{"protected_dirs":["/media/keep"]}"#;
        let head = format!(
            "POST /api/protected-dirs HTTP/1.0\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );

        let text = serve_once(&server, &[head.as_bytes(), body]);
        assert!(text.contains("200 OK"), "{}", text);
        assert!(text.contains("Protected directories saved"));

        let saved = std::fs::read_to_string(dir.path().join("protected_dirs.json")).unwrap();
        assert!(saved.contains("/media/keep"));
    }

    #[test]
    fn test_payload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            max_request_bytes: 128,
            ..test_config(dir.path())
        };
        let server = Server::new(config);

        let text = serve_once(&server, &[b"POST /api/env HTTP/1.0\r\nContent-Length: 4096\r\n\r\n"]);
        assert!(text.contains("413 Payload Too Large"), "{}", text);
    }

    #[test]
    fn test_post_without_content_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        let text = serve_once(
            &server,
            &[b"POST /api/run HTTP/1.0\r\nContent-Type: application/json\r\n\r\n"],
        );
        assert!(text.contains("411 Length Required"), "{}", text);
        assert!(text.contains("\"success\":false"));

        let status = serve_once(&server, &[b"GET /api/status HTTP/1.0\r\n\r\n"]);
        assert!(status.contains("\"running\":false"));
        assert!(status.contains("\"output\":[]"));
    }

    #[test]
    fn test_head_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        let text = serve_once(&server, &[b"HEAD /api/status HTTP/1.0\r\n\r\n"]);
        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("running"));
    }

    #[test]
    fn test_requests_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(test_config(dir.path()));

        serve_once(&server, &[b"GET /nope HTTP/1.0\r\n\r\n"]);
        serve_once(&server, &[b"GET /api/status HTTP/1.0\r\n\r\n"]);
        assert_eq!(server.shared.metrics.total_requests(), 2);
    }

    // ==================== Helpers ====================

    #[test]
    fn test_content_length_lookup() {
        assert_eq!(content_length(b"POST / HTTP/1.0\r\ncontent-LENGTH: 12\r\n\r\n"), Some(12));
        assert_eq!(content_length(b"GET / HTTP/1.0\r\n\r\n"), None);
        assert_eq!(content_length(b"POST / HTTP/1.0\r\nContent-Length: abc\r\n\r\n"), None);
    }

    #[test]
    fn test_request_ids_differ() {
        assert_ne!(next_request_id(), next_request_id());
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = Server::new(test_config(dir.path()));

        let addr = server.bind().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
    }
}
