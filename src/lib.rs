//! # Cleanup Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 de control para un script de limpieza de medios:
//! lanza el script en background (uno a la vez), expone su salida en vivo
//! y administra los archivos de configuración y reportes que el script usa.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing y manejo del protocolo HTTP/1.0
//! - `server`: Servidor TCP, raíz de composición
//! - `router`: Enrutamiento de peticiones a handlers
//! - `jobs`: Ejecución single-flight del script y su estado
//! - `store`: Config JSON, `.env` y reportes en el directorio de trabajo
//! - `metrics`: Recolección de métricas y observabilidad
//! - `error`: Errores tipados del dominio
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use cleanup_server::config::Config;
//! use cleanup_server::server::Server;
//!
//! let mut server = Server::new(Config::default());
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod metrics;
pub mod router;
pub mod server;
pub mod store;
