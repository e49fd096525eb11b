//! # Stores en Disco
//! src/store/mod.rs
//!
//! Archivos que el panel lee y escribe dentro del directorio de trabajo:
//!
//! | Archivo                 | Store         | Endpoint               |
//! |-------------------------|---------------|------------------------|
//! | `config.json`           | `JsonStore`   | `/api/config`          |
//! | `protected_dirs.json`   | `JsonStore`   | `/api/protected-dirs`  |
//! | `.env`                  | `EnvStore`    | `/api/env`             |
//! | `*_report.json`, `*_duplicates.json` | `ReportStore` | `/api/reports` |
//!
//! Las escrituras son atómicas: archivo temporal + `rename`.

pub mod env_file;
pub mod handlers;
pub mod json_file;
pub mod reports;

pub use env_file::EnvStore;
pub use json_file::JsonStore;
pub use reports::{ReportEntry, ReportStore};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Escribe `contents` en `path` pasando por `<path>.tmp`
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    {
        let mut writer = BufWriter::new(File::create(temp_path)?);
        writer.write_all(contents)?;
        writer.flush()?;
    }

    // Renombrar (atómico en sistemas Unix)
    fs::rename(temp_path, path)
}
