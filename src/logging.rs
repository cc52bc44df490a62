// src/logging.rs
// DOCUMENTATION: Logger initialization
// PURPOSE: Configure env_logger from resolved settings, optionally writing to a
// size-capped rotating log file

use crate::config::{ensure_directory_exists, Settings};
use anyhow::Context;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_FILE_MAX_BYTES: u64 = 10 * 1024 * 1024;
const LOG_FILE_BACKUPS: usize = 10;

/// Append-only log file rolled over to `<file>.1` .. `<file>.N` when full
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
            backups,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            // Oldest backup is overwritten by the next one down
            for index in (1..self.backups).rev() {
                let from = self.backup_path(index);
                if from.exists() {
                    fs::rename(&from, self.backup_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Filter used when RUST_LOG is unset
/// DOCUMENTATION: LOG_LEVEL for application logs; sqlx statements only with DB_ECHO
fn configure_filters(builder: &mut Builder, settings: &Settings) {
    builder
        .filter_level(settings.log_filter())
        .filter_module("actix_web", LevelFilter::Info)
        .filter_module(
            "sqlx",
            if settings.db_echo {
                LevelFilter::Info
            } else {
                LevelFilter::Warn
            },
        );
}

/// Initialize the global logger
/// DOCUMENTATION: A logger installed earlier in the process is kept
pub fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let mut builder = Builder::new();

    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => configure_filters(&mut builder, settings),
    }

    if let Some(path) = settings.log_file_path() {
        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = RotatingFile::open(&path, LOG_FILE_MAX_BYTES, LOG_FILE_BACKUPS)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
    Ok(())
}
