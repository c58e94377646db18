//! File backend with size-based rotation and compression
//!
//! The worker owns the file handle. Rotation renames the live file to
//! `<name>.1` after shifting older backups up by one and deleting the
//! slot beyond the backlog depth; compressed backups carry an additional
//! `.deflate` suffix. A failed rotation degrades to appending to the
//! existing file so no records are lost.

use super::{shutdown_worker, sync_worker, Command, FILE_QUEUE_CAPACITY};
use crate::core::error::{LoggingError, Result};
use crate::core::level::{LevelFilter, LevelStyle, LogLevel};
use crate::core::metrics::DispatchMetrics;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const BACKLOG_MAX: usize = 1000;

/// Compression applied to a just-rotated backup file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionMethod {
    #[default]
    None,
    Deflate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWriterConfig {
    pub level: LogLevel,
    pub path: PathBuf,
    /// Maximum size of the live file; 0 disables rotation.
    pub max_size: u64,
    /// Number of rotated files to retain.
    pub backlog: usize,
    pub compression: CompressionMethod,
}

impl FileWriterConfig {
    pub fn new(
        level: LogLevel,
        path: impl Into<PathBuf>,
        max_size: u64,
        backlog: usize,
        compression: CompressionMethod,
    ) -> Result<Self> {
        if max_size > 0 {
            if backlog == 0 {
                return Err(LoggingError::config(
                    "FileWriter",
                    "rotation requires a backlog depth of at least 1",
                ));
            }
            if backlog > BACKLOG_MAX {
                return Err(LoggingError::config(
                    "FileWriter",
                    format!("backlog depth {backlog} too big, maximum is {BACKLOG_MAX}"),
                ));
            }
        }
        Ok(Self {
            level,
            path: path.into(),
            max_size,
            backlog,
            compression,
        })
    }
}

/// Backup file path for a given slot: `<name>.<index>`.
fn backup_path(base: &Path, index: usize) -> PathBuf {
    let mut path = base.to_path_buf();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app.log")
        .to_string();
    path.set_file_name(format!("{filename}.{index}"));
    path
}

/// Compressed twin of a backup path: `<name>.<index>.deflate`.
fn compressed_path(backup: &Path) -> PathBuf {
    let mut path = backup.to_path_buf();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app.log")
        .to_string();
    path.set_file_name(format!("{filename}.deflate"));
    path
}

/// Stream-compress `path` into its `.deflate` twin, removing the original
/// only after compression fully succeeded.
fn compress_file(path: &Path) -> Result<()> {
    let target = compressed_path(path);
    let temp = {
        let mut t = target.clone();
        let name = t
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("backup.deflate")
            .to_string();
        t.set_file_name(format!("{name}.tmp"));
        t
    };

    let input = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);
    let output = File::create(&temp)?;
    let mut encoder = flate2::write::DeflateEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(e.into());
            }
        };
        if bytes_read == 0 {
            break;
        }
        if let Err(e) = encoder.write_all(&buffer[..bytes_read]) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
    }
    match encoder.finish() {
        Ok(mut output) => {
            if let Err(e) = output.flush() {
                let _ = fs::remove_file(&temp);
                return Err(e.into());
            }
        }
        Err(e) => {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
    }

    if let Err(e) = fs::rename(&temp, &target) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

/// Shift the backup chain and move the live file into slot 1.
fn rotate_files(base: &Path, backlog: usize, compression: CompressionMethod) -> Result<()> {
    // Retention: the slot beyond the backlog depth goes away first.
    let oldest = backup_path(base, backlog);
    let oldest_compressed = compressed_path(&oldest);
    for stale in [&oldest, &oldest_compressed] {
        if stale.exists() {
            if let Err(e) = fs::remove_file(stale) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove oldest backup {}: {}",
                    stale.display(),
                    e
                );
            }
        }
    }

    for index in (1..backlog).rev() {
        let old = backup_path(base, index);
        let new = backup_path(base, index + 1);
        let old_compressed = compressed_path(&old);
        let new_compressed = compressed_path(&new);
        if old_compressed.exists() {
            fs::rename(&old_compressed, &new_compressed)
                .map_err(|e| LoggingError::rotation(old_compressed.display().to_string(), e.to_string()))?;
        } else if old.exists() {
            fs::rename(&old, &new)
                .map_err(|e| LoggingError::rotation(old.display().to_string(), e.to_string()))?;
        }
    }

    if base.exists() {
        let first = backup_path(base, 1);
        fs::rename(base, &first)
            .map_err(|e| LoggingError::rotation(base.display().to_string(), e.to_string()))?;
        if compression == CompressionMethod::Deflate {
            compress_file(&first)?;
        }
    }
    Ok(())
}

fn open_append(path: &Path) -> Result<(BufWriter<File>, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((BufWriter::new(file), size))
}

struct FileWorker {
    config: FileWriterConfig,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    metrics: Arc<DispatchMetrics>,
}

impl FileWorker {
    fn rotate(&mut self) {
        if self.config.backlog == 0 {
            return;
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
        let mut rotation_failed = false;
        if let Err(e) = rotate_files(&self.config.path, self.config.backlog, self.config.compression)
        {
            // Degrade to appending to the existing file instead of losing
            // records.
            eprintln!(
                "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                e
            );
            rotation_failed = true;
        }
        match open_append(&self.config.path) {
            Ok((writer, size)) => {
                self.writer = Some(writer);
                // Reset size tracking after a failed rotation so the next
                // write does not immediately retry; the file may grow past
                // the limit in this degraded state.
                self.current_size = if rotation_failed { 0 } else { size };
            }
            Err(e) => {
                eprintln!(
                    "[LOGGER ERROR] Failed to reopen log file after rotation: {}",
                    e
                );
            }
        }
    }

    fn write_line(&mut self, line: &str) {
        let needed = line.len() as u64 + 1;
        if self.config.max_size > 0 && self.current_size + needed > self.config.max_size {
            self.rotate();
        }
        if self.writer.is_none() {
            // Recovery path after a failed reopen.
            match open_append(&self.config.path) {
                Ok((writer, size)) => {
                    self.writer = Some(writer);
                    self.current_size = size;
                }
                Err(e) => {
                    eprintln!("[LOGGER ERROR] Failed to open log file: {}", e);
                    self.metrics.record_dropped();
                    return;
                }
            }
        }
        if let Some(ref mut writer) = self.writer {
            if let Err(e) = writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
            {
                eprintln!("[LOGGER ERROR] FileWriter write failed: {}", e);
                self.writer = None;
                self.metrics.record_dropped();
                return;
            }
            self.current_size += needed;
        }
    }
}

fn file_writer_thread(mut worker: FileWorker, rx: Receiver<Command>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Record(record) => {
                let line = record.render(LevelStyle::Str);
                worker.write_line(&line);
            }
            Command::Rotate => worker.rotate(),
            Command::Sync(ack) => {
                if let Some(ref mut writer) = worker.writer {
                    if let Err(e) = writer.flush() {
                        eprintln!("[LOGGER ERROR] FileWriter flush failed: {}", e);
                    }
                }
                let _ = ack.send(());
            }
            Command::Stop => break,
        }
    }
    if let Some(mut writer) = worker.writer.take() {
        let _ = writer.flush();
    }
}

pub struct FileBackend {
    filter: LevelFilter,
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FileBackend {
    pub(crate) fn new(config: FileWriterConfig, metrics: Arc<DispatchMetrics>) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggingError::config(
                        "FileWriter",
                        format!("cannot create log directory '{}': {}", parent.display(), e),
                    )
                })?;
            }
        }
        let (writer, current_size) = open_append(&config.path).map_err(|e| {
            LoggingError::config(
                "FileWriter",
                format!("cannot open log file '{}': {}", config.path.display(), e),
            )
        })?;

        let filter = LevelFilter::new(config.level);
        let worker = FileWorker {
            config,
            writer: Some(writer),
            current_size,
            metrics,
        };
        let (tx, rx) = bounded(FILE_QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("FileWriter".to_string())
            .spawn(move || file_writer_thread(worker, rx))?;
        Ok(Self {
            filter,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    pub(crate) fn sender(&self) -> &Sender<Command> {
        &self.tx
    }

    /// Force one rotation on the worker.
    pub(crate) fn rotate(&self) -> Result<()> {
        self.tx
            .send(Command::Rotate)
            .map_err(|e| LoggingError::send_cmd("FileWriter", "ROTATE", e.to_string()))
    }

    pub(crate) fn sync(&self, deadline: Instant) -> bool {
        sync_worker(&self.tx, deadline)
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        shutdown_worker("FileWriter", &self.tx, &self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enricher::Enricher;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn send_record(backend: &FileBackend, message: &str) {
        let enricher = Enricher::new();
        let record = Arc::new(enricher.enrich(LogLevel::Info, "root", message.to_string()));
        backend
            .sender()
            .send(Command::Record(record))
            .expect("worker alive");
    }

    #[test]
    fn test_config_validation() {
        assert!(FileWriterConfig::new(LogLevel::Info, "a.log", 0, 0, CompressionMethod::None).is_ok());
        assert!(
            FileWriterConfig::new(LogLevel::Info, "a.log", 1024, 0, CompressionMethod::None)
                .is_err()
        );
        assert!(
            FileWriterConfig::new(LogLevel::Info, "a.log", 1024, 2000, CompressionMethod::None)
                .is_err()
        );
    }

    #[test]
    fn test_backup_path_naming() {
        let base = PathBuf::from("/var/log/app.log");
        assert_eq!(backup_path(&base, 3), PathBuf::from("/var/log/app.log.3"));
        assert_eq!(
            compressed_path(&backup_path(&base, 3)),
            PathBuf::from("/var/log/app.log.3.deflate")
        );
    }

    #[test]
    fn test_plain_append_without_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.log");
        let config =
            FileWriterConfig::new(LogLevel::Trace, &path, 0, 0, CompressionMethod::None).unwrap();
        let backend = FileBackend::new(config, Arc::new(DispatchMetrics::new())).unwrap();

        for i in 0..50 {
            send_record(&backend, &format!("message {i}"));
        }
        assert!(backend.sync(Instant::now() + Duration::from_secs(5)));
        backend.shutdown().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 50);
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn test_rotation_creates_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rotating.log");
        let config =
            FileWriterConfig::new(LogLevel::Trace, &path, 120, 3, CompressionMethod::None).unwrap();
        let backend = FileBackend::new(config, Arc::new(DispatchMetrics::new())).unwrap();

        for i in 0..40 {
            send_record(&backend, &format!("rotating message number {i}"));
        }
        backend.shutdown().unwrap();

        assert!(backup_path(&path, 1).exists());
        // Retention: never more than backlog backups plus the live file.
        let count = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("rotating.log"))
            .count();
        assert!(count <= 4, "found {count} files");
    }

    #[test]
    fn test_rotation_with_compression() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("compressed.log");
        let config =
            FileWriterConfig::new(LogLevel::Trace, &path, 100, 2, CompressionMethod::Deflate)
                .unwrap();
        let backend = FileBackend::new(config, Arc::new(DispatchMetrics::new())).unwrap();

        for i in 0..30 {
            send_record(&backend, &format!("compressible payload {i}"));
        }
        backend.shutdown().unwrap();

        let first_compressed = compressed_path(&backup_path(&path, 1));
        assert!(first_compressed.exists());
        // The uncompressed twin must be gone.
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn test_manual_rotate_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manual.log");
        let config =
            FileWriterConfig::new(LogLevel::Trace, &path, 1024 * 1024, 2, CompressionMethod::None)
                .unwrap();
        let backend = FileBackend::new(config, Arc::new(DispatchMetrics::new())).unwrap();

        send_record(&backend, "before rotation");
        backend.rotate().unwrap();
        send_record(&backend, "after rotation");
        backend.shutdown().unwrap();

        let backup = fs::read_to_string(backup_path(&path, 1)).unwrap();
        let live = fs::read_to_string(&path).unwrap();
        assert!(backup.contains("before rotation"));
        assert!(live.contains("after rotation"));
    }

    #[test]
    fn test_compress_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.log.1");
        fs::write(&path, b"some log content\nmore log content\n").unwrap();

        compress_file(&path).unwrap();
        assert!(!path.exists());

        let compressed = dir.path().join("data.log.1.deflate");
        let mut decoder = flate2::read::DeflateDecoder::new(File::open(compressed).unwrap());
        let mut restored = String::new();
        decoder.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, "some log content\nmore log content\n");
    }
}
