use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum log file size before rotation (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Size to keep after rotation (1 MB of most recent logs)
const KEEP_SIZE: u64 = 1024 * 1024;

const ROTATION_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// Trim the log file to its last `keep` bytes once it grows past `max`.
fn rotate_log_if_needed(log_path: &Path, max: u64, keep: u64) -> io::Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let size = fs::metadata(log_path)?.len();
    if size <= max {
        return Ok(());
    }

    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(size.saturating_sub(keep)))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    drop(file);

    // Skip to the first newline to avoid partial lines
    let skip = buffer
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(ROTATION_MARKER)?;
    file.write_all(&buffer[skip..])?;
    Ok(())
}

/// Writer factory sharing one log file between all writers
#[derive(Clone)]
struct LogWriterFactory {
    file: Arc<Mutex<File>>,
}

impl LogWriterFactory {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl LogWriter {
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            file: self.file.clone(),
        }
    }
}

/// Initialize logging to stderr, or to `log_file` when given.
///
/// A log file is appended to and trimmed to its last 1MB once it exceeds
/// 5MB. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            if let Err(e) = rotate_log_if_needed(path, MAX_LOG_SIZE, KEEP_SIZE) {
                eprintln!("Warning: Failed to rotate log file: {e}");
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(LogWriterFactory::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };
    let stderr_layer = log_file
        .is_none()
        .then(|| fmt::layer().with_writer(io::stderr).with_target(true));

    let default_filter = format!("epicamp={level},epicamp_core=warn");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    match log_file {
        Some(path) => tracing::info!(log_path = %path.display(), "logging initialized"),
        None => tracing::debug!("logging to stderr"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_small_log_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("epicamp.log");
        fs::write(&path, "one\ntwo\n").unwrap();

        rotate_log_if_needed(&path, 100, 10).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_rotation_keeps_whole_recent_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("epicamp.log");
        let content: String = (0..20).map(|i| format!("line {i:02}\n")).collect();
        fs::write(&path, &content).unwrap();

        // each line is 8 bytes; keeping 20 bytes cuts into line 17
        rotate_log_if_needed(&path, 50, 20).unwrap();
        let rotated = fs::read_to_string(&path).unwrap();
        assert!(rotated.starts_with("--- Log rotated"));
        assert!(rotated.ends_with("line 18\nline 19\n"));
        assert!(!rotated.contains("line 17"));
    }

    #[test]
    fn test_missing_log_is_fine() {
        let dir = tempdir().unwrap();
        assert!(rotate_log_if_needed(&dir.path().join("absent.log"), 1, 1).is_ok());
    }
}
