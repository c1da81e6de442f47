use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, warn};

use crate::text::TextBlock;

/// Configuration for note reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
        }
    }
}

/// Statistics for one note read
#[derive(Serialize, Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub bytes_read: u64,
    pub duration_ms: u64,
    pub read_error: Option<String>,
}

/// A note loaded from disk as a single-segment block
#[derive(Debug, Clone)]
pub struct NoteFile {
    pub path: PathBuf,
    pub block: TextBlock,
}

/// Async note reader
pub struct NoteReader {
    config: ReaderConfig,
}

impl NoteReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    fn failed(
        &self,
        path: &Path,
        error_msg: String,
        bytes_read: u64,
        start: std::time::Instant,
    ) -> Result<(Option<NoteFile>, ReadStats)> {
        warn!("{}", error_msg);
        if self.config.fail_fast {
            return Err(anyhow::anyhow!(error_msg));
        }
        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read,
            duration_ms: start.elapsed().as_millis() as u64,
            read_error: Some(error_msg),
        };
        Ok((None, stats))
    }

    /// Read one note. With `fail_fast` off, open and decode errors are reported in
    /// the stats and no note is returned.
    pub async fn read_note<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> Result<(Option<NoteFile>, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of note: {}", path.display());

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                let error_msg = format!("Failed to open file {}: {}", path.display(), e);
                return self.failed(path, error_msg, 0, start_time);
            }
        };

        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut bytes = Vec::new();
        if let Err(e) = reader.read_to_end(&mut bytes).await {
            let error_msg = format!("Failed to read file {}: {}", path.display(), e);
            return self.failed(path, error_msg, bytes.len() as u64, start_time);
        }

        let bytes_read = bytes.len() as u64;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                let error_msg = format!("UTF-8 decoding error in {}: {}", path.display(), e);
                return self.failed(path, error_msg, bytes_read, start_time);
            }
        };

        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read,
            duration_ms: start_time.elapsed().as_millis() as u64,
            read_error: None,
        };
        debug!("Read {}: {} bytes in {}ms", path.display(), bytes_read, stats.duration_ms);

        let note = NoteFile {
            path: path.to_path_buf(),
            block: TextBlock::single(text),
        };
        Ok((Some(note), stats))
    }
}
