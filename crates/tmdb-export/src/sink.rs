//! Output sink: buffered NDJSON writer with atomic tmp→rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output buffer size (1MB)
const WRITE_BUF_SIZE: usize = 1024 * 1024;

/// Buffered line writer for one class's data file.
///
/// Lines go to `<final>.tmp`; [`finalize`](NdjsonSink::finalize) flushes and
/// renames it into place, so a failed export never leaves a file at the
/// final path.
pub struct NdjsonSink {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl std::fmt::Debug for NdjsonSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonSink")
            .field("final_path", &self.final_path)
            .finish_non_exhaustive()
    }
}

impl NdjsonSink {
    /// Create a new sink writing to a temporary file next to `final_path`
    pub fn new(final_path: &Path) -> io::Result<Self> {
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        // Clean up stale tmp file
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUF_SIZE, file),
            tmp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    /// Finalize: flush and atomically rename tmp → final.
    pub fn finalize(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }

    /// Drop the partial output
    pub fn abandon(self) {
        let tmp_path = self.tmp_path.clone();
        drop(self.writer);
        if let Err(e) = fs::remove_file(&tmp_path) {
            log::warn!("Failed to remove {}: {e}", tmp_path.display());
        }
    }
}

impl Write for NdjsonSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finalize_renames_into_place() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("movies.json");

        let mut sink = NdjsonSink::new(&final_path).unwrap();
        writeln!(sink, r#"{{"id":1}}"#).unwrap();
        writeln!(sink).unwrap();
        assert!(!final_path.exists());
        assert!(dir.path().join("movies.json.tmp").exists());

        sink.finalize().unwrap();
        assert!(!dir.path().join("movies.json.tmp").exists());
        assert_eq!(
            fs::read_to_string(&final_path).unwrap(),
            "{\"id\":1}\n\n"
        );
    }

    #[test]
    fn abandon_removes_tmp() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("people.json");

        let mut sink = NdjsonSink::new(&final_path).unwrap();
        writeln!(sink, "partial").unwrap();
        sink.abandon();

        assert!(!final_path.exists());
        assert!(!dir.path().join("people.json.tmp").exists());
    }

    #[test]
    fn stale_tmp_is_replaced() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("keywords.json");
        fs::write(dir.path().join("keywords.json.tmp"), "stale\n").unwrap();

        let sink = NdjsonSink::new(&final_path).unwrap();
        sink.finalize().unwrap();
        assert_eq!(fs::read_to_string(&final_path).unwrap(), "");
    }
}
