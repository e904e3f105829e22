use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the watched path looks like compared to the handle we hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Unchanged,
    Missing,
    /// The path now names a different file.
    Replaced,
    /// Same file, but shorter than what was already read.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(meta: &std::fs::Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_meta: &std::fs::Metadata) -> Option<Self> {
        None
    }
}

/// Reads complete lines from an open log file.
///
/// Bytes after the last newline are held back until the rest of the line is
/// written. The read offset is implicit in the handle; `offset` mirrors it so
/// truncation can be detected.
pub struct LineReader {
    reader: BufReader<File>,
    identity: Option<FileIdentity>,
    offset: u64,
    pending: Vec<u8>,
}

impl LineReader {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        let meta = file.metadata().await?;

        Ok(Self {
            reader: BufReader::new(file),
            identity: FileIdentity::of(&meta),
            offset: 0,
            pending: Vec::new(),
        })
    }

    /// Next complete line, or `None` once no complete line is available.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.pending).await?;
        self.offset += n as u64;

        if self.pending.last() != Some(&b'\n') {
            return Ok(None);
        }

        let line = decode_line(&self.pending);
        self.pending.clear();
        Ok(Some(line))
    }

    /// Hand out an unterminated trailing line, if one is buffered.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    /// Bytes consumed from the handle so far, including a buffered partial line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub async fn path_status(&self, path: &Path) -> io::Result<PathStatus> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PathStatus::Missing),
            Err(e) => return Err(e),
        };

        if let (Some(ours), Some(theirs)) = (self.identity, FileIdentity::of(&meta))
            && ours != theirs
        {
            return Ok(PathStatus::Replaced);
        }

        if meta.len() < self.offset {
            return Ok(PathStatus::Truncated);
        }

        Ok(PathStatus::Unchanged)
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
