/*!
 * Upload sources: a local file or an in-memory buffer
 *
 * A source is opened once and then read in fixed-size chunks. Each chunk is
 * filled completely unless the end of input is reached first.
 */

use crate::error::UploadError;
use bytes::{Bytes, BytesMut};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

/// What to upload
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Local file, read lazily
    File(PathBuf),

    /// In-memory content (the `--text` input)
    Bytes(Bytes),
}

impl UploadSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        UploadSource::File(path.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        UploadSource::Bytes(Bytes::from(text.into()))
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        UploadSource::Bytes(data.into())
    }

    /// Short description used in log lines
    pub fn describe(&self) -> String {
        match self {
            UploadSource::File(path) => path.display().to_string(),
            UploadSource::Bytes(_) => "text input".to_string(),
        }
    }

    /// Open the source and learn its size
    pub async fn open(&self) -> Result<SourceReader, UploadError> {
        match self {
            UploadSource::File(path) => open_file(path).await,
            UploadSource::Bytes(data) => Ok(SourceReader {
                total_size: data.len() as u64,
                inner: Box::new(Cursor::new(data.clone())),
            }),
        }
    }
}

async fn open_file(path: &Path) -> Result<SourceReader, UploadError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UploadError::SourceNotFound(path.to_path_buf())
        } else {
            UploadError::Input(format!("Cannot open {}: {}", path.display(), e))
        }
    })?;

    let metadata = file
        .metadata()
        .await
        .map_err(|e| UploadError::Input(format!("Cannot stat {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(UploadError::Input(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    Ok(SourceReader {
        total_size: metadata.len(),
        inner: Box::new(file),
    })
}

/// Open source handed out by [`UploadSource::open`]
pub struct SourceReader {
    inner: Box<dyn AsyncRead + Send + Unpin>,
    total_size: u64,
}

impl SourceReader {
    /// Size in bytes, known before any chunk is read
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Read up to `part_size` bytes, short only at end of input
    ///
    /// An empty chunk means the input is exhausted.
    pub async fn read_chunk(&mut self, part_size: usize) -> std::io::Result<Bytes> {
        let mut buffer = BytesMut::zeroed(part_size);
        let mut filled = 0;
        while filled < part_size {
            let n = self.inner.read(&mut buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);
        Ok(buffer.freeze())
    }
}

impl std::fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceReader")
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}
