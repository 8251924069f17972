//! Attachment metadata and the base64 encoder used at send time.
//!
//! The conversation log only ever holds [`Attachment`] metadata. File bytes
//! are read and encoded into an [`EncodedAttachment`] immediately before the
//! outbound call and dropped once the call has been issued.

use crate::error::{Result, ShellError};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Default upper bound on a single attachment (25 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

/// Display metadata for an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
}

/// Attachment as it crosses the bridge: metadata plus base64 content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttachment {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub content: String,
}

/// Where the bytes of a selected file come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Read from disk at send time.
    Path(PathBuf),
    /// Already in memory (pasted or generated content).
    Bytes(Arc<[u8]>),
}

/// A file the user picked for the next message.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub source: FileSource,
}

impl SelectedFile {
    /// Select a file on disk, capturing its name, size and type now.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or its metadata cannot
    /// be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ShellError::Attachment(format!("`{}` has no file name", path.display()))
            })?;
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            ShellError::Attachment(format!("cannot stat `{}`: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(ShellError::Attachment(format!(
                "`{}` is not a regular file",
                path.display()
            )));
        }

        Ok(Self {
            mime_type: guess_mime_type(path).to_owned(),
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Select in-memory content.
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Bytes(bytes),
        }
    }

    /// Metadata recorded in the conversation log.
    #[must_use]
    pub fn metadata(&self) -> Attachment {
        Attachment {
            name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Read and base64-encode one file.
///
/// # Errors
///
/// Returns [`ShellError::Attachment`] if the file cannot be read or exceeds
/// `max_bytes`.
pub async fn encode_file(file: &SelectedFile, max_bytes: u64) -> Result<EncodedAttachment> {
    let bytes: Vec<u8> = match &file.source {
        FileSource::Path(path) => read_bounded(&file.name, path, max_bytes).await?,
        FileSource::Bytes(bytes) => {
            check_size(&file.name, bytes.len() as u64, max_bytes)?;
            bytes.to_vec()
        }
    };

    Ok(EncodedAttachment {
        name: file.name.clone(),
        mime_type: file.mime_type.clone(),
        content: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}

fn check_size(name: &str, size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(ShellError::Attachment(format!(
            "`{name}` is {size} bytes, above the {max_bytes} byte attachment limit"
        )));
    }
    Ok(())
}

/// Read at most `max_bytes` from disk. The file may grow after the size
/// check, so the read itself is capped one byte past the limit.
async fn read_bounded(name: &str, path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let read_err = |e: std::io::Error| ShellError::Attachment(format!("failed to read `{name}`: {e}"));

    let size = tokio::fs::metadata(path).await.map_err(read_err)?.len();
    check_size(name, size, max_bytes)?;

    let file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .await
        .map_err(read_err)?;
    check_size(name, bytes.len() as u64, max_bytes)?;
    Ok(bytes)
}

/// Encode every file in order, failing on the first error.
///
/// # Errors
///
/// Propagates the first [`encode_file`] failure.
pub async fn encode_all(files: &[SelectedFile], max_bytes: u64) -> Result<Vec<EncodedAttachment>> {
    let mut encoded = Vec::with_capacity(files.len());
    for file in files {
        encoded.push(encode_file(file, max_bytes).await?);
    }
    Ok(encoded)
}

/// Best-effort MIME type from the file extension.
#[must_use]
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "json" => "application/json",
        "toml" => "application/toml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn guesses_common_types() {
        assert_eq!(guess_mime_type(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("main.py")), "text/x-python");
        assert_eq!(guess_mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn attachment_serializes_type_field() {
        let meta = Attachment {
            name: "a.png".to_owned(),
            size: 3,
            mime_type: "image/png".to_owned(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "image/png");
        assert!(json.get("content").is_none());
    }

    #[tokio::test]
    async fn encodes_in_memory_bytes() {
        let file = SelectedFile::from_bytes("hi.txt", "text/plain", b"hello".to_vec());
        assert_eq!(file.size, 5);
        let encoded = encode_file(&file, DEFAULT_MAX_ATTACHMENT_BYTES)
            .await
            .unwrap();
        assert_eq!(encoded.content, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "text/plain");
    }

    #[tokio::test]
    async fn encodes_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, b"# title").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.md");
        assert_eq!(file.size, 7);
        assert_eq!(file.mime_type, "text/markdown");

        let encoded = encode_file(&file, DEFAULT_MAX_ATTACHMENT_BYTES)
            .await
            .unwrap();
        assert_eq!(encoded.content, "IyB0aXRsZQ==");
    }

    #[tokio::test]
    async fn vanished_file_fails_to_encode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.bin");
        std::fs::write(&path, b"x").unwrap();
        let file = SelectedFile::from_path(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = encode_file(&file, DEFAULT_MAX_ATTACHMENT_BYTES)
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Attachment(_)));
    }

    #[tokio::test]
    async fn oversized_file_on_disk_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![7u8; 64]).unwrap();
        let file = SelectedFile::from_path(&path).await.unwrap();

        let err = encode_file(&file, 32).await.unwrap_err();
        assert!(matches!(err, ShellError::Attachment(ref m) if m.contains("attachment limit")));

        let encoded = encode_file(&file, 64).await.unwrap();
        assert_eq!(encoded.content.len(), 88);
    }

    #[tokio::test]
    async fn file_grown_after_selection_is_checked_at_encode_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, b"short").unwrap();
        let file = SelectedFile::from_path(&path).await.unwrap();
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = encode_file(&file, 1024).await.unwrap_err();
        assert!(err.to_string().contains("4096 bytes"));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let file = SelectedFile::from_bytes("big.bin", "application/octet-stream", vec![0u8; 16]);
        let err = encode_all(&[file], 8).await.unwrap_err();
        assert!(err.to_string().contains("attachment limit"));
    }

    #[tokio::test]
    async fn directories_cannot_be_selected() {
        let dir = tempfile::tempdir().unwrap();
        let err = SelectedFile::from_path(dir.path()).await.unwrap_err();
        assert!(matches!(err, ShellError::Attachment(_)));
    }
}
