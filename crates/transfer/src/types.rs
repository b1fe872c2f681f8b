use std::path::Path;
use std::time::UNIX_EPOCH;

use bytes::Bytes;

/// Metadata of a file the user picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// File name without directories.
    pub name: String,
    /// Last modification time in milliseconds since the Unix epoch.
    pub modified_ms: i64,
    /// Size of the original file in bytes.
    pub size: u64,
    pub mime_type: String,
}

/// A picked file together with its contents.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub descriptor: FileDescriptor,
    pub bytes: Bytes,
}

impl LocalFile {
    /// Wraps in-memory contents. `size` is taken from the bytes.
    pub fn new(
        name: impl Into<String>,
        modified_ms: i64,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            descriptor: FileDescriptor {
                name: name.into(),
                modified_ms,
                size: bytes.len() as u64,
                mime_type: mime_type.into(),
            },
            bytes,
        }
    }

    /// Reads a file from disk, taking name, mtime and size from its metadata.
    pub fn read(path: &Path, mime_type: impl Into<String>) -> Result<Self, std::io::Error> {
        let metadata = std::fs::metadata(path)?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;

        Ok(Self {
            descriptor: FileDescriptor {
                name,
                modified_ms,
                size: metadata.len(),
                mime_type: mime_type.into(),
            },
            bytes: Bytes::from(bytes),
        })
    }
}
