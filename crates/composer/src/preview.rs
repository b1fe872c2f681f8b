//! Locally renderable previews of staged media.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use uuid::Uuid;

/// Reference to a preview held by a [`PreviewRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(Uuid);

impl PreviewHandle {
    /// URI a view layer can resolve through the registry.
    pub fn uri(&self) -> String {
        format!("preview://{}", self.0)
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A preview's payload.
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// In-memory store of preview payloads, keyed by handle.
///
/// Handles stay valid until revoked; a revoked handle no longer resolves.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    previews: Mutex<HashMap<PreviewHandle, Preview>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payload and returns its handle.
    pub fn issue(&self, bytes: Bytes, mime_type: &str) -> PreviewHandle {
        let handle = PreviewHandle(Uuid::new_v4());
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                handle.clone(),
                Preview {
                    bytes,
                    mime_type: mime_type.to_string(),
                },
            );
        handle
    }

    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Preview> {
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    /// Releases a preview. Returns `false` if it was already released.
    pub fn revoke(&self, handle: &PreviewHandle) -> bool {
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle)
            .is_some()
    }

    /// Number of live previews.
    pub fn len(&self) -> usize {
        self.previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
