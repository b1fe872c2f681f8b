//! Data types for the compose flow.

use bytes::Bytes;
use realtyfeed_protocol::{CommentPermission, MediaItem, MediaKind, Visibility};
use realtyfeed_transfer::{CompressionConfig, MediaPolicy, ValidationError};

use crate::preview::PreviewHandle;

/// Why a staged item cannot be submitted as it stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    /// The credential response had no usable record for this item.
    CredentialMissing(String),
    /// The transfer to storage failed.
    TransferFailed(String),
}

impl ItemFailure {
    pub fn reason(&self) -> &str {
        match self {
            Self::CredentialMissing(reason) | Self::TransferFailed(reason) => reason,
        }
    }
}

/// One file attached to the composer.
#[derive(Debug, Clone)]
pub struct StagedMedia {
    /// Fingerprint of the picked file, or the remote id for existing media.
    pub local_id: String,
    pub kind: MediaKind,
    pub file_name: String,
    /// MIME type of `source_bytes`, which compression may have changed.
    pub mime_type: String,
    /// Payload to transfer. Empty for existing media.
    pub source_bytes: Bytes,
    pub compressed: bool,
    pub preview: Option<PreviewHandle>,
    pub remote_id: Option<String>,
    pub upload_url: Option<String>,
    /// Public URL of existing media.
    pub url: Option<String>,
    pub progress_percent: u8,
    pub confirmed: bool,
    /// Already attached to the post being edited. Carries no transfer.
    pub existing: bool,
    pub failure: Option<ItemFailure>,
}

impl StagedMedia {
    /// Seeds an item from media already attached to a post.
    pub fn from_existing(media: &MediaItem) -> Self {
        Self {
            local_id: media.id.clone(),
            kind: media.kind().unwrap_or(MediaKind::Image),
            file_name: String::new(),
            mime_type: media.mime_type.clone(),
            source_bytes: Bytes::new(),
            compressed: false,
            preview: None,
            remote_id: Some(media.id.clone()),
            upload_url: None,
            url: Some(media.url.clone()).filter(|u| !u.is_empty()),
            progress_percent: 100,
            confirmed: true,
            existing: true,
            failure: None,
        }
    }

    /// Transferred but not yet confirmed.
    pub fn awaiting_confirmation(&self) -> bool {
        !self.existing
            && self.failure.is_none()
            && self.remote_id.is_some()
            && self.progress_percent == 100
            && !self.confirmed
    }

    /// Blocks submission: a new item that has not reached 100%.
    pub fn is_blocking(&self) -> bool {
        !self.existing && self.progress_percent < 100
    }

    /// Due for a transfer attempt.
    pub(crate) fn ready_to_transfer(&self) -> bool {
        !self.existing
            && self.failure.is_none()
            && self.upload_url.is_some()
            && self.progress_percent < 100
    }

    /// The media entry this item becomes on a post.
    pub fn to_media_item(&self) -> Option<MediaItem> {
        Some(MediaItem {
            id: self.remote_id.clone()?,
            url: self.url.clone().unwrap_or_default(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// Outcome of one `stage` call.
#[derive(Debug, Default)]
pub struct StageReport {
    /// Items created by this call, in pick order.
    pub staged: Vec<String>,
    /// Identities already staged in this session.
    pub duplicates: Vec<String>,
    pub rejected: Vec<ValidationError>,
}

/// Event emitted while composing.
///
/// Events are hints for the screen; the session's item state stays
/// authoritative, and events are dropped when nobody drains them.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeEvent {
    /// A file passed validation and was staged.
    Staged {
        local_id: String,
        file_name: String,
        kind: MediaKind,
    },
    /// A file was rejected before reaching the network.
    Rejected { file_name: String, reason: String },
    /// Transfer progress for one item.
    Progress { local_id: String, percent: u8 },
    /// Storage acknowledged an item.
    Transferred { local_id: String },
    /// An item failed; siblings are unaffected.
    TransferFailed { local_id: String, error: String },
    /// The server confirmed these remote ids.
    Confirmed { remote_ids: Vec<String> },
    /// The post was created or updated.
    Submitted { post_id: String },
    /// Message for the toast layer.
    Notice { message: String, is_error: bool },
}

/// Tunables for a compose session.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub policy: MediaPolicy,
    pub compression: CompressionConfig,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            policy: MediaPolicy::default(),
            compression: CompressionConfig::default(),
            event_capacity: 256,
        }
    }
}

/// Text and settings the user is editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub text: String,
    pub visibility: Visibility,
    pub comment_permission: CommentPermission,
}
