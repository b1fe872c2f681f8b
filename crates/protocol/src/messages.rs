use serde::{Deserialize, Serialize};

use crate::constants::{MEDIA_ROLE_ATTACHMENT, MEDIABLE_TYPE_POST};
use crate::types::{CommentPermission, MediaKind, Visibility};

// ---------------------------------------------------------------------------
// Media credentials
// ---------------------------------------------------------------------------

/// One file in a credential request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignMedia {
    pub file_name: String,
    pub file_type: MediaKind,
    pub mime_type: String,
    pub file_size: u64,
    pub is_primary: bool,
    pub media_role: String,
}

impl PresignMedia {
    /// Describes a post attachment.
    pub fn attachment(
        file_name: impl Into<String>,
        file_type: MediaKind,
        mime_type: impl Into<String>,
        file_size: u64,
        is_primary: bool,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type,
            mime_type: mime_type.into(),
            file_size,
            is_primary,
            media_role: MEDIA_ROLE_ATTACHMENT.into(),
        }
    }
}

/// Requests write credentials for a batch of files.
///
/// The response lists one record per entry of `medias`, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub mediable_type: String,
    pub medias: Vec<PresignMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_slug: Option<String>,
}

impl PresignRequest {
    /// Credential request for post attachments.
    pub fn for_post(medias: Vec<PresignMedia>, post_slug: Option<String>) -> Self {
        Self {
            mediable_type: MEDIABLE_TYPE_POST.into(),
            medias,
            post_slug,
        }
    }
}

/// Media object created by a credential request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMedia {
    pub uuid: String,
    pub mime_type: String,
}

/// Credential issued for one requested file.
///
/// Either half may be missing when the server could not sign that file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<RemoteMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
}

impl MediaRecord {
    /// Returns `(uuid, url)` when the credential is usable.
    pub fn credential(&self) -> Option<(&str, &str)> {
        let media = self.media.as_ref()?;
        let url = self.presigned_url.as_deref()?;
        if media.uuid.is_empty() || url.is_empty() {
            return None;
        }
        Some((media.uuid.as_str(), url))
    }
}

/// Payload of a successful credential response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub slug: String,
    #[serde(default)]
    pub media_records: Vec<MediaRecord>,
}

/// Confirms that the listed media landed in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadedRequest {
    pub media_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Creates a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub text: String,
    pub visibility: Visibility,
    pub comment_permission: CommentPermission,
    /// Slug of the signed media batch, when media is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Updates a post. Only changed fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_permission: Option<CommentPermission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_media_ids: Vec<String>,
}

impl UpdatePostRequest {
    /// Returns `true` when the request would change nothing.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.visibility.is_none()
            && self.comment_permission.is_none()
            && self.media_slug.is_none()
            && self.deleted_media_ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Creates a comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

/// Moderation action on a pending comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    /// Path segment of the action endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}
