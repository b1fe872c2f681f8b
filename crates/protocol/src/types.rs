use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a MIME type. Returns `None` for anything that is not an
    /// image or a video.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let top = mime_type.split('/').next().unwrap_or_default();
        match top.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Wire name (`"image"` / `"video"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Who can see a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    OnlyMe,
}

/// Who can comment on a post.
///
/// `Moderated` accepts comments from anyone but holds them as pending
/// until the author approves them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentPermission {
    #[default]
    Everyone,
    Connections,
    Moderated,
    Nobody,
}

/// Moderation state of a comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    #[default]
    Approved,
    Rejected,
}

/// Viewer-relative interaction that can be toggled on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Save,
}

/// Author reference embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Group a post was published in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
    pub name: String,
}

/// Media attached to a persisted post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Server-side media UUID.
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    pub mime_type: String,
}

impl MediaItem {
    /// Kind derived from the MIME type.
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub text: String,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub liked_by_viewer: bool,
    #[serde(default)]
    pub moderation_state: ModerationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_approved(&self) -> bool {
        self.moderation_state == ModerationState::Approved
    }
}

/// Canonical post as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    pub author: Author,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub comment_permission: CommentPermission,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub share_count: u32,
    #[serde(default)]
    pub save_count: u32,
    #[serde(default)]
    pub liked_by_viewer: bool,
    #[serde(default)]
    pub saved_by_viewer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial post: identity plus whichever fields the sender knows.
///
/// A missing or `null` field means "unchanged", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_permission: Option<CommentPermission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_by_viewer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_by_viewer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

macro_rules! overwrite_present {
    ($target:expr, $patch:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = value.clone();
            }
        )+
    };
}

macro_rules! overlay_present {
    ($target:expr, $other:expr, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $target.$field = $other.$field.clone();
            }
        )+
    };
}

impl Post {
    /// Field-level merge: every field present in `patch` overwrites, every
    /// absent field keeps its current value. The identity never changes.
    pub fn merge(&mut self, patch: &PostPatch) {
        overwrite_present!(
            self,
            patch,
            slug,
            author,
            text,
            media,
            visibility,
            comment_permission,
            like_count,
            comment_count,
            share_count,
            save_count,
            liked_by_viewer,
            saved_by_viewer,
            comments,
        );
        if patch.group.is_some() {
            self.group = patch.group.clone();
        }
        if patch.created_at.is_some() {
            self.created_at = patch.created_at;
        }
    }

    /// Current viewer flag and counter for an interaction.
    pub fn interaction(&self, kind: InteractionKind) -> (bool, u32) {
        match kind {
            InteractionKind::Like => (self.liked_by_viewer, self.like_count),
            InteractionKind::Save => (self.saved_by_viewer, self.save_count),
        }
    }
}

impl PostPatch {
    /// Empty patch for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Patch carrying only an interaction flag and its counter.
    pub fn interaction(id: impl Into<String>, kind: InteractionKind, on: bool, count: u32) -> Self {
        let mut patch = Self::new(id);
        match kind {
            InteractionKind::Like => {
                patch.liked_by_viewer = Some(on);
                patch.like_count = Some(count);
            }
            InteractionKind::Save => {
                patch.saved_by_viewer = Some(on);
                patch.save_count = Some(count);
            }
        }
        patch
    }

    /// Layers `other` on top of this patch with the same field rule as
    /// [`Post::merge`]. The identity is kept.
    pub fn overlay(&mut self, other: &PostPatch) {
        overlay_present!(
            self,
            other,
            slug,
            author,
            text,
            media,
            visibility,
            comment_permission,
            like_count,
            comment_count,
            share_count,
            save_count,
            liked_by_viewer,
            saved_by_viewer,
            group,
            comments,
            created_at,
        );
    }

    /// Builds a full post from this patch when it carries everything a post
    /// requires (currently just the author).
    pub fn into_post(self) -> Option<Post> {
        let author = self.author.clone()?;
        let mut post = Post {
            id: self.id.clone(),
            slug: String::new(),
            author,
            text: String::new(),
            media: Vec::new(),
            visibility: Visibility::default(),
            comment_permission: CommentPermission::default(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            save_count: 0,
            liked_by_viewer: false,
            saved_by_viewer: false,
            group: None,
            comments: Vec::new(),
            created_at: None,
        };
        post.merge(&self);
        Some(post)
    }
}

impl From<Post> for PostPatch {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: Some(post.slug),
            author: Some(post.author),
            text: Some(post.text),
            media: Some(post.media),
            visibility: Some(post.visibility),
            comment_permission: Some(post.comment_permission),
            like_count: Some(post.like_count),
            comment_count: Some(post.comment_count),
            share_count: Some(post.share_count),
            save_count: Some(post.save_count),
            liked_by_viewer: Some(post.liked_by_viewer),
            saved_by_viewer: Some(post.saved_by_viewer),
            group: post.group,
            comments: Some(post.comments),
            created_at: post.created_at,
        }
    }
}
