pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::ApiResponse;
pub use types::{
    Author, Comment, CommentPermission, GroupRef, InteractionKind, MediaItem, MediaKind,
    ModerationState, Post, PostPatch, Visibility,
};
