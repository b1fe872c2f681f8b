//! Endpoint paths and fixed protocol values.

use crate::messages::ModerationAction;
use crate::types::InteractionKind;

/// Issues write credentials for a batch of media files.
pub const PRESIGN_PATH: &str = "/media/get-presigned-url";

/// Confirms that previously signed media landed in storage.
pub const FILE_UPLOADED_PATH: &str = "/media/file-uploaded";

/// Collection endpoint for post creation.
pub const POSTS_PATH: &str = "/posts";

/// `mediableType` tag sent with every credential request from the composer.
pub const MEDIABLE_TYPE_POST: &str = "Post";

/// `mediaRole` sent for every post attachment.
pub const MEDIA_ROLE_ATTACHMENT: &str = "attachment";

/// Path of a single post.
pub fn post_path(post_id: &str) -> String {
    format!("{POSTS_PATH}/{post_id}")
}

/// Path of the like/save toggle endpoint for a post.
///
/// `POST` sets the interaction, `DELETE` unsets it.
pub fn interaction_path(post_id: &str, kind: InteractionKind) -> String {
    let segment = match kind {
        InteractionKind::Like => "like",
        InteractionKind::Save => "save",
    };
    format!("{POSTS_PATH}/{post_id}/{segment}")
}

/// Path used to hide a post from the viewer's collections.
pub fn hide_post_path(post_id: &str) -> String {
    format!("{POSTS_PATH}/{post_id}/hide")
}

/// Path of a post's comment list.
pub fn comments_path(post_id: &str) -> String {
    format!("{POSTS_PATH}/{post_id}/comments")
}

/// Path of a single comment.
pub fn comment_path(comment_id: &str) -> String {
    format!("/comments/{comment_id}")
}

/// Path of a moderation action on a comment.
pub fn moderation_path(comment_id: &str, action: ModerationAction) -> String {
    format!("{}/{}", comment_path(comment_id), action.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_paths() {
        assert_eq!(interaction_path("42", InteractionKind::Like), "/posts/42/like");
        assert_eq!(interaction_path("42", InteractionKind::Save), "/posts/42/save");
    }

    #[test]
    fn post_scoped_paths() {
        assert_eq!(post_path("p1"), "/posts/p1");
        assert_eq!(hide_post_path("p1"), "/posts/p1/hide");
        assert_eq!(comments_path("p1"), "/posts/p1/comments");
        assert_eq!(comment_path("c9"), "/comments/c9");
        assert_eq!(
            moderation_path("c9", ModerationAction::Approve),
            "/comments/c9/approve"
        );
        assert_eq!(
            moderation_path("c9", ModerationAction::Reject),
            "/comments/c9/reject"
        );
    }
}
