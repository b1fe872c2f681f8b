use std::sync::Arc;

use realtyfeed_api::FeedApi;
use realtyfeed_protocol::messages::ModerationAction;
use realtyfeed_protocol::{Comment, ModerationState, PostPatch};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::store::PostStore;

/// Server-confirmed post and comment actions.
///
/// Unlike toggles these wait for the server before touching the store.
pub struct PostActions {
    store: Arc<PostStore>,
    api: Arc<dyn FeedApi>,
}

impl PostActions {
    pub fn new(store: Arc<PostStore>, api: Arc<dyn FeedApi>) -> Self {
        Self { store, api }
    }

    /// Posts a comment and appends it to the post.
    pub async fn comment(&self, post_id: &str, text: &str) -> Result<Comment, SyncError> {
        let comment = self
            .api
            .create_comment(post_id, text)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: "comment",
                source,
            })?;
        debug!(post_id, comment_id = %comment.id, state = ?comment.moderation_state, "comment created");
        self.store.add_comment(comment.clone());
        Ok(comment)
    }

    /// Approves or rejects a pending comment.
    pub async fn moderate(
        &self,
        post_id: &str,
        comment_id: &str,
        action: ModerationAction,
    ) -> Result<(), SyncError> {
        let updated = self
            .api
            .moderate_comment(comment_id, action)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: action.as_str(),
                source,
            })?;

        match updated {
            Some(comment) if comment.post_id == post_id => {
                self.store.update_comment(comment);
            }
            _ => {
                let state = match action {
                    ModerationAction::Approve => ModerationState::Approved,
                    ModerationAction::Reject => ModerationState::Rejected,
                };
                self.store.set_comment_state(post_id, comment_id, state);
            }
        }
        Ok(())
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), SyncError> {
        self.api
            .delete_comment(comment_id)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: "delete comment",
                source,
            })?;
        self.store.remove_comment(post_id, comment_id);
        Ok(())
    }

    /// Deletes a post and removes it from every collection.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), SyncError> {
        self.api
            .delete_post(post_id)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: "delete post",
                source,
            })?;
        self.store.remove(post_id);
        info!(post_id, "post deleted");
        Ok(())
    }

    /// Hides a post from the viewer and removes it from every collection.
    pub async fn hide_post(&self, post_id: &str) -> Result<(), SyncError> {
        self.api
            .hide_post(post_id)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: "hide post",
                source,
            })?;
        self.store.remove(post_id);
        info!(post_id, "post hidden");
        Ok(())
    }

    /// Re-fetches a post and applies it as canonical.
    ///
    /// Returns `false` when no collection holds the post.
    pub async fn refresh(&self, post_id: &str) -> Result<bool, SyncError> {
        let post = self
            .api
            .get_post(post_id)
            .await
            .map_err(|source| SyncError::ActionFailed {
                action: "refresh",
                source,
            })?;
        Ok(self.store.apply_update(&PostPatch::from(post)))
    }
}
