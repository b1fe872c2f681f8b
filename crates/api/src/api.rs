use std::future::Future;
use std::pin::Pin;

use realtyfeed_protocol::messages::{
    CreatePostRequest, ModerationAction, PresignRequest, PresignResponse, UpdatePostRequest,
};
use realtyfeed_protocol::{Comment, InteractionKind, Post, PostPatch};

use crate::ApiError;

/// Boxed future returned by [`FeedApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Server operations used by the upload pipeline and the synchronizer.
pub trait FeedApi: Send + Sync {
    /// Requests write credentials for a batch of files.
    fn presign<'a>(&'a self, request: &'a PresignRequest) -> ApiFuture<'a, PresignResponse>;

    /// Confirms that the listed media landed in storage.
    fn confirm_uploaded<'a>(&'a self, media_ids: &'a [String]) -> ApiFuture<'a, ()>;

    fn get_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, Post>;

    /// Creates a post and returns the server's view of it.
    fn create_post<'a>(&'a self, request: &'a CreatePostRequest) -> ApiFuture<'a, PostPatch>;

    /// Updates a post and returns the server's view of it.
    fn update_post<'a>(
        &'a self,
        post_id: &'a str,
        request: &'a UpdatePostRequest,
    ) -> ApiFuture<'a, PostPatch>;

    fn delete_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()>;

    fn hide_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()>;

    /// Sets (`on`) or unsets a like/save.
    ///
    /// Returns the post fields the server echoed back, if any.
    fn set_interaction<'a>(
        &'a self,
        post_id: &'a str,
        kind: InteractionKind,
        on: bool,
    ) -> ApiFuture<'a, Option<PostPatch>>;

    fn create_comment<'a>(&'a self, post_id: &'a str, text: &'a str) -> ApiFuture<'a, Comment>;

    /// Approves or rejects a comment. Returns the updated comment when the
    /// server sends one.
    fn moderate_comment<'a>(
        &'a self,
        comment_id: &'a str,
        action: ModerationAction,
    ) -> ApiFuture<'a, Option<Comment>>;

    fn delete_comment<'a>(&'a self, comment_id: &'a str) -> ApiFuture<'a, ()>;
}
