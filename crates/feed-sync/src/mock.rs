//! In-memory [`FeedApi`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use realtyfeed_api::{ApiError, ApiFuture, FeedApi};
use realtyfeed_protocol::messages::{
    CreatePostRequest, ModerationAction, PresignRequest, PresignResponse, UpdatePostRequest,
};
use realtyfeed_protocol::{Comment, InteractionKind, Post, PostPatch};
use tokio::sync::Notify;

/// Records every call as `"<op> <args>"` and answers from queues. An empty
/// queue answers with success and no data.
#[derive(Default)]
pub(crate) struct MockApi {
    pub calls: Mutex<Vec<String>>,
    pub interactions: Mutex<VecDeque<Result<Option<PostPatch>, ApiError>>>,
    pub comments: Mutex<VecDeque<Result<Comment, ApiError>>>,
    pub moderations: Mutex<VecDeque<Result<Option<Comment>, ApiError>>>,
    pub units: Mutex<VecDeque<Result<(), ApiError>>>,
    pub posts: Mutex<VecDeque<Result<Post, ApiError>>>,
    /// When set, interaction calls wait for a `notify_one`.
    pub hold_interactions: bool,
    pub release: Notify,
}

pub(crate) fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        body: "boom".into(),
    }
}

impl MockApi {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl FeedApi for MockApi {
    fn presign<'a>(&'a self, _request: &'a PresignRequest) -> ApiFuture<'a, PresignResponse> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    fn confirm_uploaded<'a>(&'a self, _media_ids: &'a [String]) -> ApiFuture<'a, ()> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    fn get_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, Post> {
        Box::pin(async move {
            self.record(format!("get {post_id}"));
            self.posts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiError::EmptyData))
        })
    }

    fn create_post<'a>(&'a self, _request: &'a CreatePostRequest) -> ApiFuture<'a, PostPatch> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    fn update_post<'a>(
        &'a self,
        _post_id: &'a str,
        _request: &'a UpdatePostRequest,
    ) -> ApiFuture<'a, PostPatch> {
        Box::pin(async { Err(ApiError::EmptyData) })
    }

    fn delete_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("delete {post_id}"));
            self.units.lock().unwrap().pop_front().unwrap_or(Ok(()))
        })
    }

    fn hide_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("hide {post_id}"));
            self.units.lock().unwrap().pop_front().unwrap_or(Ok(()))
        })
    }

    fn set_interaction<'a>(
        &'a self,
        post_id: &'a str,
        kind: InteractionKind,
        on: bool,
    ) -> ApiFuture<'a, Option<PostPatch>> {
        Box::pin(async move {
            self.record(format!("{kind:?} {post_id} {on}"));
            if self.hold_interactions {
                self.release.notified().await;
            }
            self.interactions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        })
    }

    fn create_comment<'a>(&'a self, post_id: &'a str, text: &'a str) -> ApiFuture<'a, Comment> {
        Box::pin(async move {
            self.record(format!("comment {post_id} {text}"));
            self.comments
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiError::EmptyData))
        })
    }

    fn moderate_comment<'a>(
        &'a self,
        comment_id: &'a str,
        action: ModerationAction,
    ) -> ApiFuture<'a, Option<Comment>> {
        Box::pin(async move {
            self.record(format!("{} {comment_id}", action.as_str()));
            self.moderations
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        })
    }

    fn delete_comment<'a>(&'a self, comment_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("delete-comment {comment_id}"));
            self.units.lock().unwrap().pop_front().unwrap_or(Ok(()))
        })
    }
}
