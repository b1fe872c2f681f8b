//! HTTP implementation of [`FeedApi`].
//!
//! Async client using `reqwest` with Bearer token authentication. Every
//! endpoint answers with an [`ApiResponse`] envelope.

use realtyfeed_protocol::ApiResponse;
use realtyfeed_protocol::constants::{
    FILE_UPLOADED_PATH, POSTS_PATH, PRESIGN_PATH, comment_path, comments_path, hide_post_path,
    interaction_path, moderation_path, post_path,
};
use realtyfeed_protocol::messages::{
    CreateCommentRequest, CreatePostRequest, FileUploadedRequest, ModerationAction,
    PresignRequest, PresignResponse, UpdatePostRequest,
};
use realtyfeed_protocol::{Comment, InteractionKind, Post, PostPatch};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::api::{ApiFuture, FeedApi};
use crate::error::ApiError;

/// Feed API client.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a client for `base_url` authenticating with `token`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and unwraps the response envelope.
    ///
    /// `Ok(None)` means the server reported success without a payload.
    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        envelope.into_result().map_err(ApiError::Rejected)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        self.call(request).await?.ok_or(ApiError::EmptyData)
    }

    async fn call_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        self.call::<IgnoredAny>(request).await.map(|_| ())
    }
}

impl FeedApi for Client {
    fn presign<'a>(&'a self, request: &'a PresignRequest) -> ApiFuture<'a, PresignResponse> {
        Box::pin(async move {
            debug!(
                count = request.medias.len(),
                slug = ?request.post_slug,
                "requesting media credentials"
            );
            self.call_required(self.http.post(self.url(PRESIGN_PATH)).json(request))
                .await
        })
    }

    fn confirm_uploaded<'a>(&'a self, media_ids: &'a [String]) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            debug!(count = media_ids.len(), "confirming uploaded media");
            let body = FileUploadedRequest {
                media_ids: media_ids.to_vec(),
            };
            self.call_empty(self.http.post(self.url(FILE_UPLOADED_PATH)).json(&body))
                .await
        })
    }

    fn get_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, Post> {
        Box::pin(async move {
            self.call_required(self.http.get(self.url(&post_path(post_id))))
                .await
        })
    }

    fn create_post<'a>(&'a self, request: &'a CreatePostRequest) -> ApiFuture<'a, PostPatch> {
        Box::pin(async move {
            self.call_required(self.http.post(self.url(POSTS_PATH)).json(request))
                .await
        })
    }

    fn update_post<'a>(
        &'a self,
        post_id: &'a str,
        request: &'a UpdatePostRequest,
    ) -> ApiFuture<'a, PostPatch> {
        Box::pin(async move {
            self.call_required(self.http.put(self.url(&post_path(post_id))).json(request))
                .await
        })
    }

    fn delete_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.call_empty(self.http.delete(self.url(&post_path(post_id))))
                .await
        })
    }

    fn hide_post<'a>(&'a self, post_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.call_empty(self.http.post(self.url(&hide_post_path(post_id))))
                .await
        })
    }

    fn set_interaction<'a>(
        &'a self,
        post_id: &'a str,
        kind: InteractionKind,
        on: bool,
    ) -> ApiFuture<'a, Option<PostPatch>> {
        Box::pin(async move {
            let url = self.url(&interaction_path(post_id, kind));
            let request = if on {
                self.http.post(url)
            } else {
                self.http.delete(url)
            };
            // The echo is advisory: a 2xx always counts as accepted.
            let data = match self.call::<serde_json::Value>(request).await {
                Ok(data) => data,
                Err(ApiError::Json(e)) => {
                    debug!(post_id, error = %e, "unparsable interaction response");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            Ok(data.and_then(|value| match serde_json::from_value::<PostPatch>(value) {
                Ok(patch) => Some(patch),
                Err(e) => {
                    debug!(post_id, error = %e, "ignoring interaction echo");
                    None
                }
            }))
        })
    }

    fn create_comment<'a>(&'a self, post_id: &'a str, text: &'a str) -> ApiFuture<'a, Comment> {
        Box::pin(async move {
            let body = CreateCommentRequest {
                text: text.to_string(),
            };
            self.call_required(self.http.post(self.url(&comments_path(post_id))).json(&body))
                .await
        })
    }

    fn moderate_comment<'a>(
        &'a self,
        comment_id: &'a str,
        action: ModerationAction,
    ) -> ApiFuture<'a, Option<Comment>> {
        Box::pin(async move {
            self.call(
                self.http
                    .post(self.url(&moderation_path(comment_id, action))),
            )
            .await
        })
    }

    fn delete_comment<'a>(&'a self, comment_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.call_empty(self.http.delete(self.url(&comment_path(comment_id))))
                .await
        })
    }
}
