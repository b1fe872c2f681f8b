//! Post composer for the create and edit flows.

use std::sync::Arc;

use realtyfeed_api::FeedApi;
use realtyfeed_feed_sync::{Collection, PostStore};
use realtyfeed_protocol::messages::{CreatePostRequest, UpdatePostRequest};
use realtyfeed_protocol::{Author, CommentPermission, GroupRef, Post, PostPatch, Visibility};
use realtyfeed_transfer::{LocalFile, Transport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ComposeError;
use crate::session::UploadSession;
use crate::types::{ComposeConfig, ComposeEvent, Draft, StageReport};

/// Collaborators a composer talks to.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn FeedApi>,
    pub transport: Arc<dyn Transport>,
    pub store: Arc<PostStore>,
}

enum Mode {
    Create {
        author: Author,
        group: Option<GroupRef>,
    },
    Edit {
        original: Post,
    },
}

/// Turns text, settings and staged media into a submitted post.
pub struct PostComposer {
    api: Arc<dyn FeedApi>,
    store: Arc<PostStore>,
    session: UploadSession,
    mode: Mode,
    draft: Draft,
}

impl PostComposer {
    /// Composer for a new post by `author`, optionally inside `group`.
    pub fn create(
        services: Services,
        config: ComposeConfig,
        author: Author,
        group: Option<GroupRef>,
    ) -> Self {
        let session = UploadSession::new(services.api.clone(), services.transport, config);
        Self {
            api: services.api,
            store: services.store,
            session,
            mode: Mode::Create { author, group },
            draft: Draft::default(),
        }
    }

    /// Composer seeded from an existing post.
    pub fn edit(services: Services, config: ComposeConfig, post: Post) -> Self {
        let session =
            UploadSession::for_post(services.api.clone(), services.transport, config, &post);
        let draft = Draft {
            text: post.text.clone(),
            visibility: post.visibility,
            comment_permission: post.comment_permission,
        };
        Self {
            api: services.api,
            store: services.store,
            session,
            mode: Mode::Edit { original: post },
            draft,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, Mode::Edit { .. })
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.draft.visibility = visibility;
    }

    pub fn set_comment_permission(&mut self, permission: CommentPermission) {
        self.draft.comment_permission = permission;
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut UploadSession {
        &mut self.session
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ComposeEvent>> {
        self.session.take_events()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.session.cancel_token()
    }

    pub async fn stage(&mut self, files: Vec<LocalFile>) -> Result<StageReport, ComposeError> {
        self.session.stage(files).await
    }

    /// `true` once the post can be submitted: every new item has reached
    /// 100% and there is text or media.
    pub fn can_submit(&self) -> bool {
        self.blocker().is_none()
    }

    fn blocker(&self) -> Option<&'static str> {
        if self.session.has_blocking_items() {
            return Some("media uploads are not finished");
        }
        if self.draft.text.trim().is_empty() && self.session.is_empty() {
            return Some("post is empty");
        }
        None
    }

    /// Confirms pending media, then creates or updates the post.
    ///
    /// The server's answer is layered over the local draft and handed to
    /// the store; all staged state is cleared. On failure everything is
    /// kept for a retry.
    pub async fn submit(&mut self) -> Result<Post, ComposeError> {
        if let Some(reason) = self.blocker() {
            return Err(ComposeError::NotReady(reason));
        }

        if self.session.needs_confirmation()
            && let Err(e) = self.session.confirm_all().await
        {
            self.notify_error(&e);
            return Err(e);
        }

        let result = match &self.mode {
            Mode::Create { author, group } => {
                let author = author.clone();
                let group = group.clone();
                self.submit_create(author, group).await
            }
            Mode::Edit { original } => {
                let original = original.clone();
                self.submit_edit(original).await
            }
        };

        match result {
            Ok(post) => {
                info!(post_id = %post.id, edit = self.is_edit(), "post submitted");
                self.session.emit(ComposeEvent::Submitted {
                    post_id: post.id.clone(),
                });
                self.session.emit(ComposeEvent::Notice {
                    message: if self.is_edit() {
                        "Post updated".into()
                    } else {
                        "Post published".into()
                    },
                    is_error: false,
                });
                if let Mode::Edit { original } = &mut self.mode {
                    self.session.seed(&post);
                    *original = post.clone();
                } else {
                    self.session.clear();
                    self.draft = Draft::default();
                }
                Ok(post)
            }
            Err(e) => {
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn submit_create(
        &mut self,
        author: Author,
        group: Option<GroupRef>,
    ) -> Result<Post, ComposeError> {
        let request = CreatePostRequest {
            text: self.draft.text.clone(),
            visibility: self.draft.visibility,
            comment_permission: self.draft.comment_permission,
            media_slug: self
                .session
                .has_new_media()
                .then(|| self.session.slug().map(str::to_string))
                .flatten(),
            group_id: group.as_ref().map(|g| g.id.clone()),
        };

        let response = self
            .api
            .create_post(&request)
            .await
            .map_err(ComposeError::SubmissionFailed)?;

        let mut merged = PostPatch::new(&response.id);
        merged.author = Some(author.clone());
        merged.text = Some(request.text);
        merged.visibility = Some(request.visibility);
        merged.comment_permission = Some(request.comment_permission);
        merged.media = Some(self.session.media_items());
        merged.group = group.clone();
        merged.overlay(&response);

        let post = merged
            .into_post()
            .ok_or(ComposeError::NotReady("post has no author"))?;

        self.store.prepend(Collection::Feed, post.clone());
        self.store.prepend(Collection::Own, post.clone());
        if let Some(group) = &group
            && self.store.group_id().as_deref() == Some(group.id.as_str())
        {
            self.store.prepend(Collection::Group, post.clone());
        }
        Ok(post)
    }

    async fn submit_edit(&mut self, original: Post) -> Result<Post, ComposeError> {
        let request = UpdatePostRequest {
            text: (self.draft.text != original.text).then(|| self.draft.text.clone()),
            visibility: (self.draft.visibility != original.visibility)
                .then_some(self.draft.visibility),
            comment_permission: (self.draft.comment_permission != original.comment_permission)
                .then_some(self.draft.comment_permission),
            media_slug: self
                .session
                .has_new_media()
                .then(|| self.session.slug().map(str::to_string))
                .flatten(),
            deleted_media_ids: self.session.deleted_media_ids().to_vec(),
        };

        let mut merged = PostPatch::from(original.clone());
        merged.text = Some(self.draft.text.clone());
        merged.visibility = Some(self.draft.visibility);
        merged.comment_permission = Some(self.draft.comment_permission);
        merged.media = Some(self.session.media_items());

        if request.is_empty() {
            warn!(post_id = %original.id, "edit changed nothing, not sent");
            return Ok(original);
        }

        let response = self
            .api
            .update_post(&original.id, &request)
            .await
            .map_err(ComposeError::SubmissionFailed)?;
        merged.overlay(&response);

        self.store.apply_update(&merged);
        let mut post = original;
        post.merge(&merged);
        Ok(post)
    }

    fn notify_error(&self, e: &ComposeError) {
        error!(error = %e, "submission failed");
        self.session.emit(ComposeEvent::Notice {
            message: e.to_string(),
            is_error: true,
        });
    }

    /// Dismisses the composer and releases all staged state.
    pub fn dismiss(&mut self) {
        self.session.dismiss();
    }
}
