use realtyfeed_api::ApiError;
use realtyfeed_protocol::InteractionKind;

/// Errors from synchronized post actions.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("post {0} is not in any collection")]
    UnknownPost(String),

    #[error("{kind:?} toggle on post {post_id} failed: {source}")]
    ToggleFailed {
        post_id: String,
        kind: InteractionKind,
        #[source]
        source: ApiError,
    },

    #[error("{action} failed: {source}")]
    ActionFailed {
        action: &'static str,
        #[source]
        source: ApiError,
    },
}
