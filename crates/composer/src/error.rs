//! Compose error types.

use realtyfeed_api::ApiError;

/// Batch- and submission-scoped failures.
///
/// Item-scoped failures (rejected files, failed transfers, missing
/// credentials) are recorded on the item instead.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("could not obtain upload credentials: {0}")]
    CredentialIssuanceFailed(#[source] ApiError),

    #[error("could not confirm uploaded media: {0}")]
    ConfirmationFailed(#[source] ApiError),

    #[error("post submission failed: {0}")]
    SubmissionFailed(#[source] ApiError),

    #[error("not ready to submit: {0}")]
    NotReady(&'static str),

    #[error("no staged media with id {0}")]
    UnknownMedia(String),

    #[error("compose screen dismissed")]
    Dismissed,
}
