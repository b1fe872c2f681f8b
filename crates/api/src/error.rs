/// Errors from the feed API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("rejected by server: {0}")]
    Rejected(String),

    #[error("response carried no data")]
    EmptyData,
}
