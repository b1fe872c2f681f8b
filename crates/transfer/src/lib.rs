//! Media staging primitives for the post composer.
//!
//! Everything here works on a single file and holds no session state:
//!
//! 1. **Fingerprint**: stable identity from name, mtime and size
//! 2. **Validate**: per-kind type and size policy
//! 3. **Preprocess**: best-effort image downscale and re-encode
//! 4. **Transfer**: one direct `PUT` to a presigned URL with progress

mod compress;
mod engine;
mod fingerprint;
mod progress;
mod types;
mod validation;

pub use compress::{CompressionConfig, Processed, preprocess, preprocess_blocking};
pub use engine::{HttpTransport, TransferConfig, TransferFuture, Transport};
pub use fingerprint::fingerprint;
pub use progress::{ProgressSink, TransferProgress, progress_channel};
pub use types::{FileDescriptor, LocalFile};
pub use validation::{MediaPolicy, ValidationError};

/// Errors produced by a single transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected upload with status {status}: {body}")]
    Status { status: u16, body: String },
}
