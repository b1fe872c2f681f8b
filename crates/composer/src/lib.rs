//! Post composer: media staging, signed uploads and submission.
//!
//! # Pipeline
//!
//! 1. **Stage**: dedupe, validate and compress picked files, issue previews
//! 2. **Sign**: one credential request per batch, paired with items by position
//! 3. **Transfer**: every signed item in parallel, progress per item
//! 4. **Confirm**: report all transferred remote ids in one call
//! 5. **Submit**: create or update the post and hand it to the [`PostStore`]
//!
//! The [`UploadSession`] owns staged state; [`PostComposer`] adds the draft
//! and the create/edit submission on top.
//!
//! [`PostStore`]: realtyfeed_feed_sync::PostStore

pub mod composer;
pub mod error;
pub mod preview;
pub mod session;
pub mod types;

#[cfg(test)]
mod testing;

pub use composer::{PostComposer, Services};
pub use error::ComposeError;
pub use preview::{Preview, PreviewHandle, PreviewRegistry};
pub use session::UploadSession;
pub use types::{
    ComposeConfig, ComposeEvent, Draft, ItemFailure, StageReport, StagedMedia,
};
