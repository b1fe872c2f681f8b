//! Post state synchronizer.
//!
//! [`PostStore`] holds every post the client shows, once, and the named
//! collections that list it. [`Interactions`] and [`PostActions`] call the
//! server and route the outcome through the store.

mod actions;
mod error;
mod interactions;
mod store;

#[cfg(test)]
mod mock;

pub use actions::PostActions;
pub use error::SyncError;
pub use interactions::{Interactions, ToggleFailurePolicy, ToggleOutcome};
pub use store::{Collection, PostStore};
