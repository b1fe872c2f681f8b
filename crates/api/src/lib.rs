//! Client for the realty feed API.
//!
//! [`FeedApi`] is the seam the composer and the synchronizer talk through;
//! [`Client`] implements it over HTTP with bearer authentication.

mod api;
mod client;
mod error;

pub use api::{ApiFuture, FeedApi};
pub use client::Client;
pub use error::ApiError;
