//! Direct transfer of one payload to a presigned storage URL.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;

use crate::TransferError;
use crate::progress::ProgressSink;

/// Default streaming chunk: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Transfer tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Bytes handed to the transport between progress reports.
    pub chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Boxed future returned by [`Transport::put`].
pub type TransferFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;

/// Writes one payload to a presigned URL.
///
/// Implementations report progress through `progress` and call
/// [`ProgressSink::complete`] only after storage acknowledged the write.
pub trait Transport: Send + Sync {
    fn put<'a>(
        &'a self,
        body: Bytes,
        url: &'a str,
        mime_type: &'a str,
        progress: ProgressSink,
    ) -> TransferFuture<'a>;
}

/// [`Transport`] over plain HTTP `PUT`.
///
/// The client carries no default headers: presigned URLs carry their own
/// authorization and reject extra credentials.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &TransferConfig) -> Self {
        Self {
            http,
            chunk_size: config.chunk_size.max(1),
        }
    }

    async fn put_inner(
        &self,
        body: Bytes,
        url: &str,
        mime_type: &str,
        progress: ProgressSink,
    ) -> Result<(), TransferError> {
        let total = body.len() as u64;
        let chunks = split(body, self.chunk_size);

        let reporter = progress.clone();
        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            reporter.report(sent, total);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        debug!(url, total, "starting transfer");
        let resp = self
            .http
            .put(url)
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransferError::Status {
                status: status.as_u16(),
                body,
            });
        }

        progress.complete(total);
        debug!(url, total, "transfer acknowledged");
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn put<'a>(
        &'a self,
        body: Bytes,
        url: &'a str,
        mime_type: &'a str,
        progress: ProgressSink,
    ) -> TransferFuture<'a> {
        Box::pin(self.put_inner(body, url, mime_type, progress))
    }
}

/// Splits a payload into zero-copy chunks of at most `size` bytes.
fn split(mut body: Bytes, size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(body.len().div_ceil(size));
    while !body.is_empty() {
        let n = size.min(body.len());
        chunks.push(body.split_to(n));
    }
    chunks
}
