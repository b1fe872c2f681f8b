//! Upload session: staging, signing and parallel transfer of media.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use realtyfeed_api::FeedApi;
use realtyfeed_protocol::messages::{MediaRecord, PresignMedia, PresignRequest};
use realtyfeed_protocol::{MediaItem, Post};
use realtyfeed_transfer::{
    LocalFile, TransferError, TransferProgress, Transport, fingerprint, preprocess,
    progress_channel,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ComposeError;
use crate::preview::PreviewRegistry;
use crate::types::{ComposeConfig, ComposeEvent, ItemFailure, StageReport, StagedMedia};

/// Media staged under one post or edit context.
///
/// Items are keyed by their stable local id; nothing downstream of the
/// credential response depends on array position.
pub struct UploadSession {
    api: Arc<dyn FeedApi>,
    transport: Arc<dyn Transport>,
    config: ComposeConfig,
    previews: Arc<PreviewRegistry>,
    items: Vec<StagedMedia>,
    /// Batch slug sent with every credential request after the first.
    slug: Option<String>,
    /// Existing media the user removed while editing.
    deleted: Vec<String>,
    events_tx: mpsc::Sender<ComposeEvent>,
    events_rx: Option<mpsc::Receiver<ComposeEvent>>,
    cancel: CancellationToken,
}

impl UploadSession {
    pub fn new(
        api: Arc<dyn FeedApi>,
        transport: Arc<dyn Transport>,
        config: ComposeConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        Self {
            api,
            transport,
            config,
            previews: Arc::new(PreviewRegistry::new()),
            items: Vec::new(),
            slug: None,
            deleted: Vec::new(),
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Session for editing `post`: its media is seeded as existing and its
    /// slug is carried on credential requests.
    pub fn for_post(
        api: Arc<dyn FeedApi>,
        transport: Arc<dyn Transport>,
        config: ComposeConfig,
        post: &Post,
    ) -> Self {
        let mut session = Self::new(api, transport, config);
        session.seed(post);
        session
    }

    /// Replaces all state with `post`'s current media.
    pub fn seed(&mut self, post: &Post) {
        self.clear();
        self.items = post.media.iter().map(StagedMedia::from_existing).collect();
        self.slug = Some(post.slug.clone()).filter(|s| !s.is_empty());
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ComposeEvent>> {
        self.events_rx.take()
    }

    /// Token that dismisses the session when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn previews(&self) -> Arc<PreviewRegistry> {
        self.previews.clone()
    }

    pub fn items(&self) -> &[StagedMedia] {
        &self.items
    }

    pub fn get(&self, local_id: &str) -> Option<&StagedMedia> {
        self.items.iter().find(|m| m.local_id == local_id)
    }

    fn get_mut(&mut self, local_id: &str) -> Option<&mut StagedMedia> {
        self.items.iter_mut().find(|m| m.local_id == local_id)
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// Remote ids of existing media marked for deletion.
    pub fn deleted_media_ids(&self) -> &[String] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` when any new item has not reached 100%.
    pub fn has_blocking_items(&self) -> bool {
        self.items.iter().any(StagedMedia::is_blocking)
    }

    pub fn has_new_media(&self) -> bool {
        self.items.iter().any(|m| !m.existing)
    }

    pub fn needs_confirmation(&self) -> bool {
        self.items.iter().any(StagedMedia::awaiting_confirmation)
    }

    /// Mean progress over new items, 100 when there are none.
    pub fn overall_progress(&self) -> u8 {
        let new: Vec<u32> = self
            .items
            .iter()
            .filter(|m| !m.existing)
            .map(|m| u32::from(m.progress_percent))
            .collect();
        if new.is_empty() {
            return 100;
        }
        (new.iter().sum::<u32>() / new.len() as u32) as u8
    }

    /// Media entries for a post built from this session: existing and
    /// confirmed items, in order.
    pub fn media_items(&self) -> Vec<MediaItem> {
        self.items
            .iter()
            .filter(|m| m.existing || m.confirmed)
            .filter_map(StagedMedia::to_media_item)
            .collect()
    }

    pub(crate) fn emit(&self, event: ComposeEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "compose event dropped");
        }
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Stages picked files, requests credentials for the new batch in one
    /// call, then transfers every signed item in parallel.
    ///
    /// Duplicates and invalid files are reported without affecting their
    /// siblings. If credential issuance fails for the whole batch, the
    /// batch is dropped so staging the same files again retries it.
    pub async fn stage(&mut self, files: Vec<LocalFile>) -> Result<StageReport, ComposeError> {
        if self.cancel.is_cancelled() {
            return Err(ComposeError::Dismissed);
        }

        let mut report = StageReport::default();
        let mut batch_seen = HashSet::new();

        for file in files {
            let local_id = fingerprint(&file.descriptor);
            if self.get(&local_id).is_some() || !batch_seen.insert(local_id.clone()) {
                debug!(local_id = %local_id, name = %file.descriptor.name, "file already staged");
                report.duplicates.push(local_id);
                continue;
            }

            let kind = match self.config.policy.validate(&file.descriptor) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(name = %file.descriptor.name, error = %e, "file rejected");
                    self.emit(ComposeEvent::Rejected {
                        file_name: file.descriptor.name.clone(),
                        reason: e.to_string(),
                    });
                    report.rejected.push(e);
                    continue;
                }
            };

            let processed = preprocess(
                kind,
                &file.descriptor.mime_type,
                file.bytes,
                &self.config.compression,
            )
            .await;
            let preview = self
                .previews
                .issue(processed.bytes.clone(), &processed.mime_type);

            let file_name = if processed.compressed {
                jpeg_name(&file.descriptor.name)
            } else {
                file.descriptor.name
            };
            debug!(
                local_id = %local_id,
                size = processed.bytes.len(),
                compressed = processed.compressed,
                "file staged"
            );
            self.emit(ComposeEvent::Staged {
                local_id: local_id.clone(),
                file_name: file_name.clone(),
                kind,
            });
            self.items.push(StagedMedia {
                local_id: local_id.clone(),
                kind,
                file_name,
                mime_type: processed.mime_type,
                source_bytes: processed.bytes,
                compressed: processed.compressed,
                preview: Some(preview),
                remote_id: None,
                upload_url: None,
                url: None,
                progress_percent: 0,
                confirmed: false,
                existing: false,
                failure: None,
            });
            report.staged.push(local_id);
        }

        if report.staged.is_empty() {
            return Ok(report);
        }

        match self.sign(&report.staged).await {
            Ok(()) => {}
            Err(ComposeError::Dismissed) => return Err(self.dismissed()),
            Err(e) => {
                error!(count = report.staged.len(), error = %e, "credential issuance failed");
                for local_id in &report.staged {
                    self.discard(local_id);
                }
                return Err(e);
            }
        }

        self.transfer(&report.staged).await?;
        Ok(report)
    }

    /// Requests credentials for `ids` in one call and pairs the records
    /// with the items by position.
    async fn sign(&mut self, ids: &[String]) -> Result<(), ComposeError> {
        let has_primary = self
            .items
            .iter()
            .any(|m| m.existing || m.remote_id.is_some());
        let medias: Vec<PresignMedia> = ids
            .iter()
            .filter_map(|id| self.get(id))
            .enumerate()
            .map(|(i, m)| {
                PresignMedia::attachment(
                    m.file_name.clone(),
                    m.kind,
                    m.mime_type.clone(),
                    m.source_bytes.len() as u64,
                    !has_primary && i == 0,
                )
            })
            .collect();
        let request = PresignRequest::for_post(medias, self.slug.clone());

        let response = until_dismissed(&self.cancel, self.api.presign(&request))
            .await
            .ok_or(ComposeError::Dismissed)?
            .map_err(ComposeError::CredentialIssuanceFailed)?;

        if self.slug.is_none() && !response.slug.is_empty() {
            self.slug = Some(response.slug.clone());
        }

        let mut records = response.media_records.into_iter();
        let mut missing = Vec::new();
        for local_id in ids {
            let record = records.next();
            let credential = record
                .as_ref()
                .and_then(MediaRecord::credential)
                .map(|(uuid, url)| (uuid.to_string(), url.to_string()));
            let Some(item) = self.get_mut(local_id) else {
                continue;
            };
            match credential {
                Some((uuid, url)) => {
                    item.remote_id = Some(uuid);
                    item.upload_url = Some(url);
                    item.failure = None;
                }
                None => {
                    warn!(local_id = %local_id, "no credential issued for item");
                    item.failure = Some(ItemFailure::CredentialMissing(
                        "no upload credential issued".into(),
                    ));
                    missing.push(local_id.clone());
                }
            }
        }
        for local_id in missing {
            self.emit(ComposeEvent::TransferFailed {
                local_id,
                error: "no upload credential issued".into(),
            });
        }
        info!(count = ids.len(), slug = ?self.slug, "credentials issued");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transfer
    // -----------------------------------------------------------------------

    /// Transfers the given items concurrently. Each item succeeds or fails
    /// on its own; progress is applied by local id as it arrives.
    async fn transfer(&mut self, ids: &[String]) -> Result<(), ComposeError> {
        let jobs: Vec<(String, Bytes, String, String)> = ids
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|m| m.ready_to_transfer())
            .filter_map(|m| {
                Some((
                    m.local_id.clone(),
                    m.source_bytes.clone(),
                    m.upload_url.clone()?,
                    m.mime_type.clone(),
                ))
            })
            .collect();
        if jobs.is_empty() {
            return Ok(());
        }

        let (merged_tx, mut merged_rx) = mpsc::unbounded_channel();
        let transfers: Vec<_> = jobs
            .into_iter()
            .map(|(local_id, body, url, mime_type)| {
                run_transfer(
                    self.transport.clone(),
                    merged_tx.clone(),
                    local_id,
                    body,
                    url,
                    mime_type,
                )
            })
            .collect();
        drop(merged_tx);

        let cancel = self.cancel.clone();
        let all = join_all(transfers);
        tokio::pin!(all);

        let results = loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(self.dismissed()),
                Some((local_id, progress)) = merged_rx.recv() => {
                    self.on_progress(&local_id, progress);
                }
                results = &mut all => break results,
            }
        };
        while let Ok((local_id, progress)) = merged_rx.try_recv() {
            self.on_progress(&local_id, progress);
        }

        for (local_id, result) in results {
            self.on_transfer_result(&local_id, result);
        }
        Ok(())
    }

    fn on_progress(&mut self, local_id: &str, progress: TransferProgress) {
        let percent = progress.percent();
        let Some(item) = self.get_mut(local_id) else {
            return;
        };
        if percent <= item.progress_percent {
            return;
        }
        item.progress_percent = percent;
        self.emit(ComposeEvent::Progress {
            local_id: local_id.to_string(),
            percent,
        });
    }

    fn on_transfer_result(&mut self, local_id: &str, result: Result<(), TransferError>) {
        let Some(item) = self.get_mut(local_id) else {
            return;
        };
        match result {
            Ok(()) => {
                item.progress_percent = 100;
                debug!(local_id, "transfer acknowledged");
                self.emit(ComposeEvent::Transferred {
                    local_id: local_id.to_string(),
                });
            }
            Err(e) => {
                let reason = e.to_string();
                item.failure = Some(ItemFailure::TransferFailed(reason.clone()));
                warn!(local_id, error = %reason, "transfer failed");
                self.emit(ComposeEvent::TransferFailed {
                    local_id: local_id.to_string(),
                    error: reason,
                });
            }
        }
    }

    /// Retries failed items only: items without a credential are signed
    /// again as one batch, items whose transfer failed are sent again from
    /// the start. Healthy siblings are untouched.
    pub async fn retry_failed(&mut self) -> Result<(), ComposeError> {
        if self.cancel.is_cancelled() {
            return Err(ComposeError::Dismissed);
        }

        let unsigned: Vec<String> = self
            .items
            .iter()
            .filter(|m| matches!(m.failure, Some(ItemFailure::CredentialMissing(_))))
            .map(|m| m.local_id.clone())
            .collect();
        let mut retry: Vec<String> = Vec::new();

        for item in &mut self.items {
            if matches!(item.failure, Some(ItemFailure::TransferFailed(_))) {
                item.failure = None;
                item.progress_percent = 0;
                retry.push(item.local_id.clone());
            }
        }

        if !unsigned.is_empty() {
            match self.sign(&unsigned).await {
                Ok(()) => retry.extend(unsigned),
                Err(ComposeError::Dismissed) => return Err(self.dismissed()),
                Err(e) => {
                    // The items already carry a credential failure.
                    self.transfer(&retry).await?;
                    return Err(e);
                }
            }
        }

        info!(count = retry.len(), "retrying failed items");
        self.transfer(&retry).await
    }

    // -----------------------------------------------------------------------
    // Removal and confirmation
    // -----------------------------------------------------------------------

    /// Removes an item and releases its preview.
    ///
    /// Removing existing media marks it for deletion on submit; it never
    /// touches the transfer layer.
    pub fn remove(&mut self, local_id: &str) -> Result<StagedMedia, ComposeError> {
        let index = self
            .items
            .iter()
            .position(|m| m.local_id == local_id)
            .ok_or_else(|| ComposeError::UnknownMedia(local_id.to_string()))?;
        let item = self.items.remove(index);

        if let Some(preview) = &item.preview {
            self.previews.revoke(preview);
        }
        if item.existing
            && let Some(remote_id) = &item.remote_id
        {
            self.deleted.push(remote_id.clone());
        }
        debug!(local_id, existing = item.existing, "item removed");
        Ok(item)
    }

    /// Drops a freshly staged item without marking anything for deletion.
    fn discard(&mut self, local_id: &str) {
        if let Some(index) = self.items.iter().position(|m| m.local_id == local_id) {
            let item = self.items.remove(index);
            if let Some(preview) = &item.preview {
                self.previews.revoke(preview);
            }
        }
    }

    /// Confirms every transferred item in one call and returns the
    /// confirmed remote ids.
    ///
    /// Failed items are left out. On failure nothing is discarded, so the
    /// call can be repeated without re-uploading.
    pub async fn confirm_all(&mut self) -> Result<Vec<String>, ComposeError> {
        if self.cancel.is_cancelled() {
            return Err(ComposeError::Dismissed);
        }
        if self
            .items
            .iter()
            .any(|m| m.is_blocking() && m.failure.is_none())
        {
            return Err(ComposeError::NotReady("transfers still in progress"));
        }

        let remote_ids: Vec<String> = self
            .items
            .iter()
            .filter(|m| m.awaiting_confirmation())
            .filter_map(|m| m.remote_id.clone())
            .collect();
        if remote_ids.is_empty() {
            return Ok(remote_ids);
        }

        let Some(result) =
            until_dismissed(&self.cancel, self.api.confirm_uploaded(&remote_ids)).await
        else {
            return Err(self.dismissed());
        };
        if let Err(e) = result {
            error!(count = remote_ids.len(), error = %e, "confirmation failed");
            return Err(ComposeError::ConfirmationFailed(e));
        }

        for item in &mut self.items {
            if item.awaiting_confirmation() {
                item.confirmed = true;
            }
        }
        info!(count = remote_ids.len(), "media confirmed");
        self.emit(ComposeEvent::Confirmed {
            remote_ids: remote_ids.clone(),
        });
        Ok(remote_ids)
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Drops every item and releases all previews.
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            if let Some(preview) = &item.preview {
                self.previews.revoke(preview);
            }
        }
        self.deleted.clear();
        self.slug = None;
    }

    /// Dismisses the session: in-flight work stops and all state is
    /// released.
    pub fn dismiss(&mut self) {
        self.cancel.cancel();
        self.clear();
    }

    fn dismissed(&mut self) -> ComposeError {
        info!("compose session dismissed");
        self.clear();
        ComposeError::Dismissed
    }
}

/// `name` with its extension replaced by `.jpg`.
fn jpeg_name(name: &str) -> String {
    Path::new(name).with_extension("jpg").to_string_lossy().into_owned()
}

/// Awaits `fut` unless `cancel` fires first.
async fn until_dismissed<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Runs one transfer, forwarding its progress tagged with `local_id`.
async fn run_transfer(
    transport: Arc<dyn Transport>,
    progress_tx: mpsc::UnboundedSender<(String, TransferProgress)>,
    local_id: String,
    body: Bytes,
    url: String,
    mime_type: String,
) -> (String, Result<(), TransferError>) {
    let (sink, mut rx) = progress_channel();
    let put = transport.put(body, &url, &mime_type, sink);
    tokio::pin!(put);

    let result = loop {
        tokio::select! {
            biased;
            Some(progress) = rx.recv() => {
                let _ = progress_tx.send((local_id.clone(), progress));
            }
            result = &mut put => break result,
        }
    };
    while let Ok(progress) = rx.try_recv() {
        let _ = progress_tx.send((local_id.clone(), progress));
    }
    (local_id, result)
}
