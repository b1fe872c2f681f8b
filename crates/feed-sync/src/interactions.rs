use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use realtyfeed_api::FeedApi;
use realtyfeed_protocol::{InteractionKind, PostPatch};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::store::{Collection, PostStore};

/// What to do with an optimistic toggle the server rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToggleFailurePolicy {
    /// Undo the optimistic flag and counter.
    #[default]
    Rollback,
    /// Leave the optimistic values until the next fetch reconciles them.
    KeepOptimistic,
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server accepted the new state.
    Applied { on: bool, count: u32 },
    /// A toggle for the same post and kind is still in flight; nothing was
    /// done.
    AlreadyPending,
}

type PendingKey = (String, InteractionKind);

/// Like and save toggles with optimistic updates.
///
/// Each (post, kind) pair moves `off -> pending -> on` or
/// `on -> pending -> off`; while pending, further toggles are ignored.
pub struct Interactions {
    store: Arc<PostStore>,
    api: Arc<dyn FeedApi>,
    policy: ToggleFailurePolicy,
    pending: Mutex<HashSet<PendingKey>>,
}

/// Clears the pending mark when the toggle finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<PendingKey>>,
    key: PendingKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl Interactions {
    pub fn new(store: Arc<PostStore>, api: Arc<dyn FeedApi>, policy: ToggleFailurePolicy) -> Self {
        Self {
            store,
            api,
            policy,
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> ToggleFailurePolicy {
        self.policy
    }

    pub fn is_pending(&self, post_id: &str, kind: InteractionKind) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(post_id.to_string(), kind))
    }

    pub async fn toggle_like(&self, post_id: &str) -> Result<ToggleOutcome, SyncError> {
        self.toggle(post_id, InteractionKind::Like).await
    }

    pub async fn toggle_save(&self, post_id: &str) -> Result<ToggleOutcome, SyncError> {
        self.toggle(post_id, InteractionKind::Save).await
    }

    /// Flips an interaction.
    ///
    /// The optimistic flag and counter reach every collection before the
    /// request is sent. Fields the server echoes back are applied on top.
    /// A rejection is handled per [`ToggleFailurePolicy`] and reported as
    /// [`SyncError::ToggleFailed`] either way.
    pub async fn toggle(
        &self,
        post_id: &str,
        kind: InteractionKind,
    ) -> Result<ToggleOutcome, SyncError> {
        let post = self
            .store
            .get(post_id)
            .ok_or_else(|| SyncError::UnknownPost(post_id.to_string()))?;

        let key = (post_id.to_string(), kind);
        if !self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
        {
            debug!(post_id, ?kind, "toggle already pending, ignored");
            return Ok(ToggleOutcome::AlreadyPending);
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        let (on, count) = post.interaction(kind);
        let next_on = !on;
        let next_count = if next_on {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };

        self.store
            .apply_update(&PostPatch::interaction(post_id, kind, next_on, next_count));
        if kind == InteractionKind::Save {
            self.sync_saved(post_id);
        }
        debug!(post_id, ?kind, on = next_on, count = next_count, "optimistic toggle applied");

        match self.api.set_interaction(post_id, kind, next_on).await {
            Ok(echoed) => {
                if let Some(patch) = echoed.filter(|p| p.id == post_id) {
                    self.store.apply_update(&patch);
                    if kind == InteractionKind::Save {
                        self.sync_saved(post_id);
                    }
                }
                let (on, count) = self
                    .store
                    .get(post_id)
                    .map(|p| p.interaction(kind))
                    .unwrap_or((next_on, next_count));
                Ok(ToggleOutcome::Applied { on, count })
            }
            Err(e) => {
                match self.policy {
                    ToggleFailurePolicy::Rollback => self.roll_back(post_id, kind, next_on),
                    ToggleFailurePolicy::KeepOptimistic => {
                        warn!(post_id, ?kind, error = %e, "toggle rejected, keeping optimistic state");
                    }
                }
                Err(SyncError::ToggleFailed {
                    post_id: post_id.to_string(),
                    kind,
                    source: e,
                })
            }
        }
    }

    /// Undoes an optimistic toggle relative to the current state.
    ///
    /// Skipped when the flag no longer shows the optimistic value, since a
    /// fetch has already replaced it.
    fn roll_back(&self, post_id: &str, kind: InteractionKind, optimistic_on: bool) {
        let Some(current) = self.store.get(post_id) else {
            return;
        };
        let (on, count) = current.interaction(kind);
        if on != optimistic_on {
            debug!(post_id, ?kind, "toggle already reconciled, no rollback");
            return;
        }

        let restored = if optimistic_on {
            count.saturating_sub(1)
        } else {
            count.saturating_add(1)
        };
        self.store
            .apply_update(&PostPatch::interaction(post_id, kind, !optimistic_on, restored));
        if kind == InteractionKind::Save {
            self.sync_saved(post_id);
        }
        warn!(post_id, ?kind, "toggle rejected, rolled back");
    }

    /// Keeps Saved membership in line with the viewer's saved flag.
    fn sync_saved(&self, post_id: &str) {
        let Some(post) = self.store.get(post_id) else {
            return;
        };
        let listed = self.store.contains(Collection::Saved, post_id);
        if post.saved_by_viewer && !listed {
            self.store.prepend(Collection::Saved, post);
        } else if !post.saved_by_viewer && listed {
            self.store.remove_from(Collection::Saved, post_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, server_error};
    use realtyfeed_protocol::{Author, MediaItem, Post};

    fn post(id: &str, likes: u32) -> Post {
        let mut patch = PostPatch::new(id);
        patch.author = Some(Author {
            id: "u1".into(),
            name: "Dana".into(),
            avatar_url: None,
        });
        patch.media = Some(vec![MediaItem {
            id: "m1".into(),
            url: "https://cdn/m1.jpg".into(),
            mime_type: "image/jpeg".into(),
        }]);
        patch.like_count = Some(likes);
        patch.save_count = Some(2);
        patch.into_post().unwrap()
    }

    fn setup(api: MockApi, policy: ToggleFailurePolicy) -> (Arc<PostStore>, Arc<MockApi>, Interactions) {
        let store = Arc::new(PostStore::new());
        let api = Arc::new(api);
        let interactions = Interactions::new(store.clone(), api.clone(), policy);
        (store, api, interactions)
    }

    #[tokio::test]
    async fn like_reaches_feed_and_saved_together() {
        let (store, api, interactions) = setup(MockApi::default(), ToggleFailurePolicy::default());
        store.load(Collection::Feed, vec![post("p1", 7)]);
        store.load(Collection::Saved, vec![post("p1", 7)]);

        let outcome = interactions.toggle_like("p1").await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Applied { on: true, count: 8 });

        for collection in [Collection::Feed, Collection::Saved] {
            let posts = store.collection(collection);
            let p = &posts[0];
            assert_eq!(p.like_count, 8);
            assert!(p.liked_by_viewer);
            assert_eq!(p.media.len(), 1);
        }
        assert_eq!(api.calls(), vec!["Like p1 true"]);
    }

    #[tokio::test]
    async fn unlike_sends_delete_and_decrements() {
        let (store, api, interactions) = setup(MockApi::default(), ToggleFailurePolicy::default());
        let mut liked = post("p1", 3);
        liked.liked_by_viewer = true;
        store.load(Collection::Feed, vec![liked]);

        interactions.toggle_like("p1").await.unwrap();

        let p = store.get("p1").unwrap();
        assert_eq!(p.like_count, 2);
        assert!(!p.liked_by_viewer);
        assert_eq!(api.calls(), vec!["Like p1 false"]);
    }

    #[tokio::test]
    async fn server_echo_supersedes_optimistic_count() {
        let api = MockApi::default();
        api.interactions
            .lock()
            .unwrap()
            .push_back(Ok(Some(PostPatch::interaction("p1", InteractionKind::Like, true, 12))));
        let (store, _api, interactions) = setup(api, ToggleFailurePolicy::default());
        store.load(Collection::Feed, vec![post("p1", 7)]);

        let outcome = interactions.toggle_like("p1").await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Applied { on: true, count: 12 });
        assert_eq!(store.get("p1").unwrap().like_count, 12);
    }

    #[tokio::test]
    async fn rejected_toggle_rolls_back_by_default() {
        let api = MockApi::default();
        api.interactions.lock().unwrap().push_back(Err(server_error()));
        let (store, _api, interactions) = setup(api, ToggleFailurePolicy::Rollback);
        store.load(Collection::Feed, vec![post("p1", 7)]);

        let err = interactions.toggle_like("p1").await.unwrap_err();
        assert!(matches!(err, SyncError::ToggleFailed { kind: InteractionKind::Like, .. }));

        let p = store.get("p1").unwrap();
        assert_eq!(p.like_count, 7);
        assert!(!p.liked_by_viewer);
        assert!(!interactions.is_pending("p1", InteractionKind::Like));
    }

    #[tokio::test]
    async fn keep_optimistic_policy_leaves_values() {
        let api = MockApi::default();
        api.interactions.lock().unwrap().push_back(Err(server_error()));
        let (store, _api, interactions) = setup(api, ToggleFailurePolicy::KeepOptimistic);
        store.load(Collection::Feed, vec![post("p1", 7)]);

        assert!(interactions.toggle_like("p1").await.is_err());

        let p = store.get("p1").unwrap();
        assert_eq!(p.like_count, 8);
        assert!(p.liked_by_viewer);
    }

    #[tokio::test]
    async fn save_adds_to_saved_and_unsave_removes_only_there() {
        let (store, _api, interactions) = setup(MockApi::default(), ToggleFailurePolicy::default());
        store.load(Collection::Feed, vec![post("p1", 0)]);

        interactions.toggle_save("p1").await.unwrap();
        assert!(store.contains(Collection::Saved, "p1"));
        assert_eq!(store.get("p1").unwrap().save_count, 3);

        interactions.toggle_save("p1").await.unwrap();
        assert!(!store.contains(Collection::Saved, "p1"));
        assert!(store.contains(Collection::Feed, "p1"));
        assert_eq!(store.get("p1").unwrap().save_count, 2);
    }

    #[tokio::test]
    async fn rejected_save_is_removed_from_saved_again() {
        let api = MockApi::default();
        api.interactions.lock().unwrap().push_back(Err(server_error()));
        let (store, _api, interactions) = setup(api, ToggleFailurePolicy::Rollback);
        store.load(Collection::Feed, vec![post("p1", 0)]);

        assert!(interactions.toggle_save("p1").await.is_err());
        assert!(!store.contains(Collection::Saved, "p1"));
        assert!(!store.get("p1").unwrap().saved_by_viewer);
    }

    #[tokio::test]
    async fn toggle_while_pending_is_ignored() {
        let api = MockApi {
            hold_interactions: true,
            ..Default::default()
        };
        let (store, api, interactions) = setup(api, ToggleFailurePolicy::default());
        store.load(Collection::Feed, vec![post("p1", 7)]);
        let interactions = Arc::new(interactions);

        let first = tokio::spawn({
            let interactions = interactions.clone();
            async move { interactions.toggle_like("p1").await }
        });
        while !interactions.is_pending("p1", InteractionKind::Like) {
            tokio::task::yield_now().await;
        }

        // Optimistic value is visible before the server answers.
        assert_eq!(store.get("p1").unwrap().like_count, 8);
        assert_eq!(
            interactions.toggle_like("p1").await.unwrap(),
            ToggleOutcome::AlreadyPending
        );

        api.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(store.get("p1").unwrap().like_count, 8);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn unknown_post_is_an_error() {
        let (_store, api, interactions) = setup(MockApi::default(), ToggleFailurePolicy::default());
        let err = interactions.toggle_like("ghost").await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownPost(_)));
        assert!(api.calls().is_empty());
    }
}
