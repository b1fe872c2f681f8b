use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use realtyfeed_protocol::{Comment, ModerationState, Post, PostPatch};
use tokio::sync::watch;
use tracing::debug;

/// Named, independently populated post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Global feed.
    Feed,
    /// The viewer's own posts.
    Own,
    /// Posts of the group currently shown.
    Group,
    /// Posts the viewer saved.
    Saved,
    /// Posts of the friend currently shown.
    Friend,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Feed,
        Collection::Own,
        Collection::Group,
        Collection::Saved,
        Collection::Friend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Own => "own",
            Self::Group => "group",
            Self::Saved => "saved",
            Self::Friend => "friend",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// One entity per post identity, shared by every collection.
    posts: HashMap<String, Post>,
    lists: HashMap<Collection, Vec<String>>,
    /// Group whose posts the Group collection holds.
    group_id: Option<String>,
}

impl Inner {
    fn list_mut(&mut self, collection: Collection) -> &mut Vec<String> {
        self.lists.entry(collection).or_default()
    }

    fn is_referenced(&self, post_id: &str) -> bool {
        self.lists
            .values()
            .any(|ids| ids.iter().any(|id| id == post_id))
    }

    /// Drops entities no collection references.
    fn prune(&mut self) {
        let referenced: HashSet<String> = self.lists.values().flatten().cloned().collect();
        let before = self.posts.len();
        self.posts.retain(|id, _| referenced.contains(id));
        let dropped = before - self.posts.len();
        if dropped > 0 {
            debug!(dropped, "pruned unreferenced posts");
        }
    }

    /// Stores fetched posts as canonical and returns their ids in order,
    /// without duplicates.
    fn ingest(&mut self, posts: Vec<Post>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(posts.len());
        for post in posts {
            if seen.insert(post.id.clone()) {
                ids.push(post.id.clone());
                self.posts.insert(post.id.clone(), post);
            }
        }
        ids
    }

    /// The single merge chokepoint.
    fn merge(&mut self, patch: &PostPatch) -> bool {
        match self.posts.get_mut(&patch.id) {
            Some(post) => {
                post.merge(patch);
                true
            }
            None => false,
        }
    }
}

/// Process-wide store of post collections.
///
/// Each post is held once and referenced by identity from every collection
/// that lists it, so all collections observe the same field values after
/// any update. Mutation goes through [`apply_update`](Self::apply_update),
/// [`prepend`](Self::prepend) and [`remove`](Self::remove) (plus the
/// population and comment helpers built on the same merge). Every change
/// bumps a revision published on a `watch` channel.
#[derive(Debug)]
pub struct PostStore {
    inner: RwLock<Inner>,
    revision: watch::Sender<u64>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Inner::default()),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Subscribes to change notifications. The value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    // -----------------------------------------------------------------------
    // Population
    // -----------------------------------------------------------------------

    /// Replaces a collection with freshly fetched posts.
    pub fn load(&self, collection: Collection, posts: Vec<Post>) {
        {
            let mut inner = self.write();
            let ids = inner.ingest(posts);
            debug!(collection = collection.as_str(), count = ids.len(), "collection loaded");
            *inner.list_mut(collection) = ids;
            inner.prune();
        }
        self.bump();
    }

    /// Appends a further page to a collection. Posts already listed keep
    /// their position but take the fetched values.
    pub fn append(&self, collection: Collection, posts: Vec<Post>) {
        {
            let mut inner = self.write();
            let ids = inner.ingest(posts);
            let list = inner.list_mut(collection);
            for id in ids {
                if !list.contains(&id) {
                    list.push(id);
                }
            }
        }
        self.bump();
    }

    /// Loads the Group collection and records which group it shows.
    pub fn load_group(&self, group_id: &str, posts: Vec<Post>) {
        self.write().group_id = Some(group_id.to_string());
        self.load(Collection::Group, posts);
    }

    /// Group the Group collection currently shows.
    pub fn group_id(&self) -> Option<String> {
        self.read().group_id.clone()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Merges a partial post into the stored entity.
    ///
    /// Present fields overwrite, absent fields are kept. Returns `false`
    /// when no collection holds the post.
    pub fn apply_update(&self, patch: &PostPatch) -> bool {
        let applied = self.write().merge(patch);
        if applied {
            debug!(post_id = %patch.id, "update applied");
            self.bump();
        }
        applied
    }

    /// Puts a post at the front of a collection.
    ///
    /// An already stored entity is merged with `post`; a post already in the
    /// collection moves to the front instead of appearing twice.
    pub fn prepend(&self, collection: Collection, post: Post) {
        {
            let mut inner = self.write();
            let id = post.id.clone();
            if !inner.merge(&PostPatch::from(post.clone())) {
                inner.posts.insert(id.clone(), post);
            }
            let list = inner.list_mut(collection);
            list.retain(|existing| existing != &id);
            list.insert(0, id);
            debug!(collection = collection.as_str(), "post prepended");
        }
        self.bump();
    }

    /// Removes a post from every collection.
    pub fn remove(&self, post_id: &str) -> bool {
        let removed = {
            let mut inner = self.write();
            let mut removed = false;
            for ids in inner.lists.values_mut() {
                let before = ids.len();
                ids.retain(|id| id != post_id);
                removed |= ids.len() != before;
            }
            inner.posts.remove(post_id);
            removed
        };
        if removed {
            debug!(post_id, "post removed from all collections");
            self.bump();
        }
        removed
    }

    /// Removes a post from one collection only.
    pub fn remove_from(&self, collection: Collection, post_id: &str) -> bool {
        let removed = {
            let mut inner = self.write();
            let list = inner.list_mut(collection);
            let before = list.len();
            list.retain(|id| id != post_id);
            let removed = list.len() != before;
            if removed && !inner.is_referenced(post_id) {
                inner.posts.remove(post_id);
            }
            removed
        };
        if removed {
            self.bump();
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    /// Appends a new comment to its post.
    ///
    /// `commentCount` grows only when the comment arrives approved.
    pub fn add_comment(&self, comment: Comment) -> bool {
        let applied = {
            let mut inner = self.write();
            let Some(post) = inner.posts.get(&comment.post_id) else {
                return false;
            };
            if post.comments.iter().any(|c| c.id == comment.id) {
                return false;
            }

            let mut patch = PostPatch::new(&comment.post_id);
            if comment.is_approved() {
                patch.comment_count = Some(post.comment_count.saturating_add(1));
            }
            let mut comments = post.comments.clone();
            comments.push(comment);
            patch.comments = Some(comments);
            inner.merge(&patch)
        };
        if applied {
            self.bump();
        }
        applied
    }

    /// Replaces a stored comment with a newer version of it.
    ///
    /// `commentCount` follows transitions into and out of `approved`.
    pub fn update_comment(&self, comment: Comment) -> bool {
        let applied = {
            let mut inner = self.write();
            let Some(post) = inner.posts.get(&comment.post_id) else {
                return false;
            };
            let Some(index) = post.comments.iter().position(|c| c.id == comment.id) else {
                return false;
            };

            let was_approved = post.comments[index].is_approved();
            let mut patch = PostPatch::new(&comment.post_id);
            patch.comment_count = match (was_approved, comment.is_approved()) {
                (false, true) => Some(post.comment_count.saturating_add(1)),
                (true, false) => Some(post.comment_count.saturating_sub(1)),
                _ => None,
            };
            let mut comments = post.comments.clone();
            comments[index] = comment;
            patch.comments = Some(comments);
            inner.merge(&patch)
        };
        if applied {
            self.bump();
        }
        applied
    }

    /// Moves a stored comment to a new moderation state.
    pub fn set_comment_state(&self, post_id: &str, comment_id: &str, state: ModerationState) -> bool {
        let Some(mut comment) = self
            .get(post_id)
            .and_then(|p| p.comments.into_iter().find(|c| c.id == comment_id))
        else {
            return false;
        };
        comment.moderation_state = state;
        self.update_comment(comment)
    }

    /// Removes a comment from its post.
    pub fn remove_comment(&self, post_id: &str, comment_id: &str) -> bool {
        let applied = {
            let mut inner = self.write();
            let Some(post) = inner.posts.get(post_id) else {
                return false;
            };
            let Some(index) = post.comments.iter().position(|c| c.id == comment_id) else {
                return false;
            };

            let mut patch = PostPatch::new(post_id);
            if post.comments[index].is_approved() {
                patch.comment_count = Some(post.comment_count.saturating_sub(1));
            }
            let mut comments = post.comments.clone();
            comments.remove(index);
            patch.comments = Some(comments);
            inner.merge(&patch)
        };
        if applied {
            self.bump();
        }
        applied
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, post_id: &str) -> Option<Post> {
        self.read().posts.get(post_id).cloned()
    }

    /// Snapshot of a collection in order.
    pub fn collection(&self, collection: Collection) -> Vec<Post> {
        let inner = self.read();
        inner
            .lists
            .get(&collection)
            .map(|ids| ids.iter().filter_map(|id| inner.posts.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, collection: Collection, post_id: &str) -> bool {
        self.read()
            .lists
            .get(&collection)
            .is_some_and(|ids| ids.iter().any(|id| id == post_id))
    }

    /// Collections currently listing a post.
    pub fn collections_of(&self, post_id: &str) -> Vec<Collection> {
        Collection::ALL
            .into_iter()
            .filter(|c| self.contains(*c, post_id))
            .collect()
    }
}
