//! Subcommand handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use realtyfeed_api::{Client, FeedApi};
use realtyfeed_composer::{ComposeEvent, PostComposer, Services};
use realtyfeed_feed_sync::{Collection, Interactions, PostActions, PostStore, ToggleOutcome};
use realtyfeed_protocol::messages::ModerationAction;
use realtyfeed_protocol::{CommentPermission, GroupRef, InteractionKind, Visibility};
use realtyfeed_transfer::{HttpTransport, TransferConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::CliConfig;
use crate::media;

/// Shared state for one invocation.
pub struct Context {
    config: CliConfig,
    api: Arc<dyn FeedApi>,
    store: Arc<PostStore>,
}

impl Context {
    pub fn new(config: CliConfig) -> anyhow::Result<Self> {
        if config.token.is_empty() {
            anyhow::bail!(
                "no API token: set `token` in {} or REALTYFEED_TOKEN",
                config.path().display()
            );
        }
        let client = Client::new(&config.api_url, &config.token)?;
        Ok(Self {
            config,
            api: Arc::new(client),
            store: Arc::new(PostStore::new()),
        })
    }

    fn services(&self) -> anyhow::Result<Services> {
        Ok(Services {
            api: self.api.clone(),
            transport: Arc::new(HttpTransport::new(&TransferConfig::default())?),
            store: self.store.clone(),
        })
    }

    /// Fetches a post and seeds the feed collection with it.
    async fn seed(&self, post_id: &str) -> anyhow::Result<()> {
        let post = self
            .api
            .get_post(post_id)
            .await
            .with_context(|| format!("failed to fetch post {post_id}"))?;
        self.store.load(Collection::Feed, vec![post]);
        Ok(())
    }
}

pub struct PostArgs {
    pub text: String,
    pub media: Vec<PathBuf>,
    pub visibility: Visibility,
    pub comment_permission: CommentPermission,
    pub group: Option<GroupRef>,
}

pub struct EditArgs {
    pub post_id: String,
    pub text: Option<String>,
    pub add: Vec<PathBuf>,
    pub remove: Vec<String>,
    pub visibility: Option<Visibility>,
    pub comment_permission: Option<CommentPermission>,
}

pub async fn post(ctx: &Context, args: PostArgs) -> anyhow::Result<()> {
    let files = media::read_all(&args.media)?;
    let mut composer = PostComposer::create(
        ctx.services()?,
        ctx.config.compose_config(),
        ctx.config.author()?,
        args.group,
    );
    let printer = spawn_printer(composer.take_events());
    cancel_on_ctrl_c(&composer);

    composer.set_text(args.text);
    composer.set_visibility(args.visibility);
    composer.set_comment_permission(args.comment_permission);

    let result = stage_and_submit(&mut composer, files).await;
    drop(composer);
    let _ = printer.await;

    let post = result?;
    println!("published {} ({} media)", post.id, post.media.len());
    Ok(())
}

pub async fn edit(ctx: &Context, args: EditArgs) -> anyhow::Result<()> {
    ctx.seed(&args.post_id).await?;
    let post = ctx
        .store
        .get(&args.post_id)
        .context("fetched post missing from the store")?;
    let files = media::read_all(&args.add)?;

    let mut composer = PostComposer::edit(ctx.services()?, ctx.config.compose_config(), post);
    let printer = spawn_printer(composer.take_events());
    cancel_on_ctrl_c(&composer);

    if let Some(text) = args.text {
        composer.set_text(text);
    }
    if let Some(visibility) = args.visibility {
        composer.set_visibility(visibility);
    }
    if let Some(permission) = args.comment_permission {
        composer.set_comment_permission(permission);
    }
    for media_id in &args.remove {
        composer.session_mut().remove(media_id)?;
    }

    let result = stage_and_submit(&mut composer, files).await;
    drop(composer);
    let _ = printer.await;

    let post = result?;
    println!("updated {} ({} media)", post.id, post.media.len());
    Ok(())
}

/// Stages `files`, retries failed items once, then submits.
async fn stage_and_submit(
    composer: &mut PostComposer,
    files: Vec<realtyfeed_transfer::LocalFile>,
) -> anyhow::Result<realtyfeed_protocol::Post> {
    if !files.is_empty() {
        composer.stage(files).await?;
        if composer
            .session()
            .items()
            .iter()
            .any(|m| m.failure.is_some())
        {
            tracing::warn!("some media failed, retrying once");
            composer.session_mut().retry_failed().await?;
        }
    }
    Ok(composer.submit().await?)
}

pub async fn toggle(ctx: &Context, post_id: &str, kind: InteractionKind) -> anyhow::Result<()> {
    ctx.seed(post_id).await?;
    let interactions = Interactions::new(ctx.store.clone(), ctx.api.clone(), ctx.config.toggle_policy());

    match interactions.toggle(post_id, kind).await? {
        ToggleOutcome::Applied { on, count } => {
            let verb = match (kind, on) {
                (InteractionKind::Like, true) => "liked",
                (InteractionKind::Like, false) => "unliked",
                (InteractionKind::Save, true) => "saved",
                (InteractionKind::Save, false) => "unsaved",
            };
            println!("{verb} {post_id} (count {count})");
        }
        ToggleOutcome::AlreadyPending => println!("toggle already in progress"),
    }
    Ok(())
}

pub async fn comment(ctx: &Context, post_id: &str, text: &str) -> anyhow::Result<()> {
    ctx.seed(post_id).await?;
    let actions = PostActions::new(ctx.store.clone(), ctx.api.clone());
    let comment = actions.comment(post_id, text).await?;
    let count = ctx.store.get(post_id).map(|p| p.comment_count).unwrap_or_default();
    println!(
        "comment {} is {:?}; post has {count} comments",
        comment.id, comment.moderation_state
    );
    Ok(())
}

pub async fn moderate(
    ctx: &Context,
    post_id: &str,
    comment_id: &str,
    action: ModerationAction,
) -> anyhow::Result<()> {
    ctx.seed(post_id).await?;
    let actions = PostActions::new(ctx.store.clone(), ctx.api.clone());
    actions.moderate(post_id, comment_id, action).await?;
    println!("{} {comment_id}", action.as_str());
    Ok(())
}

pub async fn delete(ctx: &Context, post_id: &str) -> anyhow::Result<()> {
    let actions = PostActions::new(ctx.store.clone(), ctx.api.clone());
    actions.delete_post(post_id).await?;
    println!("deleted {post_id}");
    Ok(())
}

pub async fn hide(ctx: &Context, post_id: &str) -> anyhow::Result<()> {
    let actions = PostActions::new(ctx.store.clone(), ctx.api.clone());
    actions.hide_post(post_id).await?;
    println!("hidden {post_id}");
    Ok(())
}

fn cancel_on_ctrl_c(composer: &PostComposer) {
    let token = composer.cancel_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    eprintln!("cancelled");
                    token.cancel();
                }
            }
        }
    });
}

/// Prints compose events until the composer is dropped.
fn spawn_printer(events: Option<mpsc::Receiver<ComposeEvent>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut events) = events else {
            return;
        };
        let mut names: HashMap<String, String> = HashMap::new();
        while let Some(event) = events.recv().await {
            match event {
                ComposeEvent::Staged {
                    local_id,
                    file_name,
                    kind,
                } => {
                    println!("  + {file_name} ({})", kind.as_str());
                    names.insert(local_id, file_name);
                }
                ComposeEvent::Rejected { file_name, reason } => {
                    eprintln!("  ! {file_name}: {reason}");
                }
                ComposeEvent::Progress { local_id, percent } => {
                    let name = names.get(&local_id).map_or(local_id.as_str(), String::as_str);
                    println!("    {name} {percent:>3}%");
                }
                ComposeEvent::TransferFailed { local_id, error } => {
                    let name = names.get(&local_id).map_or(local_id.as_str(), String::as_str);
                    eprintln!("  ! {name}: {error}");
                }
                ComposeEvent::Confirmed { remote_ids } => {
                    println!("  confirmed {} media", remote_ids.len());
                }
                ComposeEvent::Notice { message, is_error } => {
                    if is_error {
                        eprintln!("{message}");
                    } else {
                        println!("{message}");
                    }
                }
                ComposeEvent::Transferred { .. } | ComposeEvent::Submitted { .. } => {}
            }
        }
    })
}
