mod commands;
mod config;
mod media;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use realtyfeed_protocol::messages::ModerationAction;
use realtyfeed_protocol::{CommentPermission, GroupRef, InteractionKind, Visibility};
use tracing_subscriber::EnvFilter;

use commands::{Context, EditArgs, PostArgs};
use config::CliConfig;

#[derive(Parser)]
#[command(author, version, about = "RealtyFeed client: publish posts with media and interact with the feed")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a new post
    Post {
        /// Post body
        text: String,
        /// Image or video files to attach
        #[arg(short, long = "media")]
        media: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = VisibilityArg::Public)]
        visibility: VisibilityArg,
        #[arg(long, value_enum, default_value_t = CommentsArg::Everyone)]
        comments: CommentsArg,
        /// Publish inside this group
        #[arg(long)]
        group: Option<String>,
    },
    /// Edit an existing post
    Edit {
        post_id: String,
        #[arg(long)]
        text: Option<String>,
        /// Files to attach
        #[arg(long)]
        add: Vec<PathBuf>,
        /// Media ids to remove
        #[arg(long)]
        remove: Vec<String>,
        #[arg(long, value_enum)]
        visibility: Option<VisibilityArg>,
        #[arg(long, value_enum)]
        comments: Option<CommentsArg>,
    },
    /// Toggle the like on a post
    Like { post_id: String },
    /// Toggle the bookmark on a post
    Save { post_id: String },
    /// Comment on a post
    Comment { post_id: String, text: String },
    /// Approve a pending comment
    Approve { post_id: String, comment_id: String },
    /// Reject a pending comment
    Reject { post_id: String, comment_id: String },
    /// Delete a post
    Delete { post_id: String },
    /// Hide a post from your feed
    Hide { post_id: String },
    /// Print the configuration file path
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum VisibilityArg {
    Public,
    Connections,
    OnlyMe,
}

impl From<VisibilityArg> for Visibility {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Public => Visibility::Public,
            VisibilityArg::Connections => Visibility::Connections,
            VisibilityArg::OnlyMe => Visibility::OnlyMe,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CommentsArg {
    Everyone,
    Connections,
    Moderated,
    Nobody,
}

impl From<CommentsArg> for CommentPermission {
    fn from(arg: CommentsArg) -> Self {
        match arg {
            CommentsArg::Everyone => CommentPermission::Everyone,
            CommentsArg::Connections => CommentPermission::Connections,
            CommentsArg::Moderated => CommentPermission::Moderated,
            CommentsArg::Nobody => CommentPermission::Nobody,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "realtyfeed starting");

    let config = CliConfig::load()?;
    if let Command::Config = args.command {
        println!("{}", config.path().display());
        return Ok(());
    }
    let ctx = Context::new(config)?;

    match args.command {
        Command::Post {
            text,
            media,
            visibility,
            comments,
            group,
        } => {
            let args = PostArgs {
                text,
                media,
                visibility: visibility.into(),
                comment_permission: comments.into(),
                group: group.map(|id| GroupRef {
                    id,
                    name: String::new(),
                }),
            };
            commands::post(&ctx, args).await
        }
        Command::Edit {
            post_id,
            text,
            add,
            remove,
            visibility,
            comments,
        } => {
            let args = EditArgs {
                post_id,
                text,
                add,
                remove,
                visibility: visibility.map(Into::into),
                comment_permission: comments.map(Into::into),
            };
            commands::edit(&ctx, args).await
        }
        Command::Like { post_id } => commands::toggle(&ctx, &post_id, InteractionKind::Like).await,
        Command::Save { post_id } => commands::toggle(&ctx, &post_id, InteractionKind::Save).await,
        Command::Comment { post_id, text } => commands::comment(&ctx, &post_id, &text).await,
        Command::Approve {
            post_id,
            comment_id,
        } => commands::moderate(&ctx, &post_id, &comment_id, ModerationAction::Approve).await,
        Command::Reject {
            post_id,
            comment_id,
        } => commands::moderate(&ctx, &post_id, &comment_id, ModerationAction::Reject).await,
        Command::Delete { post_id } => commands::delete(&ctx, &post_id).await,
        Command::Hide { post_id } => commands::hide(&ctx, &post_id).await,
        Command::Config => Ok(()),
    }
}
