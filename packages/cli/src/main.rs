use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Memorial wall and birthday wishes from the terminal.
#[derive(Parser, Debug)]
#[command(name = "memorial", version, about)]
struct Cli {
    /// Where local data and `memorial.toml` live.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Ignore any configured API and use local storage only.
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// The memorial wall
    #[command(subcommand)]
    Wall(WallCommand),
    /// Birthday wishes for a family member
    #[command(subcommand)]
    Wishes(WishesCommand),
}

#[derive(Subcommand, Debug)]
enum WallCommand {
    /// Show the newest entries
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Leave a message, optionally with photos
    Post {
        #[arg(long, default_value = "")]
        author: String,
        /// Image to attach (repeatable, at most three are used)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        message: String,
    },
    /// Leave a flower on an entry
    Flower { id: String },
}

#[derive(Subcommand, Debug)]
enum WishesCommand {
    /// Show a member's wishes
    List { member: String },
    /// Add a wish for a member
    Add {
        member: String,
        #[arg(long, default_value = "")]
        author: String,
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("memorial_store=info,memorial_cli=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(commands::default_data_dir);
    let ctx = commands::Context::open(data_dir, cli.local)?;

    match cli.command {
        Command::Wall(WallCommand::List { limit }) => ctx.wall_list(limit).await,
        Command::Wall(WallCommand::Post {
            author,
            images,
            message,
        }) => ctx.wall_post(&author, &message, &images).await,
        Command::Wall(WallCommand::Flower { id }) => ctx.wall_flower(&id).await,
        Command::Wishes(WishesCommand::List { member }) => ctx.wishes_list(&member).await,
        Command::Wishes(WishesCommand::Add {
            member,
            author,
            text,
        }) => ctx.wishes_add(&member, &author, &text).await,
    }
}
