//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod auth;
pub mod context;
pub mod health;
pub mod movie;
pub mod status;
pub mod upload;

pub use args::{GlobalOptions, OutputFormat, PaginationArgs};
pub use context::CommandContext;

/// Cinedex CLI - command-line client for the Cinedex movie catalog
#[derive(Parser, Debug)]
#[command(name = "cinedex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "CINEDEX_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "CINEDEX_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the catalog API base URL
    #[arg(long, global = true, env = "CINEDEX_API_URL", hide_env = true)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "CINEDEX_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass cache, fetch fresh data from API
    #[arg(long, global = true, env = "CINEDEX_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to the catalog
    Login {
        /// Account email (prompted if omitted)
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Account password (prompted if omitted)
        #[arg(long, env = "CINEDEX_PASSWORD", hide_env = true)]
        password: Option<String>,

        /// Ask the server for a long-lived session
        #[arg(long)]
        remember_me: bool,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show session and configuration status
    Status,

    /// Show the signed-in user's profile
    Profile,

    /// Browse and manage movies
    #[command(subcommand)]
    Movie(MovieCommands),

    /// Upload a poster image and print its hosted URL
    Upload {
        /// Image file (jpg, png, gif or webp, at most 10 MiB)
        file: std::path::PathBuf,
    },

    /// Check that the catalog API is reachable
    Health,

    /// Display version information
    Version,

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   cinedex completion bash > /etc/bash_completion.d/cinedex
  zsh:    cinedex completion zsh > \"${fpath[1]}/_cinedex\"
  fish:   cinedex completion fish > ~/.config/fish/completions/cinedex.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Movie subcommands
#[derive(Subcommand, Debug)]
pub enum MovieCommands {
    /// List movies one page at a time
    List {
        #[command(flatten)]
        pagination: PaginationArgs,
    },

    /// Show one movie
    Get {
        /// Movie ID
        id: String,
    },

    /// Add a movie
    Create {
        /// Movie title
        #[arg(long, short = 't')]
        title: String,

        /// Publishing year
        #[arg(long, short = 'y')]
        year: i32,

        #[command(flatten)]
        poster: PosterArgs,
    },

    /// Change some fields of a movie
    Update {
        /// Movie ID
        id: String,

        /// New title
        #[arg(long, short = 't')]
        title: Option<String>,

        /// New publishing year
        #[arg(long, short = 'y')]
        year: Option<i32>,

        #[command(flatten)]
        poster: PosterArgs,
    },

    /// Delete a movie
    Delete {
        /// Movie ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Poster source: an already-hosted URL or a local file to upload first
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PosterArgs {
    /// Hosted poster URL
    #[arg(long, conflicts_with = "poster_file")]
    pub poster: Option<String>,

    /// Local image to upload as the poster
    #[arg(long)]
    pub poster_file: Option<std::path::PathBuf>,
}

impl PosterArgs {
    pub fn is_empty(&self) -> bool {
        self.poster.is_none() && self.poster_file.is_none()
    }
}
