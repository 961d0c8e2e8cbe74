//! Cinedex CLI - command-line client for the Cinedex movie catalog

use clap::{CommandFactory, Parser};

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod session;
mod upload;

use cli::{Cli, CommandContext, Commands, GlobalOptions, MovieCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        if let Some(api) = err.api_error()
            && api.is_retryable()
        {
            eprintln!("  → This looks temporary; try again in a moment");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Version => {
            println!("cinedex version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "cinedex",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Login {
            email,
            password,
            remember_me,
        } => {
            let ctx = CommandContext::new(&opts)?;
            cli::auth::login(&ctx, email, password, remember_me).await
        }
        Commands::Logout => cli::auth::logout(&CommandContext::new(&opts)?).await,
        Commands::Status => cli::status::run(&CommandContext::new(&opts)?, opts.config_ref()),
        Commands::Profile => cli::auth::profile(&CommandContext::new(&opts)?).await,
        Commands::Upload { file } => cli::upload::run(&CommandContext::new(&opts)?, &file).await,
        Commands::Health => cli::health::run(&CommandContext::new(&opts)?).await,
        Commands::Movie(movie_cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match movie_cmd {
                MovieCommands::List { pagination } => cli::movie::list(&ctx, &pagination).await,
                MovieCommands::Get { id } => cli::movie::get(&ctx, &id).await,
                MovieCommands::Create {
                    title,
                    year,
                    poster,
                } => cli::movie::create(&ctx, title, year, &poster).await,
                MovieCommands::Update {
                    id,
                    title,
                    year,
                    poster,
                } => cli::movie::update(&ctx, &id, title, year, &poster).await,
                MovieCommands::Delete { id, yes } => cli::movie::delete(&ctx, &id, yes).await,
            }
        }
    }
}

/// `--debug` forces debug output; otherwise `RUST_LOG` applies, defaulting to warn.
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}
