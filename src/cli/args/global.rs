//! Global CLI options shared across all commands
//!
//! Handlers take this one struct instead of every global flag separately.

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// For most options, the precedence is: CLI flag > environment variable > config file > default.
/// This struct captures the CLI/env layer; config file defaults are resolved later in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.cinedex/config.yaml)
    pub config: Option<String>,

    /// Catalog API base URL override
    pub api_url: Option<String>,

    /// Bypass cache and fetch fresh data from API
    pub no_cache: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    ///
    /// This is the primary constructor, called once in main.rs after parsing.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            api_url: cli.api_url.clone(),
            no_cache: cli.no_cache,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get API URL override as `Option<&str>`.
    pub fn api_url_ref(&self) -> Option<&str> {
        self.api_url.as_deref()
    }
}
