//! Pagination argument types for CLI commands

use clap::Args;

use crate::client::PaginationParams;

/// Shared pagination arguments for list commands.
///
/// Flatten this into any command that supports pagination:
/// ```ignore
/// List {
///     #[command(flatten)]
///     pagination: PaginationArgs,
/// }
/// ```
#[derive(Args, Debug, Default, Clone)]
pub struct PaginationArgs {
    /// Items per page (defaults to preferences.page_size)
    #[arg(long, short = 'n')]
    pub limit: Option<u32>,

    /// Page number (1-based)
    #[arg(long, short = 'p')]
    pub page: Option<u32>,
}

impl PaginationArgs {
    /// Convert CLI args to API pagination params, using `default_limit`
    /// when no limit was given.
    pub fn to_params(&self, default_limit: u32) -> PaginationParams {
        let mut params = PaginationParams::new().limit(self.limit.unwrap_or(default_limit));
        if let Some(page) = self.page {
            params = params.page(page);
        }
        params
    }
}
