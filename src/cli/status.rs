//! Status command implementation

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::cli::{CommandContext, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::output::json::format_json;

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry of a JWT access token, if the token is a JWT with an `exp` claim.
///
/// Display only: the client never acts on it, expiry is discovered via 401.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

#[derive(Serialize)]
struct StatusReport {
    config_file: String,
    api_url: String,
    signed_in: bool,
    user: Option<String>,
    access_token_expires_at: Option<DateTime<Utc>>,
    refresh_token: bool,
    upload_key_configured: bool,
    cache: CacheStats,
}

/// Run the status command to display session and configuration status
pub fn run(ctx: &CommandContext, config_path: Option<&str>) -> Result<()> {
    let store = ctx.store();
    let access = store.access_token();
    let report = StatusReport {
        config_file: Config::resolve_path(config_path)?.display().to_string(),
        api_url: ctx.config.api_base().to_string(),
        signed_in: access.is_some(),
        user: store.user().map(|u| u.email),
        access_token_expires_at: access.as_deref().and_then(token_expiry),
        refresh_token: store.refresh_token().is_some(),
        upload_key_configured: ctx.config.upload.api_key.is_some(),
        cache: ctx.client.cache().stats(),
    };

    if ctx.format == OutputFormat::Json {
        println!("{}", format_json(&report)?);
        return Ok(());
    }

    println!("{}\n", "Cinedex Status".bold());
    println!("Config file: {}", report.config_file.cyan());
    println!("API: {}", report.api_url.cyan());
    println!();

    match (&report.user, report.signed_in) {
        (Some(email), true) => println!("{} Signed in as {}", "✓".green(), email.bold()),
        (_, true) => println!("{} Access token stored (no user record)", "⚠".yellow()),
        _ => {
            println!("{} Not signed in", "✗".red());
            println!("  → Run 'cinedex login' to sign in");
        }
    }

    if let Some(expires) = report.access_token_expires_at {
        let remaining = expires.signed_duration_since(Utc::now());
        if remaining.num_seconds() <= 0 {
            println!(
                "{} Access token expired (will refresh on next command)",
                "⚠".yellow()
            );
        } else {
            println!(
                "{} Access token valid (expires in {}h {}m)",
                "✓".green(),
                remaining.num_hours(),
                remaining.num_minutes() % 60
            );
        }
    }

    if report.signed_in || report.refresh_token {
        if report.refresh_token {
            println!("{} Refresh token stored", "✓".green());
        } else {
            println!("{} No refresh token (session ends when the token expires)", "○".dimmed());
        }
    }

    if report.upload_key_configured {
        println!("{} Upload API key configured", "✓".green());
    } else {
        println!("{} Upload API key not configured", "○".dimmed());
        println!("  → Set upload.api_key or CINEDEX_UPLOAD_API_KEY to upload posters");
    }

    let cache = report.cache;
    if cache.total == 0 {
        println!("{} No cached responses", "○".dimmed());
    } else {
        println!(
            "{} {} cached responses ({} fresh, {} stale)",
            "✓".green(),
            cache.total,
            cache.fresh,
            cache.stale
        );
    }
    println!();

    Ok(())
}
