//! Health command implementation

use colored::Colorize;
use log::debug;
use serde::Serialize;

use crate::cli::{CommandContext, OutputFormat};
use crate::client::MovieApi;
use crate::client::models::{ApiInfo, HealthStatus};
use crate::error::Result;
use crate::output::json::format_json;

#[derive(Serialize)]
struct HealthReport {
    health: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<ApiInfo>,
}

/// Check the backend: `GET /` must answer; `GET /info` is best effort.
pub async fn run(ctx: &CommandContext) -> Result<()> {
    let health = ctx.client.health_check().await?;
    let info = match ctx.client.api_info().await {
        Ok(info) => Some(info),
        Err(e) => {
            debug!("API info unavailable: {}", e);
            None
        }
    };
    let report = HealthReport { health, info };

    if ctx.format == OutputFormat::Json {
        println!("{}", format_json(&report)?);
        return Ok(());
    }

    let status = &report.health.status;
    if status.eq_ignore_ascii_case("ok") || status.eq_ignore_ascii_case("healthy") {
        println!("{} {} is {}", "✓".green(), ctx.config.api_base(), status.green());
    } else {
        println!("{} {} reports {}", "⚠".yellow(), ctx.config.api_base(), status.yellow());
    }
    if let Some(ref env) = report.health.environment {
        println!("  Environment: {}", env);
    }
    if let Some(uptime) = report.health.uptime {
        println!("  Uptime: {}s", uptime.round());
    }
    if let Some(ref info) = report.info {
        println!("  {} {}", info.name.bold(), info.version.dimmed());
        for (name, path) in &info.endpoints {
            println!("    {:<10} {}", name, path.dimmed());
        }
    }
    Ok(())
}
