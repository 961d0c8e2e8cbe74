//! Upload command and the poster-file helper shared with `movie create/update`

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::json::format_json;
use crate::upload::{ImageFile, upload_poster};

#[derive(Serialize)]
struct Uploaded<'a> {
    file: &'a str,
    url: &'a str,
}

/// Validate and upload a local image behind a spinner; returns the hosted URL.
pub async fn upload_file(ctx: &CommandContext, path: &Path) -> Result<(ImageFile, String)> {
    ctx.require_session()?;
    let image = ImageFile::from_path(path)?;
    let uploader = ctx.uploader()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Uploading {}...", image.file_name()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = upload_poster(ctx.client.as_ref(), &uploader, &image).await;
    spinner.finish_and_clear();

    let url = result?;
    Ok((image, url))
}

/// Run the upload command
pub async fn run(ctx: &CommandContext, path: &Path) -> Result<()> {
    let (image, url) = upload_file(ctx, path).await?;

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            format_json(&Uploaded {
                file: image.file_name(),
                url: &url,
            })?
        ),
        OutputFormat::Table => println!("{}", url),
        OutputFormat::Pretty => {
            println!("{} Uploaded {}", "✓".green(), image.file_name().bold());
            println!("  {}", url.cyan());
        }
    }
    Ok(())
}
