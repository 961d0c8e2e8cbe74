//! Movie command implementations

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use log::debug;

use crate::cache::QueryKey;
use crate::cli::{CommandContext, OutputFormat, PaginationArgs, PosterArgs};
use crate::client::MovieApi;
use crate::client::models::{CreateMovieRequest, UpdateMovieRequest};
use crate::error::{Result, ValidationError};
use crate::output::Formattable;
use crate::output::json::format_json;

/// Run the movie list command
pub async fn list(ctx: &CommandContext, pagination: &PaginationArgs) -> Result<()> {
    ctx.require_session()?;
    let params = pagination.to_params(ctx.config.preferences.page_size);
    debug!("Listing movies page={} limit={}", params.page, params.limit);

    let _shown = ctx.client.cache().subscribe(&QueryKey::movie_list(&params));
    let page = ctx.client.list_movies(&params).await?;
    page.print(ctx.format)?;
    ctx.client.settle().await;
    Ok(())
}

/// Run the movie get command
pub async fn get(ctx: &CommandContext, id: &str) -> Result<()> {
    ctx.require_session()?;
    let _shown = ctx.client.cache().subscribe(&QueryKey::movie_detail(id));
    let movie = ctx.client.get_movie(id).await?;
    movie.print(ctx.format)?;
    ctx.client.settle().await;
    Ok(())
}

/// Run the movie create command.
///
/// With `--poster-file` the image is uploaded first; the movie is only
/// created once the upload has produced a URL.
pub async fn create(
    ctx: &CommandContext,
    title: String,
    year: i32,
    poster: &PosterArgs,
) -> Result<()> {
    // Check the text fields before spending an upload on them
    UpdateMovieRequest {
        title: Some(title.clone()),
        publishing_year: Some(year),
        poster_url: poster.poster.clone(),
    }
    .validate()?;
    ctx.require_session()?;

    let poster_url = resolve_poster(ctx, poster)
        .await?
        .ok_or(ValidationError::MissingPoster)?;
    let request = CreateMovieRequest {
        title,
        publishing_year: year,
        poster_url,
    };

    let movie = ctx.client.create_movie(&request).await?;
    report(ctx, "Created", &movie)
}

/// Run the movie update command; only the given fields are sent.
///
/// A cached copy of the movie is patched while the request is in flight and
/// rolled back if the server rejects the change.
pub async fn update(
    ctx: &CommandContext,
    id: &str,
    title: Option<String>,
    year: Option<i32>,
    poster: &PosterArgs,
) -> Result<()> {
    let mut request = UpdateMovieRequest {
        title,
        publishing_year: year,
        poster_url: poster.poster.clone(),
    };
    match poster.poster_file {
        Some(ref path) => {
            if let Err(e) = request.validate()
                && e != ValidationError::EmptyUpdate
            {
                return Err(e.into());
            }
            let (_, url) = super::upload::upload_file(ctx, path).await?;
            request.poster_url = Some(url);
        }
        None => request.validate()?,
    }
    ctx.require_session()?;

    let movie = ctx.client.update_movie_optimistic(id, &request).await?;
    report(ctx, "Updated", &movie)
}

/// Run the movie delete command
pub async fn delete(ctx: &CommandContext, id: &str, yes: bool) -> Result<()> {
    ctx.require_session()?;

    if !yes {
        let movie = ctx.client.get_movie(id).await?;
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete \"{}\" ({})?",
                movie.title, movie.publishing_year
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{} Cancelled", "○".dimmed());
            return Ok(());
        }
    }

    let message = ctx.client.delete_movie(id).await?;
    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&message)?),
        _ => println!("{} {}", "✓".green(), message.message),
    }
    Ok(())
}

/// Poster URL from `--poster`, or from uploading `--poster-file`
async fn resolve_poster(ctx: &CommandContext, poster: &PosterArgs) -> Result<Option<String>> {
    if let Some(ref url) = poster.poster {
        return Ok(Some(url.clone()));
    }
    match poster.poster_file {
        Some(ref path) => {
            let (_, url) = super::upload::upload_file(ctx, path).await?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

fn report(ctx: &CommandContext, verb: &str, movie: &crate::client::models::Movie) -> Result<()> {
    if ctx.format == OutputFormat::Pretty {
        println!("{} {} {}", "✓".green(), verb, movie.title.bold());
    }
    movie.print(ctx.format)
}
