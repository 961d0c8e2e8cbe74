//! Movie display model

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use super::common::{format_datetime, truncate_string};
use crate::cli::OutputFormat;
use crate::client::models::{Movie, MoviePage};
use crate::error::Result;
use crate::output::Formattable;
use crate::output::json::{PageMeta, format_json, format_json_page};
use crate::output::table::{format_table, format_table_or};

const TITLE_WIDTH: usize = 40;
const POSTER_WIDTH: usize = 48;

/// Movie display model for table output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct MovieDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "TITLE")]
    pub title: String,

    #[tabled(rename = "YEAR")]
    pub year: i32,

    #[tabled(rename = "POSTER")]
    pub poster: String,

    #[tabled(rename = "UPDATED")]
    pub updated: String,
}

impl From<&Movie> for MovieDisplay {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id.clone(),
            title: truncate_string(&movie.title, TITLE_WIDTH),
            year: movie.publishing_year,
            poster: truncate_string(&movie.poster_url, POSTER_WIDTH),
            updated: format_datetime(movie.updated_at.as_ref()),
        }
    }
}

impl Formattable for Movie {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(format_table(&[MovieDisplay::from(self)])),
            OutputFormat::Pretty => {
                let lines = [
                    format!("{} ({})", self.title.bold(), self.publishing_year),
                    format!("  {:<8} {}", "ID".dimmed(), self.id),
                    format!("  {:<8} {}", "Poster".dimmed(), self.poster_url),
                    format!(
                        "  {:<8} {}",
                        "Created".dimmed(),
                        format_datetime(self.created_at.as_ref())
                    ),
                    format!(
                        "  {:<8} {}",
                        "Updated".dimmed(),
                        format_datetime(self.updated_at.as_ref())
                    ),
                ];
                Ok(lines.join("\n"))
            }
        }
    }
}

impl Formattable for MoviePage {
    fn format(&self, format: OutputFormat) -> Result<String> {
        let rows: Vec<MovieDisplay> = self.results.iter().map(MovieDisplay::from).collect();
        match format {
            OutputFormat::Json => {
                let page = PageMeta {
                    page: self.page,
                    last_page: self.last_page,
                    total: self.total,
                    has_next: self.has_next(),
                };
                Ok(format_json_page(&self.results, page)?)
            }
            OutputFormat::Table => Ok(format_table(&rows)),
            OutputFormat::Pretty => {
                if rows.is_empty() && self.page <= 1 {
                    return Ok(format_table_or(
                        &rows,
                        "No movies yet. Add one with `cinedex movie create`.",
                    ));
                }
                let mut out = format_table_or(&rows, "No movies on this page.");
                let footer = format!(
                    "Page {} of {} ({} movies)",
                    self.page,
                    self.last_page.max(1),
                    self.total
                );
                out.push_str(&format!("\n{}", footer.dimmed()));
                if self.has_next() {
                    let next = format!("Next: cinedex movie list --page {}", self.page + 1);
                    out.push_str(&format!("\n{}", next.dimmed()));
                }
                Ok(out)
            }
        }
    }
}
