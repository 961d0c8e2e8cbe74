//! User profile display model

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use super::common::format_datetime;
use crate::cli::OutputFormat;
use crate::client::models::UserProfile;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::json::format_json;
use crate::output::table::format_table;

/// Profile display model for table output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ProfileDisplay {
    #[tabled(rename = "USER ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "EMAIL")]
    pub email: String,

    #[tabled(rename = "ACTIVE")]
    pub active: String,

    #[tabled(rename = "LAST LOGIN")]
    pub last_login: String,
}

impl From<&UserProfile> for ProfileDisplay {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            active: if profile.is_active { "yes" } else { "no" }.to_string(),
            last_login: format_datetime(profile.last_login.as_ref()),
        }
    }
}

impl Formattable for UserProfile {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(format_json(self)?),
            OutputFormat::Table => Ok(format_table(&[ProfileDisplay::from(self)])),
            OutputFormat::Pretty => {
                let status = if self.is_active {
                    "active".green()
                } else {
                    "inactive".red()
                };
                Ok([
                    format!("{} <{}>", self.name.bold(), self.email),
                    format!("  {:<11} {}", "User ID".dimmed(), self.id),
                    format!("  {:<11} {}", "Status".dimmed(), status),
                    format!(
                        "  {:<11} {}",
                        "Member since".dimmed(),
                        format_datetime(self.created_at.as_ref())
                    ),
                    format!(
                        "  {:<11} {}",
                        "Last login".dimmed(),
                        format_datetime(self.last_login.as_ref())
                    ),
                ]
                .join("\n"))
            }
        }
    }
}
