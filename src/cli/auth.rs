//! Login, logout and profile commands

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use log::debug;

use crate::cli::{CommandContext, OutputFormat};
use crate::client::MovieApi;
use crate::client::models::LoginRequest;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::json::format_json;

/// Sign in, prompting for whatever was not passed on the command line.
pub async fn login(
    ctx: &CommandContext,
    email: Option<String>,
    password: Option<String>,
    remember_me: bool,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()?,
    };

    let request = LoginRequest::new(email, password, remember_me);
    debug!("Signing in to {}", ctx.config.api_base());
    let session = ctx.client.login(&request).await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&session.user)?),
        _ => println!(
            "{} Signed in as {} <{}>",
            "✓".green(),
            session.user.name.bold(),
            session.user.email
        ),
    }
    Ok(())
}

/// Sign out. The local session is forgotten even if the server call fails.
pub async fn logout(ctx: &CommandContext) -> Result<()> {
    if !ctx.store().is_authenticated() && ctx.store().refresh_token().is_none() {
        ctx.client.purge_session_data();
        println!("{} Not signed in", "○".dimmed());
        return Ok(());
    }

    match ctx.client.logout().await {
        Ok(message) => {
            debug!("Server: {}", message.message);
            println!("{} Signed out", "✓".green());
        }
        Err(e) => {
            println!(
                "{} Signed out locally ({})",
                "⚠".yellow(),
                e.to_string().dimmed()
            );
        }
    }
    Ok(())
}

/// Show the signed-in user's profile
pub async fn profile(ctx: &CommandContext) -> Result<()> {
    ctx.require_session()?;
    let profile = ctx.client.get_profile().await?;
    profile.print(ctx.format)?;
    ctx.client.settle().await;
    Ok(())
}
