//! Sign-in, sign-out and session status.

use std::io::{self, Write};

use anyhow::{bail, Result};
use menucache_core::auth::CredentialStore;
use menucache_core::config::Config;
use menucache_core::AppContext;
use tracing::{info, warn};

/// Interactive login. The email defaults to the last one used.
pub async fn login(ctx: &mut AppContext, email: Option<String>) -> Result<()> {
    println!("\n=== menucache login ===\n");

    let email = match email {
        Some(email) => email,
        None => prompt_email(ctx.config.last_email.as_deref())?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }

    let password = if CredentialStore::has_credentials(&email) {
        print!("Use stored password? [Y/n]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "n" {
            CredentialStore::get_password(&email)?
        } else {
            prompt_password()?
        }
    } else {
        prompt_password()?
    };

    println!("\nAuthenticating...");
    sign_in(ctx, &email, &password).await?;

    if let Some(business) = ctx.session.business() {
        println!("Signed in to {}.\n", business.display_name());
    }
    Ok(())
}

async fn sign_in(ctx: &mut AppContext, email: &str, password: &str) -> Result<()> {
    let session_data = ctx.api.authenticate(email, password).await?;

    if let Err(e) = CredentialStore::store(email, password) {
        warn!(error = %e, "Failed to store credentials");
    }

    ctx.sign_in(session_data)?;
    info!(email = %email, business_id = ?ctx.session.business_id(), "Login successful");
    Ok(())
}

/// Make sure a usable session exists, renewing it from the keychain when it
/// has expired or is about to.
pub async fn ensure_session(ctx: &mut AppContext) -> Result<()> {
    let needs_renewal = match ctx.session.data.as_ref() {
        Some(data) if !data.is_expired() => data.needs_refresh(),
        _ => true,
    };
    if !needs_renewal {
        return Ok(());
    }

    match CredentialStore::renewal_login(ctx.config.last_email.as_deref()) {
        Some((email, password)) => {
            info!(email = %email, "Renewing session with stored credentials");
            match sign_in(ctx, &email, &password).await {
                Ok(()) => Ok(()),
                // Still usable for now, try again next time
                Err(e) if ctx.session.is_valid() => {
                    warn!(error = %e, "Session renewal failed");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        None if ctx.session.is_valid() => Ok(()),
        None => bail!("Not signed in. Run `menucache login` first."),
    }
}

pub fn logout(ctx: &mut AppContext) -> Result<()> {
    let email = ctx
        .session
        .data
        .as_ref()
        .map(|d| d.email.clone())
        .or_else(|| ctx.config.last_email.clone());

    ctx.sign_out()?;

    if let Some(email) = email {
        if let Err(e) = CredentialStore::delete(&email) {
            warn!(error = %e, "Failed to delete stored credentials");
        }
    }

    println!("Signed out.");
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    match ctx.session.data.as_ref().filter(|d| !d.is_expired()) {
        Some(data) => {
            println!("Signed in as {}", data.email);
            println!(
                "Business:   {} ({})",
                data.business.display_name(),
                data.business.id
            );
            println!("Expires in: {} min", data.minutes_until_expiry());
        }
        None => println!("Not signed in"),
    }

    let settings = ctx.settings();
    println!("API:        {}", ctx.config.api_base_url());
    println!("Config:     {}", ctx.config_path.display());
    if let Ok(dir) = Config::cache_dir() {
        println!("Cache:      {}", dir.display());
    }
    println!(
        "Page:       {} x {}",
        settings.page.page, settings.page.page_size
    );
    println!("Bulk delay: {} ms", settings.bulk_delay.as_millis());
    Ok(())
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last_email) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
