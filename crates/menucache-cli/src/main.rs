//! menucache - hydrate and browse restaurant menu and campaign categories
//! from the dashboard API.

mod auth;
mod browse;
mod cli;

use std::io;

use anyhow::Result;
use menucache_core::config::Config;
use menucache_core::AppContext;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Command, USAGE};

/// Log file name inside the cache directory
const LOG_FILE: &str = "menucache.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily log file in the cache directory. The
/// returned guard flushes the file writer and must be held until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match Config::cache_dir() {
        Ok(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let _guard = init_tracing();
    debug!(?command, "menucache starting");

    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut ctx = AppContext::load()?;

    match command {
        Command::Login { email } => auth::login(&mut ctx, email).await?,
        Command::Logout => auth::logout(&mut ctx)?,
        Command::Status => auth::status(&ctx)?,
        Command::Menu { category } => {
            auth::ensure_session(&mut ctx).await?;
            browse::menu(&ctx, category.as_deref()).await?;
        }
        Command::Campaigns { category } => {
            auth::ensure_session(&mut ctx).await?;
            browse::campaigns(&ctx, category.as_deref()).await?;
        }
        Command::Help => {}
    }

    info!("menucache finished");
    Ok(())
}
