//! Echo Bot Demo
//!
//! A small bot showing routes, middleware, locals and `next()`.
//!
//! # Configuration
//!
//! Put the token in `courier.toml`:
//!
//! ```toml
//! [bot]
//! token = "123456:ABC-DEF"
//!
//! [dispatch]
//! pool_capacity = 8
//! ```
//!
//! or in the environment as `COURIER_BOT__TOKEN`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::time::Instant;

use anyhow::{Result, bail};
use courier::prelude::*;
use tracing::info;

// ============================================================================
// Middleware
// ============================================================================

/// Logs every command and how long its chain took.
///
/// Registered first, so it wraps the rest of the chain through `next()`.
async fn log_command(ctx: Context) -> HandlerResult {
    let started = Instant::now();
    let name = ctx.command().map(|c| c.name.clone()).unwrap_or_default();
    ctx.set_local(
        "display_name",
        ctx.message()
            .from
            .as_ref()
            .map(|u| u.first_name.clone())
            .unwrap_or_else(|| "there".to_string()),
    );

    let result = ctx.next().await;
    info!(
        command = %name,
        chat_id = ctx.from_chat_id(),
        user_id = ?ctx.from_user_id(),
        elapsed = ?started.elapsed(),
        ok = result.is_ok(),
        "Handled command"
    );
    result
}

// ============================================================================
// Handlers
// ============================================================================

async fn start(ctx: Context) -> HandlerResult {
    let name: String = ctx.local_as("display_name").unwrap_or_default();
    ctx.string(format!("Hello, {name}! Send /help to see what I can do."), true)
        .await
}

async fn echo(ctx: Context) -> HandlerResult {
    let args = ctx.command().map(|c| c.args.clone()).unwrap_or_default();
    if args.is_empty() {
        bail!("Usage: /echo <text>");
    }
    ctx.string(args, true).await
}

async fn ping(ctx: Context) -> HandlerResult {
    ctx.string("Pong! 🏓", false).await
}

async fn help(ctx: Context) -> HandlerResult {
    let help_text = "\
Echo Bot - Commands
/start       - Greeting
/echo <text> - Echo text
/ping        - Pong!
/help        - This help";
    ctx.string(help_text, false).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let mut app = App::from_loader(ConfigLoader::new())?;

    // Chains run as [log_command, handler]; under the default full-chain
    // policy the handler is not run again after log_command's next().
    app.middleware(log_command)
        .command("start", chain![start])
        .command("echo", chain![echo])
        .command("ping", chain![ping])
        .command("help", chain![help]);

    app.error_handler(error_handler_fn(|ctx: Context, err: anyhow::Error| async move {
        if let Err(e) = ctx.string(format!("⚠️ {err}"), true).await {
            tracing::error!(error = %e, "Failed to report error");
        }
    }));

    app.run().await?;

    Ok(())
}
