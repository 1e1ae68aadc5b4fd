//! Zalobot CLI entry point.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use zalobot::api::{AppState, start_http_server};
use zalobot::config::Config;
use zalobot::conversation::{ConversationHandler, SessionStore};
use zalobot::llm::GeminiClient;
use zalobot::messaging::ZaloClient;

/// Timeout for all outbound HTTP: Bot API sends, Gemini calls, and
/// attachment downloads. Keeps a hung upstream from retaining the task
/// forever.
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Parser)]
#[command(name = "zalobot")]
#[command(about = "A Zalo chat bot that relays conversations to Google Gemini")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server (the default)
    Serve,
    /// Validate the bot token and webhook configuration, then exit
    CheckToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load().with_context(|| "failed to load configuration from environment")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CheckToken => check_token(config).await,
    }
}

fn build_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .with_context(|| "failed to build HTTP client")
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Zalobot...");

    let config = Arc::new(config);
    let http = build_http_client()?;

    let zalo = Arc::new(ZaloClient::new(
        http.clone(),
        config.bot_token.clone(),
        config.reply,
    ));
    let gemini = Arc::new(GeminiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
    ));
    let sessions = Arc::new(SessionStore::new());
    let handler = Arc::new(ConversationHandler::new(
        sessions,
        gemini,
        zalo.clone(),
        http,
        config.categories.clone(),
    ));

    tracing::info!("Conversation handler initialized");

    // Register the webhook up front when the public URL is known.
    match &config.webhook_url {
        Some(url) => {
            if let Err(error) = zalo.set_webhook(url, &config.secret_token).await {
                tracing::warn!(
                    %error,
                    "automatic webhook setup failed; POST /setup-webhook to retry"
                );
            }
        }
        None => {
            tracing::warn!(
                "WEBHOOK_URL not set; register the webhook manually via POST /setup-webhook"
            );
        }
    }

    let bind: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = Arc::new(AppState {
        handler,
        zalo,
        config: config.clone(),
        started_at: std::time::Instant::now(),
    });

    let server = start_http_server(bind, state, shutdown_rx)
        .await
        .with_context(|| format!("failed to start HTTP server on {bind}"))?;

    tracing::info!("Zalobot started successfully");

    tokio::select! {
        _ = server => {
            tracing::info!("HTTP server ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(true);

    tracing::info!("Zalobot stopped");
    Ok(())
}

/// Mirror of the deployment checklist: is the token real, and does the
/// Bot API accept our webhook registration?
async fn check_token(config: Config) -> anyhow::Result<()> {
    let http = build_http_client()?;
    let zalo = ZaloClient::new(http, config.bot_token.clone(), config.reply);

    let me = zalo
        .get_me()
        .await
        .with_context(|| "bot token check failed; is ZALO_BOT_TOKEN a Bot API token?")?;
    tracing::info!(bot = %me["result"], "bot token is valid");

    match &config.webhook_url {
        Some(url) => {
            zalo.set_webhook(url, &config.secret_token)
                .await
                .with_context(|| "webhook registration failed")?;
            tracing::info!(%url, "webhook registration verified");
        }
        None => {
            tracing::warn!("WEBHOOK_URL not set; skipped webhook registration test");
        }
    }

    Ok(())
}
