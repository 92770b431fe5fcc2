use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::signal;
use tokio::time::interval;

use soso::cli::{Cli, Commands};
use soso::core::{config, init_logger, metrics, metrics_server};
use soso::search::{ManagementClient, SearchClient};
use soso::telegram::indexer::ChatResolver;
use soso::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use soso::validation::{
    spawn_requeue_scheduler, spawn_validation_worker, CredentialPool, TelegramHandleLookup, TelegramReviewNotifier,
    ValidationCache, ValidationQueue, ValidationWorker, WorkerConfig,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot in normal mode (webhook: {})", webhook);
            run_bot(webhook).await
        }
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

/// Run the Telegram bot
async fn run_bot(use_webhook: bool) -> Result<()> {
    log::info!("Starting bot...");

    metrics::init_metrics();

    let bot = create_bot()?;

    let bot_info = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;

    // Search engine and index storage clients
    let search = Arc::new(SearchClient::from_env());
    let management = ManagementClient::from_env().map(Arc::new);
    if management.is_none() {
        log::warn!("MANAGEMENT_SERVICE_URL not set; indexed chats are written to Meilisearch only");
    }
    let resolver = Arc::new(ChatResolver::new(config::BOT_TOKEN.clone()));

    // Validation pipeline: credential pool, verdict cache, queue, worker
    let tokens = config::VALIDATION_BOT_TOKENS.clone();
    if tokens.is_empty() {
        log::warn!("No validation credentials configured; handle validation is disabled");
    }
    let pool = Arc::new(CredentialPool::new(tokens));
    let cache = Arc::new(ValidationCache::new(config::validation::cache_ttl()));
    let (validation_queue, job_rx) = ValidationQueue::new(Arc::clone(&cache));
    let requeue_tx = spawn_requeue_scheduler(validation_queue.sender());

    let review_channel = ChatId(*config::REVIEW_CHANNEL_ID);
    if review_channel.0 == 0 {
        log::warn!("REVIEW_CHANNEL_ID not set; review notifications go nowhere");
    }
    let review_bot = Bot::new(config::REVIEW_BOT_TOKEN.clone());
    let notifier = Arc::new(TelegramReviewNotifier::new(review_bot, review_channel));

    let worker = ValidationWorker::new(
        pool,
        cache,
        Arc::new(TelegramHandleLookup::new()),
        notifier,
        job_rx,
        requeue_tx,
        WorkerConfig::default(),
    );
    let _worker_handle = spawn_validation_worker(worker);

    // Metrics endpoint (optional)
    if *config::metrics::ENABLED {
        let metrics_port = *config::metrics::PORT;
        log::info!("Starting metrics server on port {}", metrics_port);
        tokio::spawn(async move {
            if let Err(e) = metrics_server::start_metrics_server(metrics_port).await {
                log::error!("Metrics server error: {}", e);
            }
        });

        // Update the uptime counter every 60 seconds
        tokio::spawn(async {
            let mut ticker = interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                metrics::BOT_UPTIME_SECONDS.inc_by(60.0);
            }
        });
    } else {
        log::info!("Metrics collection disabled (METRICS_ENABLED=false)");
    }

    let deps = HandlerDeps::new(search, management, resolver, validation_queue);
    let handler = schema(deps);

    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };

    if let Some(url) = webhook_url {
        // Webhook mode
        log::info!("Starting bot in webhook mode at {}", url);

        // Delete existing webhook to ensure clean state
        let _ = bot.delete_webhook().await;
        bot.set_webhook(url::Url::parse(&url)?).await?;
        log::info!("Webhook set successfully");

        // Full webhook support needs an HTTP server (e.g. axum) receiving
        // updates from Telegram. Until that is wired up, the URL is set but
        // updates are not consumed.
        log::warn!("Webhook URL set to {}, but the HTTP server is not implemented yet.", url);
        log::warn!("Please set up an HTTP server to receive webhook updates, or use polling mode.");

        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Shutting down gracefully...");
                bot.delete_webhook().await?;
            },
        }
    } else {
        // Long polling mode (default)
        log::info!("Starting bot in long polling mode");
        log::info!("📡 Ready to receive updates!");

        Dispatcher::builder(bot, handler)
            .dependencies(DependencyMap::new())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        log::info!("Dispatcher shutdown gracefully");
    }

    Ok(())
}
