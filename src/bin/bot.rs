//! Bot Binary - Webhook-driven video intake
//!
//! Wires up:
//! - Redis metadata store (thumbnail cache, archive references)
//! - Telegram Bot API (downloads, archive channel, replies)
//! - Catbox image hosting
//! - The retention loop and the inbound webhook (registered when
//!   `WEBHOOK_URL` is set)

use keyframer::adapters::catbox::CatboxHosting;
use keyframer::adapters::redis::RedisPool;
use keyframer::adapters::telegram::{
    webhook, TelegramArchive, TelegramClient, TelegramFiles, TelegramNotifier,
};
use keyframer::application::archive::ArchiveService;
use keyframer::application::publisher::Publisher;
use keyframer::av::FfmpegDecoder;
use keyframer::domain::admission::AdmissionController;
use keyframer::{AppConfig, IntakeService, ThumbnailPipeline};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = or_exit("configuration", AppConfig::from_env());

    // 1. Adapters
    let store = or_exit("redis pool", RedisPool::new(&config.redis_url));
    let downloads = or_exit(
        "telegram client",
        TelegramClient::new(&config.bot_token, config.download_timeout),
    );
    let archive_client = or_exit(
        "telegram client",
        TelegramClient::new(&config.bot_token, config.archive_timeout),
    );
    let notify_client = or_exit(
        "telegram client",
        TelegramClient::new(&config.bot_token, NOTIFY_TIMEOUT),
    );
    let hosting = or_exit(
        "hosting client",
        CatboxHosting::new(config.hosting_url.clone(), config.upload_timeout),
    );

    if let Some(public_url) = &config.webhook_url {
        match notify_client.set_webhook(public_url).await {
            Ok(()) => info!(%public_url, "webhook registered"),
            Err(e) => warn!(%public_url, error = %e, "webhook registration failed"),
        }
    }

    let cache = Arc::new(store.clone());

    // 2. Application services
    let archive = ArchiveService::new(
        Arc::new(TelegramArchive::new(archive_client, config.archive_channel_id)),
        Arc::new(store),
    );
    let pipeline = Arc::new(ThumbnailPipeline::new(
        Arc::new(AdmissionController::new(
            config.rate_limit_requests,
            config.rate_limit_window,
        )),
        cache.clone(),
        Arc::new(TelegramFiles::new(downloads)),
        archive.clone(),
        Arc::new(FfmpegDecoder),
        Publisher::new(Arc::new(hosting), config.publish_workers, config.upload_timeout),
        config.max_thumbnails,
        config.max_upload_bytes,
    ));
    let intake = IntakeService::new(
        pipeline,
        cache,
        Arc::new(TelegramNotifier::new(notify_client)),
    );

    // 3. Retention loop
    let retention = config.retention;
    let mut ticker = tokio::time::interval(config.retention_interval);
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            archive.purge_expired(retention).await;
        }
    });

    // 4. Start server
    let bind = format!("{}:{}", config.addr, config.port);
    let listener = or_exit("tcp listener", tokio::net::TcpListener::bind(&bind).await);
    info!(%bind, "listening");
    if let Err(e) = axum::serve(listener, webhook::router(intake)).await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

fn or_exit<T, E: Display>(what: &str, result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "failed to initialise {}", what);
            std::process::exit(1);
        }
    }
}
