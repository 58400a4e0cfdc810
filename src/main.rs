use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use replybot::chatbot::ChatService;
use replybot::config::Config;
use replybot::server;

#[tokio::main]
async fn main() {
    let explicit_path = std::env::args().nth(1);
    let config_path = explicit_path.clone().unwrap_or_else(|| "replybot.json".to_string());
    let loaded = if explicit_path.is_some() {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    };
    let config = match loaded.and_then(|c| c.with_port_override(std::env::var("PORT").ok().as_deref())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    std::fs::create_dir_all(&config.log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join("replybot.log"))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to open log file in {:?}: {e}", config.log_dir);
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting replybot...");
    if explicit_path.is_some() {
        info!("Loaded config from {config_path}");
    } else {
        info!("Using {config_path} (defaults if missing)");
    }
    info!("Data dir: {:?}", config.data_dir);
    if !config.persist_transcript {
        info!("Transcript persistence disabled");
    }

    let (chat, faults) = ChatService::open(config.service_config());
    for fault in &faults {
        error!("Recovered from persistence fault at startup: {fault}");
    }
    info!("Keyword table: {} entries", chat.keyword_entries().await);

    let app = server::router(Arc::new(chat), config.static_dir.as_deref());
    if let Some(ref dir) = config.static_dir {
        info!("Serving client files from {:?}", dir);
    }

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server running at http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
    }
    info!("Shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
