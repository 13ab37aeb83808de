use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use registro_consumer::config::Config;
use registro_consumer::delivery::Forwarder;
use registro_consumer::messaging::{ConnectionManager, LapinConnector};
use registro_consumer::metrics::{server::start_metrics_server, Metrics};

#[tokio::main]
async fn main() {
    setup_panic_handler();

    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    setup_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service_name = %config.service_name,
        queue = %config.broker.queue,
        api_url = %config.api_url,
        "Registro consumer starting"
    );

    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(error = %e, "Failed to create metrics");
            std::process::exit(1);
        }
    };

    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_metrics_server(metrics_clone, metrics_port).await {
            error!(error = %e, "Metrics server error");
        }
    });

    let forwarder = match Forwarder::new(config.api_url.clone(), config.http_timeout, metrics.clone()) {
        Ok(forwarder) => Arc::new(forwarder),
        Err(e) => {
            error!(error = %e, "Failed to build registro API client");
            std::process::exit(1);
        }
    };

    let connector = LapinConnector::new(&config, forwarder, metrics.clone());

    let mut manager = ConnectionManager::new(connector, metrics);

    tokio::select! {
        fatal = manager.run() => {
            error!(error = %fatal, "Registro consumer aborting");
            std::process::exit(1);
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::process::exit(1);
            }
            warn!("Shutdown signal received, stopping");
        }
    }

    info!("Registro consumer stopped");
}

fn setup_logging(rust_log: &str) {
    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            panic_message = message,
            location = %location,
            thread = ?std::thread::current().name(),
            "Panic"
        );
        eprintln!("PANIC: {} at {}", message, location);
    }));
}
