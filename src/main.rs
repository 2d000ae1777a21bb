//! Switchyard demo server.
//!
//! Loads configuration, registers a handful of example routes and serves them
//! until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use clap::Parser;
use serde::Deserialize;
use tokio::net::TcpListener;

use switchyard::config::{load_config, ServerConfig};
use switchyard::lifecycle::{spawn_signal_listener, Shutdown};
use switchyard::observability::{logging, metrics};
use switchyard::{handler_fn, middleware, middleware_fn, Core, HttpError, HttpServer, Routes};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Pattern-routed HTTP server", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

fn routes(core: &mut Core) {
    core.use_middleware([middleware::recover()]);

    core.get(
        "/",
        handler_fn(|c| Box::pin(async move { c.string(StatusCode::OK, "switchyard is running") })),
    )
    .name("index");

    core.get(
        "/hello/{name}",
        handler_fn(|c| {
            Box::pin(async move {
                let name = c.param("name").unwrap_or("world").to_string();
                c.json(StatusCode::OK, &serde_json::json!({ "hello": name }))
            })
        }),
    )
    .name("hello");

    core.post(
        "/hello",
        handler_fn(|c| {
            Box::pin(async move {
                let greeting: Greeting = c
                    .decode()
                    .await
                    .map_err(|_| HttpError::with_message(StatusCode::BAD_REQUEST, "expected {\"name\": ...}"))?;
                c.json(StatusCode::CREATED, &serde_json::json!({ "hello": greeting.name }))
            })
        }),
    );

    let timing = middleware_fn(|c, next| {
        Box::pin(async move {
            let start = std::time::Instant::now();
            let result = next.run(c).await;
            tracing::debug!(elapsed = ?start.elapsed(), path = %c.request().uri().path(), "api request");
            result
        })
    });

    let mut api = core.group("/api", vec![timing]);
    api.get(
        "/items/{id:[0-9]+}",
        handler_fn(|c| {
            Box::pin(async move {
                let id: u64 = c
                    .param("id")
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(HttpError::bad_request)?;
                c.json(StatusCode::OK, &serde_json::json!({ "id": id }))
            })
        }),
    )
    .name("item");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level)?;
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        static_mounts = config.static_files.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut core = Core::new();
    routes(&mut core);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let server = HttpServer::new(core, config)?;

    let shutdown = Shutdown::new();
    let signalled = shutdown.signalled();
    spawn_signal_listener(shutdown.clone());

    let mut serving = tokio::spawn(server.run(listener, signalled));
    let drain = shutdown.signalled();
    tokio::pin!(drain);

    let finished = tokio::select! {
        result = &mut serving => Some(result),
        _ = &mut drain => None,
    };

    match finished {
        Some(result) => result??,
        None => match tokio::time::timeout(grace, serving).await {
            Ok(result) => result??,
            Err(_) => tracing::warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed; exiting"
            ),
        },
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
