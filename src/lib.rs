pub mod api;
pub mod clients;
pub mod clock;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod models;
pub mod placeholder;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let mut log_level = config.general.log_level.clone();
    if config.general.suppress_connection_errors {
        log_level.push_str(",reqwest::retry=off,hyper_util=off");
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key, value)?;
        }

        let (layer, task) = builder.extra_field("env", "production")?.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "-s" | "--serve" => serve(config, prometheus_handle).await,

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    config.validate()?;

    info!("Soldwatch v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config)?);
    let app_state = api::create_app_state(shared, prometheus_handle);

    let app = api::router(app_state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("🌐 Web Server running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        {
            error!("Web server error: {}", e);
        }
    });

    info!("Gateway running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Gateway stopped");

    Ok(())
}

fn print_help() {
    println!("Soldwatch - Sold Property Lookup Gateway");
    println!("A caching, rate-limited gateway over the PropertyData sold-prices API");
    println!();
    println!("USAGE:");
    println!("  soldwatch <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("  serve             Run the HTTP gateway");
    println!("  init              Create default config file");
    println!("  help              Show this help message");
    println!();
    println!("ENDPOINTS:");
    println!("  POST /api/lookup         Look up sold properties for a postcode");
    println!("  GET  /api/lookup         Describe the lookup endpoint");
    println!("  GET  /api/health/live    Liveness probe");
    println!("  GET  /api/system/status  Version and uptime");
    println!("  GET  /api/metrics        Prometheus metrics");
    println!();
    println!("EXAMPLES:");
    println!("  soldwatch serve");
    println!("  curl -X POST localhost:7070/api/lookup \\");
    println!("    -H 'content-type: application/json' \\");
    println!("    -d '{{\"postcode\": \"SW1A 1AA\", \"limit\": 20}}'");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to set the provider API key, rate limits, cache TTL.");
    println!("  PROPERTYDATA_API_KEY overrides provider.api_key when set.");
}
