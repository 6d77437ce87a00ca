use lanwake::api::{self, AppState};
use lanwake::config::{Config, DEFAULT_CONFIG_PATH};
use lanwake::dispatch::Dispatcher;
use lanwake::metrics::Metrics;
use lanwake::registry::Registry;
use lanwake::wol::UdpWolSender;

use clap::Parser;
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "LANWAKE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

fn init_logging(config: &Config) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
            config.server.log.level.as_str(),
        ));
    if config.server.log.format == "json" {
        builder.format(|buf, record| {
            use std::io::Write;
            let line = serde_json::json!({
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    } else {
        builder.format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis));
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };
    init_logging(&config);
    info!("configuration loaded from {}", args.config);

    let metrics = Arc::new(Metrics::new()?);

    // A bad allowlist is fatal: never serve traffic with a
    // partially-valid machine set.
    let registry = match Registry::new(config.machines.clone()) {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            error!("failed to build machine registry: {err}");
            std::process::exit(1);
        }
    };
    info!("machine allowlist loaded, {} machines", registry.len());
    for machine in registry.get_all() {
        debug!("machine registered: '{}' ({})", machine.name, machine.id);
    }
    metrics.configured_machines.set(registry.len() as i64);

    if config.authentication.api_key.is_empty() {
        warn!("no API key configured, protected endpoints will not require authentication");
    }

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        Arc::new(UdpWolSender::new()),
        metrics.clone(),
    ));
    let state = AppState {
        dispatcher,
        metrics,
        started_at: Instant::now(),
    };
    let app = api::router(state, &config);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    info!("server starting on {addr}, version {}", api::VERSION);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {err}");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("server stopped gracefully");
    Ok(())
}
