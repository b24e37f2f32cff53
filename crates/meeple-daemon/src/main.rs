// crates/meeple-daemon/src/main.rs
//
// Binary entrypoint for the Meeple recommender daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, loads the
// model artifact, and serves recommendations over RPC until Ctrl-C.

mod config;
mod content;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use config::ServiceConfig;
use content::HttpContentSimilarity;

use meeple_engine::HybridRecommender;
use meeple_rpc::handlers::model::ModelProvenance;
use meeple_rpc::handlers::recommend::SharedContent;
use meeple_rpc::{MeepleRpcServer, RpcConfig};
use meeple_store::load_artifact;

/// Meeple recommender daemon: serves hybrid board-game recommendations.
#[derive(Parser, Debug)]
#[command(name = "meeple-daemon", version, about = "Meeple hybrid recommender daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.meeple/config.toml")]
    config: String,

    /// Model artifact path (overrides the config file).
    #[arg(long)]
    artifact: Option<String>,

    /// RPC port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found. Logging is set up afterwards so `log_level` applies.
    let config_path = expand_tilde(&args.config);
    let loaded = ServiceConfig::load(&config_path);
    let mut service_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => ServiceConfig::default(),
    };

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&service_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    // CLI flags override the config file values.
    if let Some(artifact) = args.artifact {
        service_config.artifact_path = artifact;
    }
    if let Some(port) = args.port {
        service_config.rpc_port = port;
    }

    tracing::info!("Meeple Recommender Daemon v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "RPC endpoint: {}:{}",
        service_config.rpc_host,
        service_config.rpc_port
    );

    // ---------------------------------------------------------------
    // Load the model artifact. Nothing is served without a valid one.
    // ---------------------------------------------------------------
    let artifact_path = expand_tilde(&service_config.artifact_path);
    let loaded_artifact = load_artifact(&artifact_path).map_err(|e| {
        tracing::error!("Failed to load model artifact from {}: {}", artifact_path, e);
        e
    })?;
    let provenance = ModelProvenance::from(&loaded_artifact);

    let blend = service_config.blend_config();
    tracing::info!(
        low = blend.low,
        high = blend.high,
        pivot = blend.pivot,
        absent_content = ?blend.absent_content,
        "Blend configuration"
    );
    let recommender = Arc::new(HybridRecommender::new(
        Arc::new(loaded_artifact.artifact),
        blend,
    )?);

    // ---------------------------------------------------------------
    // Optional content-similarity collaborator.
    // ---------------------------------------------------------------
    let content: Option<SharedContent> = match &service_config.content_url {
        Some(url) => {
            let client =
                HttpContentSimilarity::new(url.clone(), service_config.content_timeout_secs);
            tracing::info!(
                "Content service: {} (timeout {}s)",
                client.url(),
                service_config.content_timeout_secs
            );
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!(
                "No content_url configured. Preferences are ignored; content \
                 signal only comes from precomputed scores."
            );
            None
        }
    };

    let rpc_config = RpcConfig {
        host: service_config.rpc_host.clone(),
        port: service_config.rpc_port,
    };
    let rpc_server = MeepleRpcServer::new(rpc_config, recommender)
        .with_content_service(content)
        .with_limits(service_config.limits())
        .with_provenance(provenance)
        .with_start_time(Instant::now());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Spawn RPC server in background, wait for Ctrl-C in foreground.
    let mut server_task = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = rpc_server.start(shutdown).await {
            tracing::error!("RPC server error: {}", e);
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(());
            let _ = server_task.await;
        }
        _ = &mut server_task => {
            tracing::error!("RPC server exited unexpectedly");
        }
    }

    tracing::info!("Meeple daemon shut down gracefully");

    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &path[1..]);
        }
    }
    path.to_string()
}
