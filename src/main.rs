//! Telemetry signer.
//!
//! # Architecture Overview
//!
//! ```text
//!   collector socket ──▶ CollectorFeed ──▶ TelemetryQueue ──▶ BatchOrchestrator ─┐
//!                                                                                 │
//!   node websocket ───▶ RealtimeSubscriber ◀── JSON-RPC (peers, client) ──────────┤
//!                                                                                 ▼
//!                                                   PayloadSigner (RSA, PKCS#1 v1.5)
//!                                                                                 │
//!                                                                                 ▼
//!                                     IngressClient (pinned HTTPS, 202 = delivered)
//!                                                                                 │
//!                                                              failure ───────────┤
//!                                                                                 ▼
//!                                     SftpChannel (pinned host key) | FileDropChannel
//! ```
//!
//! Run with `--genkeys` once to create the encrypted signing key and print the
//! public key, then run without flags to ship telemetry.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use telemetry_signer::batch::{BatchOrchestrator, TelemetryQueue};
use telemetry_signer::collector::CollectorFeed;
use telemetry_signer::config::{load_config, SignerConfig, ValidationScope};
use telemetry_signer::ingress::{
    endpoint_url, IngressClient, PinnedHttpsTransport, Transport, BATCH_PATH, REALTIME_PATH,
};
use telemetry_signer::observability::{logging, metrics};
use telemetry_signer::realtime::{JsonRpcClient, RealtimeSubscriber};
use telemetry_signer::secondary::{FileDropChannel, SecondaryChannel, SftpChannel};
use telemetry_signer::signing::{FileKeyStore, PayloadSigner};

#[derive(Parser, Debug)]
#[command(name = "telemetry-signer")]
#[command(about = "Signs validator telemetry and ships it to a pinned ingress", long_about = None)]
struct Cli {
    /// Generate a new signing keypair, print the public key and exit
    #[arg(long)]
    genkeys: bool,

    /// TOML configuration file, applied before environment overrides
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let scope = if cli.genkeys {
        ValidationScope::KeyGeneration
    } else {
        ValidationScope::Run
    };
    let config = load_config(cli.config.as_deref(), scope)?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), node_id = %config.node_id, "telemetry-signer starting");

    std::fs::create_dir_all(&config.key_store_dir)?;
    let keystore = Arc::new(FileKeyStore::new(&config.key_store_dir));
    let signer = Arc::new(PayloadSigner::new(config.node_id.clone(), keystore)?);

    if cli.genkeys {
        let generator = signer.clone();
        let public_key = tokio::task::spawn_blocking(move || generator.generate_keys()).await??;
        println!("{}", public_key);
        return Ok(());
    }

    signer.init()?;
    run(config, signer).await
}

async fn run(config: SignerConfig, signer: Arc<PayloadSigner>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address"),
        }
    }

    tracing::info!(
        ingress = %config.ingress.host,
        collector = %config.collector.socket_path,
        rpc = %config.node.rpc_url,
        websocket = %config.node.websocket_url,
        "Configuration loaded"
    );

    // One pinned connection pool shared by both endpoints.
    let transport: Arc<dyn Transport> = Arc::new(PinnedHttpsTransport::new(
        &config.ingress.fingerprint,
        Duration::from_secs(config.ingress.connect_timeout_secs),
        Duration::from_secs(config.ingress.request_timeout_secs),
    )?);
    let batch_client = IngressClient::new(
        &endpoint_url(&config.ingress.host, BATCH_PATH),
        &config.ingress.fingerprint,
        Some(transport.clone()),
    )?;
    let realtime_client = IngressClient::new(
        &endpoint_url(&config.ingress.host, REALTIME_PATH),
        &config.ingress.fingerprint,
        Some(transport),
    )?;

    let secondary: Arc<dyn SecondaryChannel> = match SftpChannel::from_config(&config.secondary)? {
        Some(sftp) => {
            tracing::info!(
                host = %sftp.host(),
                port = sftp.port(),
                remote_dir = %sftp.remote_dir(),
                "Secondary channel ready (SFTP)"
            );
            Arc::new(sftp)
        }
        None => {
            let drop_channel = FileDropChannel::new(&config.secondary.drop_dir)?;
            tracing::info!(drop_dir = %drop_channel.dir().display(), "Secondary channel ready (file drop)");
            Arc::new(drop_channel)
        }
    };

    let queue = Arc::new(TelemetryQueue::new());
    let feed = CollectorFeed::new(&config.collector)?;
    let orchestrator = BatchOrchestrator::new(
        queue.clone(),
        signer.clone(),
        batch_client,
        secondary.clone(),
        config.batch.clone(),
    );

    let rpc = Arc::new(JsonRpcClient::new(
        &config.node.rpc_url,
        Duration::from_secs(config.node.rpc_timeout_secs),
    )?);
    let subscriber = RealtimeSubscriber::new(&config.node, rpc, signer, realtime_client, secondary)?;

    tokio::spawn(feed.run(queue.clone()));
    tokio::spawn(orchestrator.run());
    tokio::spawn(async move { subscriber.subscribe_and_post(true).await });

    shutdown_signal().await;
    tracing::info!(queued = queue.len(), "Shutdown signal received, exiting without draining queue");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
