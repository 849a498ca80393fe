// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use push_client::{
    Category, Config, EndpointDialer, FirehoseHandler, HandlerOutcome, InBandHandler, Item, MemoryStore,
    OutOfBandMessage, PushClient, SnapshotReason, StaticTokenProvider, Uid,
};

#[derive(Parser)]
#[command(name = "push-client-demo", version, about = "Connects to a push broker and logs every message it sees.")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Hex-encoded UID to authenticate as.
    #[arg(long, env = "PUSH_CLIENT_UID")]
    uid: String,

    /// Bearer token sent on every Authenticate call.
    #[arg(long, env = "PUSH_CLIENT_TOKEN")]
    token: String,
}

/// Logs every in-band creation and dismissal it receives.
struct LoggingInBandHandler;

#[tonic::async_trait]
impl InBandHandler for LoggingInBandHandler {
    fn name(&self) -> &str {
        "logging"
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn create(&self, category: &Category, item: &Item) -> HandlerOutcome {
        info!(category, msg_id = %item.msg_id, ctime = item.ctime, "item created");
        HandlerOutcome::Handled
    }

    async fn dismiss(&self, category: &Category, item: &Item) -> HandlerOutcome {
        info!(category, msg_id = %item.msg_id, "item dismissed");
        HandlerOutcome::Handled
    }
}

/// Logs every full-state snapshot and out-of-band message.
struct LoggingFirehoseHandler;

#[tonic::async_trait]
impl FirehoseHandler for LoggingFirehoseHandler {
    fn name(&self) -> &str {
        "logging-firehose"
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn push_state(&self, items: &[Item], reason: SnapshotReason) {
        info!(count = items.len(), ?reason, "state snapshot");
    }

    async fn push_out_of_band(&self, msg: &OutOfBandMessage) {
        info!(system = %msg.system, bytes = msg.body.len(), "out-of-band message");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let uid = match Uid::try_from(cli.uid.as_str()) {
        Ok(uid) => uid,
        Err(err) => {
            error!("invalid uid: {err}");
            std::process::exit(2);
        }
    };

    let dialer = Arc::new(EndpointDialer::new(cli.config.endpoint.clone()));
    let provider = StaticTokenProvider::new(cli.token);
    let client = PushClient::new(uid, dialer, provider, MemoryStore::new(), cli.config);

    client.push_in_band_handler(Arc::new(LoggingInBandHandler)).await;
    client.push_firehose_handler(Arc::new(LoggingFirehoseHandler)).await;

    client.restore().await;
    client.connect();

    tokio::signal::ctrl_c().await.ok();
    info!("shutting down");
    client.shutdown();
}
