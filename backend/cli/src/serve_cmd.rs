//! `linkdrop serve`: wire storage, relay services and the Telegram adapter,
//! then run until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{error, info, warn};

use linkdrop_channels::{
    ChannelAdapter, TelegramAdapter, TelegramGateway, TelegramMembership, Transport,
};
use linkdrop_commands::{build_router, RelayServices};
use linkdrop_config::{validate, RelayConfig, TransportMode};
use linkdrop_core::{MessagingGateway, RecipientId};
use linkdrop_gateway::{start_server, GatewayState};
use linkdrop_relay::{
    AccessGate, BroadcastPolicy, Broadcaster, LinkBuilder, LinkResolver, RecipientDirectory,
    Registry,
};
use linkdrop_store::SqliteStore;

/// Telegram pushes updates to `<base>/wh/<token>`.
pub fn webhook_endpoint(base: &str, token: &str) -> Result<reqwest::Url> {
    let url = format!("{}/wh/{token}", base.trim_end_matches('/'));
    reqwest::Url::parse(&url).context("Invalid webhook URL")
}

fn listen_addr(config: &RelayConfig, port: Option<u16>) -> Result<SocketAddr> {
    let mut addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

pub async fn run(config: RelayConfig, port: Option<u16>) -> Result<()> {
    let report = validate(&config);
    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!(path = %err.path, "{}", err.message);
        }
        bail!("Configuration has {} error(s); run `linkdrop check-config`", report.errors.len());
    }

    let token = config.bot_token().context("Bot token is not configured")?;
    let username = config.bot_username().context("Bot username is not configured")?;
    let operator = RecipientId(config.operator_id().context("Operator id is not configured")?);
    let addr = listen_addr(&config, port)?;
    let db_path = config.db_path();

    info!(
        addr = %addr,
        db = %db_path.display(),
        bot = username,
        mode = ?config.mode(),
        "Starting linkdrop"
    );

    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );

    let bot = Bot::new(token);
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot.clone()));

    let registry = Arc::new(Registry::new(store.clone()));
    let directory = Arc::new(RecipientDirectory::new(store.clone()));
    let gate = Arc::new(
        AccessGate::new(
            Arc::new(TelegramMembership::new(bot.clone())),
            operator,
            config.gate_target().map(str::to_string),
        )
        .with_required(config.gate_enabled())
        .with_timeout(config.oracle_timeout()),
    );
    let resolver = Arc::new(LinkResolver::new(registry.clone(), gate.clone(), gateway.clone()));
    let policy = BroadcastPolicy {
        batch_size: config.batch_size(),
        cooldown: config.cooldown(),
        progress_every: config.progress_every(),
    };
    let broadcaster = Arc::new(Broadcaster::new(
        directory.clone(),
        gateway.clone(),
        store.clone(),
        policy,
    ));

    if let Some(checkpoint) = broadcaster.pending().await? {
        warn!(
            id = %checkpoint.id,
            remaining = checkpoint.remaining(),
            total = checkpoint.recipients.len(),
            "Interrupted broadcast found; send /resume to continue it"
        );
    }

    let services = RelayServices {
        operator,
        registry,
        directory: directory.clone(),
        gate,
        resolver,
        broadcaster: broadcaster.clone(),
        gateway: gateway.clone(),
        links: LinkBuilder::for_bot(username),
        page_budget: config.page_budget(),
    };
    let router = Arc::new(build_router(services));

    let transport = match config.mode() {
        TransportMode::Polling => Transport::Polling,
        TransportMode::Webhook => {
            let base = config.webhook_url().context("Webhook mode needs a webhook URL")?;
            Transport::Webhook { url: webhook_endpoint(base, token)?, address: addr }
        }
    };

    let adapter = TelegramAdapter::new(bot, router, gateway, transport);
    let handle = adapter
        .start()
        .await
        .with_context(|| format!("Failed to start {} adapter", adapter.name()))?;

    let app = linkdrop_gateway::build_router(
        GatewayState::new(directory, broadcaster),
        Some(handle.router),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(start_server(addr, app, shutdown_rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
        result = handle.task => {
            if let Err(e) = result {
                error!(error = %e, "Telegram dispatcher task failed");
            }
            warn!("Telegram dispatcher stopped");
        }
    }

    let _ = shutdown_tx.send(true);
    server.await.context("HTTP server task panicked")??;
    info!("linkdrop stopped");
    Ok(())
}
