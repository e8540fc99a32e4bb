mod config;

use anyhow::{anyhow, Context, Result};
use config::{Config, ReferenceSource};
use dotenv::dotenv;
use ltpwatch_core::clients::{
    BuiltinCatalog, DhanClient, DhanEndpoint, LogSink, NotificationSink, ReferenceDataSource,
    ScripMasterSource, TelegramClient,
};
use ltpwatch_core::matching::{parse_security_ids, resolve_queries, Resolution, Resolver};
use ltpwatch_core::models::ResolvedInstrument;
use ltpwatch_core::{AlertPolicy, MasterIndex, NotificationFormatter, PricePoller};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting LTP notifier...");

    let config = Config::from_env().context("Invalid configuration")?;

    let instruments = resolve_instruments(&config).await?;
    info!(
        "Tracking {} instruments: {}",
        instruments.len(),
        instruments
            .iter()
            .map(|i| format!("{} ({})", i.display_name, i.key()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Collaborators
    let feed = DhanClient::new(
        &config.dhan_api_base,
        &config.dhan_token,
        &config.dhan_client_id,
        config.poller.retry.attempt_timeout,
    )?;

    let sink: Arc<dyn NotificationSink> = match &config.telegram {
        Some(tg) => Arc::new(TelegramClient::new(
            &tg.api_base,
            tg.bot_token.clone(),
            tg.chat_id.clone(),
            config.message_style,
            config.poller.send_timeout,
        )?),
        None => {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, notifications go to the log only");
            Arc::new(LogSink)
        }
    };

    let formatter = NotificationFormatter::new(config.message_style, config.display_timezone);
    let mut poller = PricePoller::new(
        instruments,
        Arc::new(feed.clone()),
        sink,
        AlertPolicy::new(config.alerts),
        formatter,
        config.poller.clone(),
    );
    if config.ohlc_fallback {
        poller = poller.with_fallback(Arc::new(feed.with_endpoint(DhanEndpoint::Ohlc)));
    }

    if config.run_once {
        let report = poller.run_cycle().await;
        match report.message {
            Some(text) => println!("{}", text),
            None => info!("No prices to report"),
        }
        return Ok(());
    }

    poller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("LTP notifier stopped");
    Ok(())
}

/// Build the tracked instrument set. Fatal when nothing can be tracked.
async fn resolve_instruments(config: &Config) -> Result<Vec<ResolvedInstrument>> {
    let mut resolution = Resolution::default();

    if !config.symbols.is_empty() {
        let index = load_index(config).await?;
        let resolver = Resolver::from_options(&index, &config.resolver);
        resolve_queries(&resolver, &config.symbols, &mut resolution);
    }

    for instrument in parse_security_ids(&config.security_ids) {
        let key = instrument.key();
        if !resolution.push(instrument) {
            warn!("Security id {} already tracked, skipping", key);
        }
    }

    if !resolution.unresolved.is_empty() {
        warn!("Unresolved symbols: {}", resolution.unresolved.join(", "));
    }
    if resolution.is_empty() {
        return Err(anyhow!("No valid instruments resolved; nothing to poll"));
    }

    Ok(resolution.instruments)
}

async fn load_index(config: &Config) -> Result<MasterIndex> {
    let source: Box<dyn ReferenceDataSource> = match &config.reference_source {
        ReferenceSource::Remote(location) => {
            Box::new(ScripMasterSource::new(location, config.reference_timeout)?)
        }
        ReferenceSource::Builtin => Box::new(BuiltinCatalog),
    };

    info!("Loading instrument reference from {}", source.source_name());
    let table = tokio::time::timeout(config.reference_timeout, source.fetch())
        .await
        .map_err(|_| {
            anyhow!(
                "Timed out after {:?} loading reference from {}",
                config.reference_timeout,
                source.source_name()
            )
        })?
        .context("Failed to load instrument reference")?;

    let index = MasterIndex::build(&table).context("Failed to index instrument reference")?;
    info!(
        "Indexed {} instruments ({} matchable)",
        index.len(),
        index.matchable().count()
    );
    Ok(index)
}
