//! Outbound collaborators: reference data, price feed and notification sink.
//!
//! The core depends only on the traits here; concrete HTTP clients live in
//! the submodules.

pub mod builtin;
pub mod dhan;
pub mod scrip_master;
pub mod telegram;

use crate::master::ReferenceTable;
use crate::poller::snapshot::{PricePayload, PriceSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub use builtin::BuiltinCatalog;
pub use dhan::{DhanClient, DhanEndpoint};
pub use scrip_master::ScripMasterSource;
pub use telegram::TelegramClient;

/// Source of the raw instrument reference table.
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch(&self) -> Result<ReferenceTable>;
}

/// Batch price lookup. Failures are transient and retried by the poller.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn fetch(&self, payload: &PricePayload) -> Result<PriceSnapshot>;
}

/// Best-effort message delivery. Errors are logged by the caller, never escalated.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<()>;
}

/// Sink used when no messaging credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn sink_name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<()> {
        info!("Notification (log only):\n{}", text);
        Ok(())
    }
}
