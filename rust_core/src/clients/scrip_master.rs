//! Scrip master CSV loader (HTTP URL or local file).

use super::ReferenceDataSource;
use crate::master::ReferenceTable;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, Trim};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_SCRIP_MASTER_URL: &str = "https://images.dhan.co/api-data/api-scrip-master.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Http(String),
    File(PathBuf),
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Http(raw.to_string())
        } else {
            Location::File(PathBuf::from(raw))
        }
    }
}

pub struct ScripMasterSource {
    location: Location,
    client: Client,
    name: String,
}

impl ScripMasterSource {
    pub fn new(location: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("ltpwatch/0.1")
            .build()
            .context("Failed to create HTTP client")?;
        let location = Location::parse(location);
        let name = match &location {
            Location::Http(url) => url.clone(),
            Location::File(path) => path.display().to_string(),
        };

        Ok(Self {
            location,
            client,
            name,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download scrip master from {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Scrip master download failed: HTTP {}", response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read scrip master body")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ReferenceDataSource for ScripMasterSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<ReferenceTable> {
        let bytes = match &self.location {
            Location::Http(url) => self.download(url).await?,
            Location::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        };

        let table = parse_csv(&bytes).await?;
        info!("Loaded {} instruments from {}", table.len(), self.name);
        Ok(table)
    }
}

/// Parse CSV bytes into a [`ReferenceTable`]. Invalid UTF-8 is replaced, short
/// rows are padded by the index, and unreadable rows are skipped.
pub async fn parse_csv(bytes: &[u8]) -> Result<ReferenceTable> {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = AsyncReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .create_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .await
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut records = reader.records();
    while let Some(record) = records.next().await {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} unreadable scrip master rows", skipped);
    }

    Ok(ReferenceTable::new(columns, rows))
}
