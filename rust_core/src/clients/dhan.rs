//! DhanHQ market-feed client.
//!
//! Posts `{SEGMENT: [id, ...]}` to `/marketfeed/ltp` (or `/marketfeed/ohlc`)
//! and parses the reply with [`PriceSnapshot::from_json`].

use super::PriceFeed;
use crate::poller::snapshot::{PricePayload, PriceSnapshot};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.dhan.co/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhanEndpoint {
    Ltp,
    Ohlc,
}

impl DhanEndpoint {
    fn path(&self) -> &'static str {
        match self {
            DhanEndpoint::Ltp => "marketfeed/ltp",
            DhanEndpoint::Ohlc => "marketfeed/ohlc",
        }
    }
}

#[derive(Clone)]
pub struct DhanClient {
    client: Client,
    api_base: String,
    access_token: String,
    client_id: String,
    endpoint: DhanEndpoint,
    name: String,
}

impl DhanClient {
    pub fn new(api_base: &str, access_token: &str, client_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("ltpwatch/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client_id: client_id.to_string(),
            endpoint: DhanEndpoint::Ltp,
            name: "dhan-ltp".to_string(),
        })
    }

    /// Same credentials and connection pool, different endpoint.
    pub fn with_endpoint(&self, endpoint: DhanEndpoint) -> Self {
        let mut other = self.clone();
        other.endpoint = endpoint;
        other.name = match endpoint {
            DhanEndpoint::Ltp => "dhan-ltp",
            DhanEndpoint::Ohlc => "dhan-ohlc",
        }
        .to_string();
        other
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.api_base, self.endpoint.path())
    }
}

/// Request body; numeric ids are sent as JSON integers.
pub fn request_body(payload: &PricePayload) -> Value {
    let mut body = Map::new();
    for (segment, ids) in payload {
        let ids: Vec<Value> = ids
            .iter()
            .map(|id| match id.parse::<u64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(id.as_str()),
            })
            .collect();
        body.insert(segment.clone(), Value::Array(ids));
    }
    Value::Object(body)
}

#[async_trait]
impl PriceFeed for DhanClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, payload: &PricePayload) -> Result<PriceSnapshot> {
        let url = self.url();
        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("access-token", &self.access_token)
            .header("client-id", &self.client_id)
            .json(&request_body(payload))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", self.name, status, body.trim()));
        }

        let reply: Value = response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", self.name))?;
        let snapshot = PriceSnapshot::from_json(&reply)?;
        debug!("{} returned {} prices", self.name, snapshot.len());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_uses_integer_ids() {
        let mut payload = PricePayload::new();
        payload.insert("NSE_EQ".to_string(), vec!["11536".to_string(), "2885".to_string()]);
        payload.insert("IDX_I".to_string(), vec!["13".to_string()]);

        assert_eq!(
            request_body(&payload),
            json!({"IDX_I": [13], "NSE_EQ": [11536, 2885]})
        );
    }

    #[test]
    fn test_endpoint_urls() {
        let ltp = DhanClient::new("https://api.dhan.co/v2/", "t", "c", Duration::from_secs(5)).unwrap();
        assert_eq!(ltp.url(), "https://api.dhan.co/v2/marketfeed/ltp");

        let ohlc = ltp.with_endpoint(DhanEndpoint::Ohlc);
        assert_eq!(ohlc.url(), "https://api.dhan.co/v2/marketfeed/ohlc");
        assert_eq!(ohlc.provider_name(), "dhan-ohlc");
        assert_eq!(ltp.provider_name(), "dhan-ltp");
    }
}
