//! Price request payloads and tolerant reply parsing.

use crate::models::{InstrumentKey, ResolvedInstrument};
use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Request body shape: canonical segment -> security ids.
pub type PricePayload = BTreeMap<String, Vec<String>>;

/// Fields that may carry the price, in priority order.
const PRICE_FIELDS: [&str; 4] = ["last_price", "ltp", "lastPrice", "close"];

/// Group instruments by segment, keeping first-seen id order per segment.
pub fn build_payload<'a, I>(instruments: I) -> PricePayload
where
    I: IntoIterator<Item = &'a ResolvedInstrument>,
{
    let mut payload = PricePayload::new();
    for inst in instruments {
        let ids = payload.entry(inst.segment.clone()).or_default();
        if !ids.contains(&inst.security_id) {
            ids.push(inst.security_id.clone());
        }
    }
    payload
}

/// Prices found in one reply. Keys without a usable price are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: HashMap<InstrumentKey, f64>,
}

impl PriceSnapshot {
    /// Parse a reply of the form `{"data": {SEG: {ID: {...}}}}` or the bare
    /// inner mapping. Malformed segments and entries are skipped; only an
    /// explicit `"status": "failure"` is an error.
    pub fn from_json(reply: &Value) -> Result<Self> {
        if reply.get("status").and_then(Value::as_str) == Some("failure") {
            let remarks = reply
                .get("remarks")
                .or_else(|| reply.get("errorMessage"))
                .map(|v| v.to_string())
                .unwrap_or_else(|| "no remarks".to_string());
            bail!("price feed reported failure: {}", remarks);
        }

        let data = match reply.get("data") {
            Some(inner) if inner.is_object() => inner,
            _ => reply,
        };

        let mut prices = HashMap::new();
        if let Some(segments) = data.as_object() {
            for (segment, entries) in segments {
                let Some(entries) = entries.as_object() else {
                    continue;
                };
                for (security_id, quote) in entries {
                    if let Some(price) = extract_price(quote) {
                        prices.insert(InstrumentKey::new(segment.as_str(), security_id.as_str()), price);
                    }
                }
            }
        }

        Ok(Self { prices })
    }

    pub fn price(&self, key: &InstrumentKey) -> Option<f64> {
        self.prices.get(key).copied()
    }

    pub fn insert(&mut self, key: InstrumentKey, price: f64) {
        self.prices.insert(key, price);
    }

    /// Keys of `payload` that have no price here.
    pub fn missing(&self, payload: &PricePayload) -> PricePayload {
        let mut out = PricePayload::new();
        for (segment, ids) in payload {
            let absent: Vec<String> = ids
                .iter()
                .filter(|id| !self.prices.contains_key(&InstrumentKey::new(segment.as_str(), id.as_str())))
                .cloned()
                .collect();
            if !absent.is_empty() {
                out.insert(segment.clone(), absent);
            }
        }
        out
    }

    /// Fill gaps from `other` without overwriting known prices.
    pub fn fill_from(&mut self, other: &PriceSnapshot) {
        for (key, price) in &other.prices {
            self.prices.entry(key.clone()).or_insert(*price);
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

fn extract_price(quote: &Value) -> Option<f64> {
    let quote = quote.as_object()?;
    PRICE_FIELDS
        .iter()
        .filter_map(|field| quote.get(*field))
        .chain(quote.get("ohlc").and_then(|o| o.get("close")))
        .find_map(as_price)
}

fn as_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}
