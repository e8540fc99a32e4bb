// Shared models for the ltpwatch core and services
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Instrument master
// ============================================================================

/// One parsed row of the reference instrument table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRecord {
    /// Uppercase, whitespace-trimmed trading symbol (may be empty)
    pub trading_symbol: String,
    /// Uppercase, whitespace-trimmed instrument name (may be empty)
    pub name: String,
    /// Provider identifier; empty means the record can never be matched
    pub security_id: String,
    /// Provider-specific segment label, before normalization
    pub segment_raw: String,
    /// Uppercase word tokens of `trading_symbol` + `name`
    pub tokens: BTreeSet<String>,
}

impl MasterRecord {
    pub fn new(trading_symbol: &str, name: &str, security_id: &str, segment_raw: &str) -> Self {
        let trading_symbol = normalize_text(trading_symbol);
        let name = normalize_text(name);
        let tokens = tokenize(&format!("{} {}", trading_symbol, name));

        Self {
            trading_symbol,
            name,
            security_id: security_id.trim().to_string(),
            segment_raw: segment_raw.trim().to_string(),
            tokens,
        }
    }

    pub fn is_matchable(&self) -> bool {
        !self.security_id.is_empty()
    }

    /// Text compared by the similarity tier: `"<symbol> <name>"`.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.trading_symbol, self.name)
            .trim()
            .to_string()
    }

    /// Preferred human label: trading symbol, then name.
    pub fn label(&self) -> Option<&str> {
        if !self.trading_symbol.is_empty() {
            Some(&self.trading_symbol)
        } else if !self.name.is_empty() {
            Some(&self.name)
        } else {
            None
        }
    }
}

/// Uppercase and collapse internal whitespace.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Split on slash and whitespace boundaries into deduplicated uppercase tokens.
pub fn tokenize(s: &str) -> BTreeSet<String> {
    s.split(|c: char| c == '/' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect()
}

// ============================================================================
// Tracked instruments
// ============================================================================

/// Identity of a tracked instrument: (canonical segment, security id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub segment: String,
    pub security_id: String,
}

impl InstrumentKey {
    pub fn new(segment: impl Into<String>, security_id: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            security_id: security_id.into(),
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.security_id)
    }
}

/// An operator query bound to a concrete provider instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstrument {
    /// Original operator text
    pub query: String,
    pub security_id: String,
    /// Canonical segment (see `segments::normalize`)
    pub segment: String,
    pub display_name: String,
}

impl ResolvedInstrument {
    pub fn key(&self) -> InstrumentKey {
        InstrumentKey::new(self.segment.clone(), self.security_id.clone())
    }
}

// ============================================================================
// Per-cycle observations
// ============================================================================

/// Change against the previously observed price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub previous: f64,
    pub delta: f64,
    /// Percent change; forced to 0 when `previous == 0`
    pub percent: f64,
}

impl PriceChange {
    pub fn between(previous: f64, current: f64) -> Self {
        let delta = current - previous;
        let percent = if previous == 0.0 {
            0.0
        } else {
            delta / previous * 100.0
        };

        Self {
            previous,
            delta,
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading {
    /// Price present; `change` is `None` on first sight of the instrument
    Priced {
        price: f64,
        change: Option<PriceChange>,
    },
    /// Key missing from the reply or its price was null
    Unavailable,
}

/// Transient per-cycle record for one requested instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub key: InstrumentKey,
    pub reading: Reading,
    /// Set by the alert policy; always false for unavailable readings
    pub accepted: bool,
}

impl Observation {
    pub fn price(&self) -> Option<f64> {
        match self.reading {
            Reading::Priced { price, .. } => Some(price),
            Reading::Unavailable => None,
        }
    }

    pub fn change(&self) -> Option<PriceChange> {
        match self.reading {
            Reading::Priced { change, .. } => change,
            Reading::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.reading, Reading::Unavailable)
    }
}
