//! Exchange segment normalization.
//!
//! Maps provider-specific segment labels (`E`, `EQ`, `NSE`, `BSE:I`, ...) onto the
//! canonical keys used by the price feed. Unknown labels pass through uppercased
//! so an unseen code never blocks resolution.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const NSE_EQ: &str = "NSE_EQ";
pub const BSE_EQ: &str = "BSE_EQ";
pub const NSE_FNO: &str = "NSE_FNO";
pub const BSE_FNO: &str = "BSE_FNO";
pub const NSE_CURRENCY: &str = "NSE_CURRENCY";
pub const BSE_CURRENCY: &str = "BSE_CURRENCY";
pub const MCX_COMM: &str = "MCX_COMM";
pub const IDX_I: &str = "IDX_I";

/// Canonical segment used when a reference row carries no segment at all.
pub const DEFAULT_SEGMENT: &str = NSE_EQ;

static SEGMENT_TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn build_segment_table() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    // Canonical keys map to themselves
    for canonical in [
        NSE_EQ,
        BSE_EQ,
        NSE_FNO,
        BSE_FNO,
        NSE_CURRENCY,
        BSE_CURRENCY,
        MCX_COMM,
        IDX_I,
    ] {
        map.insert(canonical, canonical);
    }

    // Equity
    for raw in ["E", "EQ", "EQUITY", "NSE", "NSE:E", "NSE:EQ", "NSE_E"] {
        map.insert(raw, NSE_EQ);
    }
    for raw in ["BSE", "BSE:E", "BSE:EQ", "BSE_E"] {
        map.insert(raw, BSE_EQ);
    }

    // Indices
    for raw in [
        "I",
        "IDX",
        "INDEX",
        "NSE:I",
        "BSE:I",
        "NSE_INDEX",
        "BSE_INDEX",
        "NSE_IDX",
        "BSE_IDX",
    ] {
        map.insert(raw, IDX_I);
    }

    // Derivatives
    for raw in ["D", "FNO", "F&O", "NFO", "NSE:D", "NSE_FO", "NSE_DERIVATIVES"] {
        map.insert(raw, NSE_FNO);
    }
    for raw in ["BFO", "BSE:D", "BSE_FO", "BSE_DERIVATIVES"] {
        map.insert(raw, BSE_FNO);
    }

    // Currency
    for raw in ["C", "CDS", "CURRENCY", "NSE:C", "NSE_CDS"] {
        map.insert(raw, NSE_CURRENCY);
    }
    for raw in ["BCD", "BSE:C", "BSE_CDS"] {
        map.insert(raw, BSE_CURRENCY);
    }

    // Commodities
    for raw in ["M", "MCX", "MCX:M", "COMM", "COMMODITY", "MCX_COM"] {
        map.insert(raw, MCX_COMM);
    }

    map
}

/// Normalize a raw segment label to its canonical key.
///
/// Case-insensitive; surrounding whitespace is ignored. Empty input yields
/// [`DEFAULT_SEGMENT`]. Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let key = raw.trim().to_uppercase();
    if key.is_empty() {
        return DEFAULT_SEGMENT.to_string();
    }

    let table = SEGMENT_TABLE.get_or_init(build_segment_table);
    match table.get(key.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => key,
    }
}

/// Combine an exchange code and a segment code into the composite raw label
/// understood by [`normalize`] (e.g. `BSE` + `E` -> `BSE:E`).
pub fn composite(exchange: &str, segment: &str) -> String {
    let exchange = exchange.trim();
    let segment = segment.trim();
    match (exchange.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => exchange.to_string(),
        (false, false) => format!("{}:{}", exchange, segment),
    }
}
