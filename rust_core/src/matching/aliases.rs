//! Informal instrument aliases (e.g. `BANKNIFTY` -> `NIFTY BANK`).

use crate::models::normalize_text;
use std::collections::HashMap;

/// Uppercase alias -> uppercase target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index names operators commonly type instead of the listed name.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert("BANKNIFTY", "NIFTY BANK");
        table.insert("NIFTYBANK", "NIFTY BANK");
        table.insert("CNX NIFTY", "NIFTY 50");
        table
    }

    pub fn insert(&mut self, alias: &str, target: &str) {
        let alias = normalize_text(alias);
        let target = normalize_text(target);
        if !alias.is_empty() && !target.is_empty() && alias != target {
            self.map.insert(alias, target);
        }
    }

    /// Parse `ALIAS=TARGET` pairs separated by `;`. Malformed pairs are
    /// returned in the error list and skipped.
    pub fn extend_from_pairs(&mut self, raw: &str) -> Vec<String> {
        let mut rejected = Vec::new();
        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((alias, target)) if !alias.trim().is_empty() && !target.trim().is_empty() => {
                    self.insert(alias, target)
                }
                _ => rejected.push(pair.to_string()),
            }
        }
        rejected
    }

    pub fn lookup(&self, query: &str) -> Option<&str> {
        self.map.get(&normalize_text(query)).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
