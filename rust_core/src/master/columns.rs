//! Column role detection for reference tables with unknown schemas.
//!
//! Each logical role carries an ordered synonym list. Detection first looks for
//! a column whose name equals a synonym (case-insensitive), in synonym order;
//! only when no exact hit exists does it accept a column whose name contains a
//! synonym. Columns already claimed by an earlier role are skipped.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    SecurityId,
    Symbol,
    Name,
    Segment,
    Exchange,
}

impl ColumnRole {
    /// Detection order. The identifier goes first so it can never lose a
    /// column to a looser role.
    pub const ALL: [ColumnRole; 5] = [
        ColumnRole::SecurityId,
        ColumnRole::Symbol,
        ColumnRole::Name,
        ColumnRole::Segment,
        ColumnRole::Exchange,
    ];

    /// Ranked synonyms, most specific first.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::SecurityId => &[
                "securityid",
                "security_id",
                "smst_security_id",
                "scrip_code",
                "instrument_token",
                "token",
                "sid",
                "id",
            ],
            ColumnRole::Symbol => &[
                "tradingsymbol",
                "trading_symbol",
                "trade_symbol",
                "symbol",
                "scrip",
                "ticker",
                "trad",
            ],
            ColumnRole::Name => &[
                "symbol_name",
                "security_name",
                "securityname",
                "company_name",
                "custom_symbol",
                "name",
                "instrumentname",
            ],
            ColumnRole::Segment => &[
                "exchangesegment",
                "exchange_segment",
                "segment",
                "exch_seg",
                "seg",
            ],
            ColumnRole::Exchange => &["exch_id", "exchange_id", "exchange", "exch"],
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::SecurityId => "security id",
            ColumnRole::Symbol => "trading symbol",
            ColumnRole::Name => "name",
            ColumnRole::Segment => "segment",
            ColumnRole::Exchange => "exchange",
        };
        f.write_str(name)
    }
}

/// Positions of the detected columns in the table header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub security_id: Option<usize>,
    pub symbol: Option<usize>,
    pub name: Option<usize>,
    pub segment: Option<usize>,
    pub exchange: Option<usize>,
}

impl ColumnMap {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::SecurityId => self.security_id,
            ColumnRole::Symbol => self.symbol,
            ColumnRole::Name => self.name,
            ColumnRole::Segment => self.segment,
            ColumnRole::Exchange => self.exchange,
        }
    }

    fn set(&mut self, role: ColumnRole, idx: usize) {
        match role {
            ColumnRole::SecurityId => self.security_id = Some(idx),
            ColumnRole::Symbol => self.symbol = Some(idx),
            ColumnRole::Name => self.name = Some(idx),
            ColumnRole::Segment => self.segment = Some(idx),
            ColumnRole::Exchange => self.exchange = Some(idx),
        }
    }

    fn claimed(&self, idx: usize) -> bool {
        ColumnRole::ALL
            .iter()
            .any(|role| self.get(*role) == Some(idx))
    }
}

/// Find the column for `role`, ignoring columns in `taken`.
pub fn detect_column(role: ColumnRole, columns: &[String], taken: &ColumnMap) -> Option<usize> {
    let lowered: Vec<String> = columns.iter().map(|c| header_key(c)).collect();
    let free = |idx: &usize| !taken.claimed(*idx);

    // Exact pass
    for synonym in role.synonyms() {
        if let Some(idx) = (0..lowered.len())
            .filter(free)
            .find(|&idx| lowered[idx] == *synonym)
        {
            return Some(idx);
        }
    }

    // Substring pass
    for synonym in role.synonyms() {
        if let Some(idx) = (0..lowered.len())
            .filter(free)
            .find(|&idx| lowered[idx].contains(synonym))
        {
            return Some(idx);
        }
    }

    None
}

/// Lowercase with spaces and hyphens folded to `_` (`Security ID` -> `security_id`).
fn header_key(column: &str) -> String {
    column
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Detect every role in [`ColumnRole::ALL`] order.
pub fn detect_columns(columns: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for role in ColumnRole::ALL {
        if let Some(idx) = detect_column(role, columns, &map) {
            map.set(role, idx);
        }
    }
    map
}
