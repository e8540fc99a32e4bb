//! Free-text instrument resolution.
//!
//! A query is matched against the [`MasterIndex`] in strict tiers; the first
//! tier that yields any candidate wins and tiers are never blended:
//!
//! 1. exact trading symbol
//! 2. exact name (aliases are tried here when the raw query misses)
//! 3. token overlap, most hits first, then the most specific record
//! 4. approximate similarity above a cutoff
//!
//! Best-effort mode re-runs tiers 3 and 4 with relaxed acceptance, and only
//! when the caller explicitly asks for it.

pub mod aliases;
pub mod similarity;

use crate::master::MasterIndex;
use crate::models::{normalize_text, tokenize, InstrumentKey, MasterRecord, ResolvedInstrument};
use crate::segments;
use aliases::AliasTable;
use serde::{Deserialize, Serialize};
use similarity::{JaroWinkler, Similarity};
use std::collections::HashSet;
use tracing::{info, warn};

/// Default similarity cutoff for tier 4.
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchTier {
    ExactSymbol = 1,
    ExactName = 2,
    TokenOverlap = 3,
    Similarity = 4,
}

/// A resolved record plus how it was found.
#[derive(Debug, Clone)]
pub struct Match<'a> {
    pub record: &'a MasterRecord,
    pub tier: MatchTier,
    /// 1.0 for exact tiers, hit ratio for tier 3, similarity for tier 4
    pub score: f64,
    /// Produced by best-effort matching
    pub relaxed: bool,
    /// Alias target used instead of the raw query
    pub via_alias: Option<String>,
}

impl<'a> Match<'a> {
    fn new(record: &'a MasterRecord, tier: MatchTier, score: f64) -> Self {
        Self {
            record,
            tier,
            score,
            relaxed: false,
            via_alias: None,
        }
    }
}

/// Operator-facing resolution settings.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub cutoff: f64,
    pub best_effort: bool,
    pub aliases: AliasTable,
    /// Name accepted by [`similarity::by_name`]
    pub similarity: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            best_effort: false,
            aliases: AliasTable::builtin(),
            similarity: "jaro_winkler".to_string(),
        }
    }
}

/// Tiered matcher over a borrowed index. Pure with respect to the index.
pub struct Resolver<'a> {
    index: &'a MasterIndex,
    similarity: Box<dyn Similarity>,
    cutoff: f64,
    aliases: AliasTable,
    best_effort: bool,
}

impl<'a> Resolver<'a> {
    /// Jaro-Winkler similarity, cutoff 0.6, no aliases, strict batch resolution.
    pub fn new(index: &'a MasterIndex) -> Self {
        Self {
            index,
            similarity: Box::new(JaroWinkler),
            cutoff: DEFAULT_CUTOFF,
            aliases: AliasTable::empty(),
            best_effort: false,
        }
    }

    /// Build from operator options. An unknown similarity name keeps Jaro-Winkler.
    pub fn from_options(index: &'a MasterIndex, opts: &ResolverOptions) -> Self {
        let resolver = Self::new(index)
            .with_cutoff(opts.cutoff)
            .with_aliases(opts.aliases.clone())
            .with_best_effort(opts.best_effort);
        match similarity::by_name(&opts.similarity) {
            Some(sim) => resolver.with_similarity(sim),
            None => {
                warn!("Unknown similarity '{}', using jaro_winkler", opts.similarity);
                resolver
            }
        }
    }

    pub fn with_similarity(mut self, similarity: Box<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Let [`resolve_queries`] fall back to [`Resolver::resolve_relaxed`].
    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }

    pub fn best_effort(&self) -> bool {
        self.best_effort
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn similarity_name(&self) -> &'static str {
        self.similarity.name()
    }

    /// Resolve under normal rules (tiers 1-4).
    pub fn resolve(&self, query: &str) -> Option<Match<'a>> {
        let q = normalize_text(query);
        if q.is_empty() {
            return None;
        }

        if let Some(m) = self.exact(&q) {
            return Some(m);
        }

        if let Some(target) = self.aliases.lookup(&q) {
            if let Some(mut m) = self.exact(target) {
                m.via_alias = Some(target.to_string());
                return Some(m);
            }
        }

        self.token_overlap(&q, false)
            .or_else(|| self.most_similar(&q, false))
    }

    /// Best-effort pass over tiers 3-4: substring token hits count, and any
    /// positive similarity is accepted.
    pub fn resolve_relaxed(&self, query: &str) -> Option<Match<'a>> {
        let q = normalize_text(query);
        if q.is_empty() {
            return None;
        }

        self.token_overlap(&q, true)
            .or_else(|| self.most_similar(&q, true))
            .map(|mut m| {
                m.relaxed = true;
                m
            })
    }

    fn exact(&self, q: &str) -> Option<Match<'a>> {
        if let Some(rec) = self.index.matchable().find(|r| r.trading_symbol == q) {
            return Some(Match::new(rec, MatchTier::ExactSymbol, 1.0));
        }
        self.index
            .matchable()
            .find(|r| r.name == q)
            .map(|rec| Match::new(rec, MatchTier::ExactName, 1.0))
    }

    fn token_overlap(&self, q: &str, relaxed: bool) -> Option<Match<'a>> {
        let q_tokens = tokenize(q);
        if q_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&'a MasterRecord, usize)> = None;
        for rec in self.index.matchable() {
            let hit = q_tokens
                .iter()
                .filter(|t| {
                    if relaxed {
                        rec.tokens.iter().any(|rt| rt.contains(t.as_str()))
                    } else {
                        rec.tokens.contains(t.as_str())
                    }
                })
                .count();
            if hit == 0 {
                continue;
            }

            // Strictly better only, so the first-encountered record keeps ties
            let better = match best {
                None => true,
                Some((current, current_hit)) => {
                    hit > current_hit
                        || (hit == current_hit && rec.tokens.len() < current.tokens.len())
                }
            };
            if better {
                best = Some((rec, hit));
            }
        }

        best.map(|(rec, hit)| {
            Match::new(
                rec,
                MatchTier::TokenOverlap,
                hit as f64 / q_tokens.len() as f64,
            )
        })
    }

    fn most_similar(&self, q: &str, relaxed: bool) -> Option<Match<'a>> {
        let mut best: Option<(&'a MasterRecord, f64)> = None;
        for rec in self.index.matchable() {
            let score = self.similarity.score(q, &rec.full_text());
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((rec, score));
            }
        }

        match best {
            Some((rec, score)) if relaxed && score > 0.0 => {
                Some(Match::new(rec, MatchTier::Similarity, score))
            }
            Some((rec, score)) if !relaxed && score >= self.cutoff => {
                Some(Match::new(rec, MatchTier::Similarity, score))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Batch resolution
// ============================================================================

/// Outcome of resolving the operator's query list.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Tracked set in insertion order, unique by instrument key
    pub instruments: Vec<ResolvedInstrument>,
    pub unresolved: Vec<String>,
    /// Queries that landed on an instrument already tracked
    pub duplicates: Vec<String>,
    seen: HashSet<InstrumentKey>,
}

impl Resolution {
    /// Add an instrument unless its key is already tracked.
    pub fn push(&mut self, instrument: ResolvedInstrument) -> bool {
        if self.seen.insert(instrument.key()) {
            self.instruments.push(instrument);
            true
        } else {
            self.duplicates.push(instrument.query);
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Bind a match to the query that produced it.
pub fn to_instrument(query: &str, m: &Match<'_>) -> ResolvedInstrument {
    let display_name = m
        .record
        .label()
        .map(str::to_string)
        .unwrap_or_else(|| query.trim().to_string());

    ResolvedInstrument {
        query: query.to_string(),
        security_id: m.record.security_id.clone(),
        segment: segments::normalize(&m.record.segment_raw),
        display_name,
    }
}

/// Resolve each query in order, dropping failures and duplicate instruments.
///
/// In best-effort mode a query that fails normal resolution gets exactly one
/// relaxed attempt before being dropped.
pub fn resolve_queries(resolver: &Resolver<'_>, queries: &[String], resolution: &mut Resolution) {
    for query in queries {
        let found = resolver.resolve(query).or_else(|| {
            if resolver.best_effort() {
                resolver.resolve_relaxed(query)
            } else {
                None
            }
        });

        let Some(m) = found else {
            warn!("Could not resolve symbol '{}'", query);
            resolution.unresolved.push(query.clone());
            continue;
        };

        let instrument = to_instrument(query, &m);
        info!(
            "Resolved '{}' -> {} ({}) via {:?}{}{} score={:.2}",
            query,
            instrument.key(),
            instrument.display_name,
            m.tier,
            if m.relaxed { " [best-effort]" } else { "" },
            m.via_alias
                .as_deref()
                .map(|a| format!(" [alias {}]", a))
                .unwrap_or_default(),
            m.score,
        );

        let key = instrument.key();
        if !resolution.push(instrument) {
            warn!("'{}' resolves to already tracked {}, skipping", query, key);
        }
    }
}

/// Parse direct `SEGMENT:ID` / `ID` entries (comma separated). Entries without
/// a segment default to NSE equity; non-numeric ids are skipped.
pub fn parse_security_ids(raw: &str) -> Vec<ResolvedInstrument> {
    let mut out = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (segment_raw, id) = match entry.split_once(':') {
            Some((seg, id)) => (seg.trim(), id.trim()),
            None => (segments::DEFAULT_SEGMENT, entry),
        };

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            warn!("Ignoring security id entry '{}': id must be numeric", entry);
            continue;
        }

        let segment = segments::normalize(segment_raw);
        out.push(ResolvedInstrument {
            query: entry.to_string(),
            security_id: id.to_string(),
            display_name: format!("{}:{}", segment, id),
            segment,
        });
    }
    out
}
