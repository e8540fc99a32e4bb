//! Pipeline Tests
//!
//! Reference table -> resolver -> poller -> formatter, with in-memory feeds
//! and sinks. No network access required.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ltpwatch_core::alerts::AlertConfig;
use ltpwatch_core::clients::{NotificationSink, PriceFeed};
use ltpwatch_core::formatters::{MessageStyle, NotificationFormatter};
use ltpwatch_core::master::{MasterIndex, ReferenceTable};
use ltpwatch_core::matching::{resolve_queries, Resolution, Resolver};
use ltpwatch_core::models::{InstrumentKey, ResolvedInstrument};
use ltpwatch_core::poller::retry::RetryPolicy;
use ltpwatch_core::poller::snapshot::{PricePayload, PriceSnapshot};
use ltpwatch_core::poller::{PollerConfig, PricePoller};
use ltpwatch_core::AlertPolicy;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Fakes
// ============================================================================

/// Replays canned replies in order; `None` fails the call.
struct ReplayFeed {
    replies: Mutex<VecDeque<Option<Value>>>,
    calls: AtomicUsize,
}

impl ReplayFeed {
    fn new(replies: Vec<Option<Value>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for ReplayFeed {
    fn provider_name(&self) -> &str {
        "replay"
    }

    async fn fetch(&self, _payload: &PricePayload) -> Result<PriceSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front().flatten();
        match next {
            Some(reply) => PriceSnapshot::from_json(&reply),
            None => Err(anyhow!("feed unavailable")),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn sink_name(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn tcs_table() -> ReferenceTable {
    ReferenceTable::from_mappings(&[vec![
        ("trad", "TCS"),
        ("name", "TATA CONSULTANCY"),
        ("sid", "11536"),
        ("seg", "E"),
    ]])
}

fn equity_table() -> ReferenceTable {
    ReferenceTable::from_mappings(&[
        vec![
            ("SEM_TRADING_SYMBOL", "TCS"),
            ("SM_SYMBOL_NAME", "TATA CONSULTANCY SERV LT"),
            ("SEM_SMST_SECURITY_ID", "11536"),
            ("SEM_EXM_EXCH_ID", "NSE"),
        ],
        vec![
            ("SEM_TRADING_SYMBOL", "INFY"),
            ("SM_SYMBOL_NAME", "INFOSYS LIMITED"),
            ("SEM_SMST_SECURITY_ID", "1594"),
            ("SEM_EXM_EXCH_ID", "NSE"),
        ],
        vec![
            ("SEM_TRADING_SYMBOL", "RELIANCE"),
            ("SM_SYMBOL_NAME", "RELIANCE INDUSTRIES LTD"),
            ("SEM_SMST_SECURITY_ID", "2885"),
            ("SEM_EXM_EXCH_ID", "NSE"),
        ],
    ])
}

fn resolve_all(index: &MasterIndex, queries: &[&str]) -> Resolution {
    let resolver = Resolver::new(index);
    let queries: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
    let mut resolution = Resolution::default();
    resolve_queries(&resolver, &queries, &mut resolution);
    resolution
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(1),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
            attempt_timeout: Duration::from_secs(1),
        },
        report_unavailable: true,
        send_timeout: Duration::from_secs(1),
    }
}

fn build_poller(
    instruments: Vec<ResolvedInstrument>,
    feed: Arc<ReplayFeed>,
    sink: Arc<RecordingSink>,
    alerts: AlertConfig,
) -> PricePoller {
    PricePoller::new(
        instruments,
        feed,
        sink,
        AlertPolicy::new(alerts),
        NotificationFormatter::new(MessageStyle::Plain, chrono_tz::Asia::Kolkata),
        fast_config(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_first_cycle_reports_price_without_delta() {
    let index = MasterIndex::build(&tcs_table()).unwrap();
    let resolution = resolve_all(&index, &["TCS"]);
    assert_eq!(resolution.instruments.len(), 1);
    assert_eq!(
        resolution.instruments[0].key(),
        InstrumentKey::new("NSE_EQ", "11536")
    );

    let feed = Arc::new(ReplayFeed::new(vec![Some(
        json!({"NSE_EQ": {"11536": {"last_price": 100}}}),
    )]));
    let sink = Arc::new(RecordingSink::default());
    let mut poller = build_poller(
        resolution.instruments,
        feed,
        sink.clone(),
        AlertConfig::default(),
    );

    let report = poller.run_cycle().await;
    assert_eq!(report.observations.len(), 1);
    assert_eq!(report.accepted(), 1);
    assert!(report.delivered);

    let message = report.message.unwrap();
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("LTP Update"));
    assert_eq!(lines[1], "TCS (NSE_EQ): 100");

    assert_eq!(sink.sent.lock().unwrap().as_slice(), &[message.clone()]);
}

#[tokio::test]
async fn test_exhausted_retries_yield_empty_cycle() {
    let index = MasterIndex::build(&tcs_table()).unwrap();
    let resolution = resolve_all(&index, &["TCS"]);

    let feed = Arc::new(ReplayFeed::new(Vec::new()));
    let sink = Arc::new(RecordingSink::default());
    let mut poller = build_poller(
        resolution.instruments,
        feed.clone(),
        sink.clone(),
        AlertConfig::default(),
    );

    let report = poller.run_cycle().await;
    assert!(report.observations.is_empty());
    assert!(report.message.is_none());
    assert!(!report.delivered);
    assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    assert!(sink.sent.lock().unwrap().is_empty());

    // The next cycle tries again from scratch
    poller.run_cycle().await;
    assert_eq!(feed.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_threshold_and_cooldown_sequence() {
    let index = MasterIndex::build(&tcs_table()).unwrap();
    let resolution = resolve_all(&index, &["TCS"]);
    let key = InstrumentKey::new("NSE_EQ", "11536");

    let replies = [100.0, 100.5, 102.51, 104.6]
        .iter()
        .map(|p| Some(json!({"NSE_EQ": {"11536": {"last_price": p}}})))
        .collect();
    let feed = Arc::new(ReplayFeed::new(replies));
    let sink = Arc::new(RecordingSink::default());
    let mut poller = build_poller(
        resolution.instruments,
        feed,
        sink,
        AlertConfig {
            threshold_pct: 1.0,
            cooldown: Duration::from_secs(3600),
        },
    );

    let start = Instant::now();

    // First sight counts as a 0% move
    let obs = poller.poll_once(start).await;
    assert!(!obs[0].accepted);
    assert!(obs[0].change().is_none());

    // 0.5%
    let obs = poller.poll_once(start + Duration::from_secs(60)).await;
    assert!(!obs[0].accepted);

    // 2.0%
    let obs = poller.poll_once(start + Duration::from_secs(120)).await;
    assert!(obs[0].accepted);
    let change = obs[0].change().unwrap();
    assert!((change.percent - 2.0).abs() < 1e-9);

    // Above threshold but inside the cooldown window
    let obs = poller.poll_once(start + Duration::from_secs(180)).await;
    assert!(!obs[0].accepted);
    assert_eq!(poller.state().last_price(&key), Some(104.6));
    assert_eq!(
        poller.state().last_accepted(&key),
        Some(start + Duration::from_secs(120))
    );
}

#[tokio::test]
async fn test_unavailable_instrument_listed_next_to_priced_one() {
    let index = MasterIndex::build(&equity_table()).unwrap();
    let resolution = resolve_all(&index, &["INFY", "TCS"]);

    let feed = Arc::new(ReplayFeed::new(vec![Some(json!({
        "data": {"NSE_EQ": {"11536": {"last_price": "3890.25"}, "1594": {"last_price": null}}},
        "status": "success"
    }))]));
    let sink = Arc::new(RecordingSink::default());
    let mut poller = build_poller(
        resolution.instruments,
        feed,
        sink,
        AlertConfig::default(),
    );

    let report = poller.run_cycle().await;
    assert_eq!(report.unavailable(), 1);
    let message = report.message.unwrap();
    let lines: Vec<&str> = message.lines().skip(1).collect();
    assert_eq!(lines, vec!["INFY (NSE_EQ): (No Data)", "TCS (NSE_EQ): 3890.25"]);
}

#[test]
fn test_resolution_is_order_independent() {
    let index = MasterIndex::build(&equity_table()).unwrap();

    let forward = resolve_all(&index, &["TCS", "INFY", "RELIANCE"]);
    let backward = resolve_all(&index, &["RELIANCE", "INFY", "TCS"]);

    let a: HashSet<InstrumentKey> = forward.instruments.iter().map(|i| i.key()).collect();
    let b: HashSet<InstrumentKey> = backward.instruments.iter().map(|i| i.key()).collect();
    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
}

#[test]
fn test_queries_for_same_instrument_are_tracked_once() {
    let index = MasterIndex::build(&equity_table()).unwrap();

    let resolution = resolve_all(&index, &["TCS", "tcs", "TATA CONSULTANCY SERV LT"]);
    assert_eq!(resolution.instruments.len(), 1);
    assert_eq!(resolution.instruments[0].query, "TCS");
    assert_eq!(resolution.duplicates.len(), 2);
    assert!(resolution.unresolved.is_empty());
}
