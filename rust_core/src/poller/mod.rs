//! Fixed-interval LTP polling loop.
//!
//! One cycle: fetch prices for every tracked instrument (with retry), classify
//! each instrument as priced or unavailable, run the alert policy, update
//! [`PollState`], then format and dispatch one message. Cycles never overlap.

pub mod retry;
pub mod snapshot;
pub mod state;

use crate::alerts::AlertPolicy;
use crate::clients::{NotificationSink, PriceFeed};
use crate::formatters::NotificationFormatter;
use crate::models::{Observation, PriceChange, Reading, ResolvedInstrument};
use chrono::{DateTime, Utc};
use retry::{execute_with_retry, RetryPolicy};
use snapshot::{build_payload, PricePayload, PriceSnapshot};
use state::PollState;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub retry: RetryPolicy,
    /// List instruments without a price in the message
    pub report_unavailable: bool,
    pub send_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            report_unavailable: true,
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// What one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub at: DateTime<Utc>,
    pub observations: Vec<Observation>,
    pub message: Option<String>,
    pub delivered: bool,
}

impl CycleReport {
    pub fn accepted(&self) -> usize {
        self.observations.iter().filter(|o| o.accepted).count()
    }

    pub fn unavailable(&self) -> usize {
        self.observations.iter().filter(|o| o.is_unavailable()).count()
    }
}

pub struct PricePoller {
    instruments: Vec<ResolvedInstrument>,
    payload: PricePayload,
    feed: Arc<dyn PriceFeed>,
    fallback: Option<Arc<dyn PriceFeed>>,
    sink: Arc<dyn NotificationSink>,
    policy: AlertPolicy,
    formatter: NotificationFormatter,
    cfg: PollerConfig,
    state: PollState,
}

impl PricePoller {
    pub fn new(
        instruments: Vec<ResolvedInstrument>,
        feed: Arc<dyn PriceFeed>,
        sink: Arc<dyn NotificationSink>,
        policy: AlertPolicy,
        formatter: NotificationFormatter,
        cfg: PollerConfig,
    ) -> Self {
        let payload = build_payload(&instruments);
        Self {
            instruments,
            payload,
            feed,
            fallback: None,
            sink,
            policy,
            formatter,
            cfg,
            state: PollState::new(),
        }
    }

    /// Second feed asked once per cycle for instruments the main feed missed.
    pub fn with_fallback(mut self, fallback: Arc<dyn PriceFeed>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Fetch and classify one round of prices.
    ///
    /// Returns no observations when every fetch attempt failed. Prices are
    /// recorded for every priced instrument whether or not the alert policy
    /// accepts it.
    pub async fn poll_once(&mut self, now: Instant) -> Vec<Observation> {
        let snapshot = match self.fetch_prices().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Price fetch gave up for this cycle: {:#}", e);
                return Vec::new();
            }
        };
        let snapshot = self.fill_gaps(snapshot).await;

        let mut observations = Vec::with_capacity(self.instruments.len());
        for inst in &self.instruments {
            let key = inst.key();
            let Some(price) = snapshot.price(&key) else {
                debug!("No price for {} ({})", key, inst.display_name);
                observations.push(Observation {
                    key,
                    reading: Reading::Unavailable,
                    accepted: false,
                });
                continue;
            };

            let change = self
                .state
                .last_price(&key)
                .map(|previous| PriceChange::between(previous, price));

            let (accepted, reason) =
                self.policy
                    .should_notify(change.as_ref(), self.state.last_accepted(&key), now);
            if accepted {
                self.state.record_accepted(&key, now);
            } else if let Some(reason) = reason {
                debug!("Suppressed {} @ {}: {}", inst.display_name, price, reason);
            }
            self.state.record_price(&key, price);

            observations.push(Observation {
                key,
                reading: Reading::Priced { price, change },
                accepted,
            });
        }

        observations
    }

    /// Poll, format and dispatch.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let at = Utc::now();
        let observations = self.poll_once(Instant::now()).await;

        let message = if self.cfg.report_unavailable {
            self.formatter.format(&self.instruments, &observations, at)
        } else {
            let priced: Vec<Observation> = observations
                .iter()
                .filter(|o| !o.is_unavailable())
                .cloned()
                .collect();
            self.formatter.format(&self.instruments, &priced, at)
        };

        let delivered = match &message {
            Some(text) => self.deliver(text).await,
            None => {
                debug!("Nothing to notify this cycle");
                false
            }
        };

        CycleReport {
            at,
            observations,
            message,
            delivered,
        }
    }

    /// Run cycles until `shutdown` resolves. A cycle in progress is abandoned
    /// on shutdown; no state is flushed.
    pub async fn run<S>(&mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Polling {} instruments every {:?}",
            self.instruments.len(),
            self.cfg.interval
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested during cycle {}", cycle);
                    break;
                }
                report = self.run_cycle() => {
                    info!(
                        "Cycle {}: {} observations, {} accepted, {} unavailable, delivered={}",
                        cycle,
                        report.observations.len(),
                        report.accepted(),
                        report.unavailable(),
                        report.delivered
                    );
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poller");
                    break;
                }
                _ = tokio::time::sleep(self.cfg.interval) => {}
            }
        }
    }

    async fn fetch_prices(&self) -> anyhow::Result<PriceSnapshot> {
        let feed = &self.feed;
        let payload = &self.payload;
        let what = format!("{} LTP fetch", feed.provider_name());
        execute_with_retry(&self.cfg.retry, &what, || feed.fetch(payload)).await
    }

    async fn fill_gaps(&self, mut snapshot: PriceSnapshot) -> PriceSnapshot {
        let Some(fallback) = &self.fallback else {
            return snapshot;
        };
        let missing = snapshot.missing(&self.payload);
        if missing.is_empty() {
            return snapshot;
        }

        debug!(
            "Asking {} for {} segments missing from the LTP reply",
            fallback.provider_name(),
            missing.len()
        );
        let what = format!("{} fallback fetch", fallback.provider_name());
        match execute_with_retry(&self.cfg.retry, &what, || fallback.fetch(&missing)).await {
            Ok(extra) => snapshot.fill_from(&extra),
            Err(e) => warn!("Fallback fetch failed, keeping gaps: {:#}", e),
        }
        snapshot
    }

    async fn deliver(&self, text: &str) -> bool {
        match tokio::time::timeout(self.cfg.send_timeout, self.sink.send(text)).await {
            Ok(Ok(())) => {
                debug!("Delivered {} chars via {}", text.len(), self.sink.sink_name());
                true
            }
            Ok(Err(e)) => {
                warn!("{} send failed: {:#}", self.sink.sink_name(), e);
                false
            }
            Err(_) => {
                warn!(
                    "{} send timed out after {:?}",
                    self.sink.sink_name(),
                    self.cfg.send_timeout
                );
                false
            }
        }
    }
}
