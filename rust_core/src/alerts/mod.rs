//! Alert suppression for priced observations.
//!
//! Two independent gates, both disabled at zero:
//! - a percent-change threshold (no prior price counts as a 0% move)
//! - a per-instrument cooldown since the last accepted notification

use crate::models::PriceChange;
use std::time::{Duration, Instant};

/// Slack for float noise in percent moves (3.00 -> 3.03 is 0.99999...%).
const PERCENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlertConfig {
    /// Minimum absolute percent move; 0 disables
    pub threshold_pct: f64,
    /// Minimum time between accepted notifications per instrument; 0 disables
    pub cooldown: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    cfg: AlertConfig,
}

impl AlertPolicy {
    pub fn new(cfg: AlertConfig) -> Self {
        Self { cfg }
    }

    /// Decide whether an observation is notification-worthy.
    ///
    /// `change` is `None` when the instrument has no prior price;
    /// `last_accepted` is when this instrument was last accepted, if ever.
    /// Returns the suppression reason when rejected.
    pub fn should_notify(
        &self,
        change: Option<&PriceChange>,
        last_accepted: Option<Instant>,
        now: Instant,
    ) -> (bool, Option<String>) {
        if self.cfg.threshold_pct > 0.0 {
            let magnitude = change.map(|c| c.percent.abs()).unwrap_or(0.0);
            if magnitude + PERCENT_EPSILON < self.cfg.threshold_pct {
                return (
                    false,
                    Some(format!(
                        "below_threshold({:.2}%<{:.2}%)",
                        magnitude, self.cfg.threshold_pct
                    )),
                );
            }
        }

        if !self.cfg.cooldown.is_zero() {
            if let Some(last) = last_accepted {
                if now.saturating_duration_since(last) < self.cfg.cooldown {
                    return (false, Some("cooldown".to_string()));
                }
            }
        }

        (true, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(threshold_pct: f64, cooldown_secs: u64) -> AlertPolicy {
        AlertPolicy::new(AlertConfig {
            threshold_pct,
            cooldown: Duration::from_secs(cooldown_secs),
        })
    }

    #[test]
    fn test_disabled_policy_accepts_everything() {
        let p = policy(0.0, 0);
        let now = Instant::now();
        assert!(p.should_notify(None, None, now).0);
        assert!(p.should_notify(Some(&PriceChange::between(100.0, 100.0)), Some(now), now).0);
    }

    #[test]
    fn test_first_observation_suppressed_with_threshold() {
        let (ok, reason) = policy(1.0, 0).should_notify(None, None, Instant::now());
        assert!(!ok);
        assert!(reason.unwrap().starts_with("below_threshold"));
    }

    #[test]
    fn test_threshold_uses_magnitude() {
        let p = policy(1.0, 0);
        let now = Instant::now();
        assert!(!p.should_notify(Some(&PriceChange::between(100.0, 100.5)), None, now).0);
        assert!(p.should_notify(Some(&PriceChange::between(100.0, 98.0)), None, now).0);
        assert!(p.should_notify(Some(&PriceChange::between(100.0, 101.0)), None, now).0);
    }

    #[test]
    fn test_move_equal_to_threshold_is_accepted() {
        let p = policy(1.0, 0);
        let change = PriceChange::between(3.0, 3.03);
        assert_eq!(p.should_notify(Some(&change), None, Instant::now()), (true, None));
        assert!(!p.should_notify(Some(&PriceChange::between(3.0, 3.0299)), None, Instant::now()).0);
    }

    #[test]
    fn test_zero_prior_price_counts_as_no_move() {
        // percent is forced to 0 when the previous price is 0
        let p = policy(1.0, 0);
        assert!(!p.should_notify(Some(&PriceChange::between(0.0, 50.0)), None, Instant::now()).0);
    }

    #[test]
    fn test_cooldown_window() {
        let p = policy(0.0, 60);
        let t0 = Instant::now();
        let big = PriceChange::between(100.0, 150.0);

        assert!(p.should_notify(Some(&big), None, t0).0);
        let (ok, reason) = p.should_notify(Some(&big), Some(t0), t0 + Duration::from_secs(30));
        assert!(!ok);
        assert_eq!(reason.as_deref(), Some("cooldown"));
        assert!(p.should_notify(Some(&big), Some(t0), t0 + Duration::from_secs(60)).0);
    }
}
