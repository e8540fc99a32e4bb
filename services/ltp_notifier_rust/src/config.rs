use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use ltpwatch_core::alerts::AlertConfig;
use ltpwatch_core::clients::scrip_master::DEFAULT_SCRIP_MASTER_URL;
use ltpwatch_core::clients::{dhan, telegram};
use ltpwatch_core::formatters::MessageStyle;
use ltpwatch_core::matching::aliases::AliasTable;
use ltpwatch_core::matching::{similarity, ResolverOptions, DEFAULT_CUTOFF};
use ltpwatch_core::poller::retry::RetryPolicy;
use ltpwatch_core::poller::PollerConfig;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SYMBOLS: &str = "NIFTY 50,BANKNIFTY,SENSEX,TATAMOTORS,RELIANCE,TCS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// CSV over HTTP(S) or from a local path
    Remote(String),
    Builtin,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Clone)]
pub struct Config {
    pub symbols: Vec<String>,
    pub security_ids: String,
    pub reference_source: ReferenceSource,
    pub reference_timeout: Duration,

    pub dhan_api_base: String,
    pub dhan_token: String,
    pub dhan_client_id: String,

    pub resolver: ResolverOptions,
    pub poller: PollerConfig,
    pub alerts: AlertConfig,
    pub ohlc_fallback: bool,

    pub telegram: Option<TelegramConfig>,
    pub message_style: MessageStyle,
    pub display_timezone: Tz,

    pub run_once: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let symbols = parse_list_env(vars, "SYMBOLS", DEFAULT_SYMBOLS);
        let security_ids = get(vars, "SECURITY_IDS").unwrap_or_default();
        if symbols.is_empty() && security_ids.trim().is_empty() {
            return Err(anyhow!("SYMBOLS or SECURITY_IDS must name at least one instrument"));
        }

        let reference_source = match get(vars, "REFERENCE_SOURCE")
            .unwrap_or_else(|| "remote".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "remote" => ReferenceSource::Remote(
                get(vars, "SCRIP_MASTER_URL").unwrap_or_else(|| DEFAULT_SCRIP_MASTER_URL.to_string()),
            ),
            "builtin" => ReferenceSource::Builtin,
            other => return Err(anyhow!("Invalid REFERENCE_SOURCE: {other} (expected remote|builtin)")),
        };
        let reference_timeout =
            Duration::from_secs(parse_u64_env(vars, "REFERENCE_TIMEOUT_SECS", 30)?);

        let dhan_api_base =
            get(vars, "DHAN_API_BASE").unwrap_or_else(|| dhan::DEFAULT_API_BASE.to_string());
        let dhan_token = get(vars, "DHAN_TOKEN").context("DHAN_TOKEN must be set")?;
        let dhan_client_id = get(vars, "DHAN_CLIENT_ID").context("DHAN_CLIENT_ID must be set")?;

        // Resolution
        let mut aliases = AliasTable::builtin();
        if let Some(pairs) = get(vars, "SYMBOL_ALIASES") {
            let rejected = aliases.extend_from_pairs(&pairs);
            if !rejected.is_empty() {
                return Err(anyhow!(
                    "Invalid SYMBOL_ALIASES entries: {} (expected ALIAS=TARGET;...)",
                    rejected.join("; ")
                ));
            }
        }
        let cutoff = parse_f64_env(vars, "MATCH_CUTOFF", DEFAULT_CUTOFF)?;
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(anyhow!("MATCH_CUTOFF must be between 0 and 1"));
        }
        let similarity_name =
            get(vars, "SIMILARITY").unwrap_or_else(|| "jaro_winkler".to_string());
        if similarity::by_name(&similarity_name).is_none() {
            return Err(anyhow!(
                "Invalid SIMILARITY: {similarity_name} (expected jaro_winkler|levenshtein)"
            ));
        }
        let resolver = ResolverOptions {
            cutoff,
            best_effort: parse_bool_env(vars, "BEST_EFFORT_RESOLVE", false),
            aliases,
            similarity: similarity_name,
        };

        // Polling
        let interval_secs = parse_u64_env(vars, "POLL_INTERVAL", 60)?;
        if interval_secs < 1 {
            return Err(anyhow!("POLL_INTERVAL must be >= 1"));
        }
        let max_attempts = parse_u64_env(vars, "FETCH_MAX_ATTEMPTS", 3)?;
        if max_attempts < 1 {
            return Err(anyhow!("FETCH_MAX_ATTEMPTS must be >= 1"));
        }
        let retry = RetryPolicy {
            max_attempts: u32::try_from(max_attempts)
                .map_err(|_| anyhow!("FETCH_MAX_ATTEMPTS is too large"))?,
            base_delay: Duration::from_secs(parse_u64_env(vars, "FETCH_BACKOFF_BASE_SECS", 1)?),
            step: Duration::from_secs(parse_u64_env(vars, "FETCH_BACKOFF_STEP_SECS", 2)?),
            attempt_timeout: Duration::from_secs(parse_u64_env(vars, "FETCH_TIMEOUT_SECS", 10)?),
        };
        let poller = PollerConfig {
            interval: Duration::from_secs(interval_secs),
            send_timeout: retry.attempt_timeout,
            retry,
            report_unavailable: parse_bool_env(vars, "REPORT_UNAVAILABLE", true),
        };

        let threshold_pct = parse_f64_env(vars, "ALERT_THRESHOLD_PCT", 0.0)?;
        if threshold_pct < 0.0 {
            return Err(anyhow!("ALERT_THRESHOLD_PCT must be >= 0"));
        }
        let alerts = AlertConfig {
            threshold_pct,
            cooldown: Duration::from_secs(parse_u64_env(vars, "ALERT_COOLDOWN_SECS", 0)?),
        };

        // Delivery
        let telegram = match (get(vars, "TELEGRAM_BOT_TOKEN"), get(vars, "TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                api_base: get(vars, "TELEGRAM_API_BASE")
                    .unwrap_or_else(|| telegram::DEFAULT_API_BASE.to_string()),
                bot_token,
                chat_id,
            }),
            _ => None,
        };

        let format_raw = get(vars, "MESSAGE_FORMAT").unwrap_or_else(|| "html".to_string());
        let message_style = MessageStyle::parse(&format_raw)
            .ok_or_else(|| anyhow!("Invalid MESSAGE_FORMAT: {format_raw} (expected html|plain)"))?;

        let tz_raw = get(vars, "DISPLAY_TIMEZONE").unwrap_or_else(|| "Asia/Kolkata".to_string());
        let display_timezone = Tz::from_str(tz_raw.trim()).map_err(|_| {
            anyhow!("Invalid DISPLAY_TIMEZONE: {tz_raw} (expected IANA tz like Asia/Kolkata)")
        })?;

        Ok(Self {
            symbols,
            security_ids,
            reference_source,
            reference_timeout,
            dhan_api_base,
            dhan_token,
            dhan_client_id,
            resolver,
            poller,
            alerts,
            ohlc_fallback: parse_bool_env(vars, "OHLC_FALLBACK", false),
            telegram,
            message_style,
            display_timezone,
            run_once: parse_bool_env(vars, "RUN_ONCE", false),
        })
    }
}

/// Non-empty, trimmed value of `key`.
fn get(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list_env(vars: &HashMap<String, String>, key: &str, default: &str) -> Vec<String> {
    let raw = vars.get(key).cloned().unwrap_or_else(|| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool_env(vars: &HashMap<String, String>, key: &str, default: bool) -> bool {
    get(vars, key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

fn parse_u64_env(vars: &HashMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match get(vars, key) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("Invalid {key}: {raw} (expected non-negative integer)")),
        None => Ok(default),
    }
}

fn parse_f64_env(vars: &HashMap<String, String>, key: &str, default: f64) -> Result<f64> {
    match get(vars, key) {
        Some(raw) => {
            let value = raw
                .parse::<f64>()
                .with_context(|| format!("Invalid {key}: {raw} (expected number)"))?;
            if !value.is_finite() {
                return Err(anyhow!("Invalid {key}: {raw} (expected finite number)"));
            }
            Ok(value)
        }
        None => Ok(default),
    }
}
