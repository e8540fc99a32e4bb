use crate::models::{InstrumentKey, Observation, ResolvedInstrument};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageStyle {
    Plain,
    /// Telegram HTML parse mode: bold labels, escaped names
    #[default]
    Html,
}

impl MessageStyle {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "html" => Some(Self::Html),
            "plain" | "text" => Some(Self::Plain),
            _ => None,
        }
    }
}

/// Renders one cycle's observations as a single message.
#[derive(Debug, Clone)]
pub struct NotificationFormatter {
    style: MessageStyle,
    tz: Tz,
}

impl NotificationFormatter {
    pub fn new(style: MessageStyle, tz: Tz) -> Self {
        Self { style, tz }
    }

    /// Build the message, or `None` when no observation earns a line.
    ///
    /// Lines follow `instruments` order. Accepted priced observations and
    /// unavailable ones are listed; suppressed ones are not.
    pub fn format(
        &self,
        instruments: &[ResolvedInstrument],
        observations: &[Observation],
        at: DateTime<Utc>,
    ) -> Option<String> {
        let by_key: HashMap<&InstrumentKey, &Observation> =
            observations.iter().map(|o| (&o.key, o)).collect();

        let lines: Vec<String> = instruments
            .iter()
            .filter_map(|inst| {
                let obs = by_key.get(&inst.key())?;
                if obs.is_unavailable() {
                    Some(format!("{}: (No Data)", self.label(inst)))
                } else if obs.accepted {
                    self.priced_line(inst, obs)
                } else {
                    None
                }
            })
            .collect();

        if lines.is_empty() {
            return None;
        }

        let mut out = self.header(at);
        for line in lines {
            out.push('\n');
            out.push_str(&line);
        }
        Some(out)
    }

    fn header(&self, at: DateTime<Utc>) -> String {
        let stamp = at.with_timezone(&self.tz).format("%Y-%m-%d %H:%M:%S %Z");
        match self.style {
            MessageStyle::Plain => format!("LTP Update • {stamp}"),
            MessageStyle::Html => format!("<b>LTP Update • {stamp}</b>"),
        }
    }

    fn label(&self, inst: &ResolvedInstrument) -> String {
        match self.style {
            MessageStyle::Plain => format!("{} ({})", inst.display_name, inst.segment),
            MessageStyle::Html => format!(
                "<b>{} ({})</b>",
                escape_html(&inst.display_name),
                escape_html(&inst.segment)
            ),
        }
    }

    fn priced_line(&self, inst: &ResolvedInstrument, obs: &Observation) -> Option<String> {
        let price = obs.price()?;
        let mut line = format!("{}: {}", self.label(inst), format_price(price));
        if let Some(change) = obs.change() {
            line.push_str(&format!(" ({:+.2}, {:+.2}%)", change.delta, change.percent));
        }
        Some(line)
    }
}

/// Up to two decimals, trailing zeros trimmed (`100`, `4520.5`, `0.05`).
pub fn format_price(price: f64) -> String {
    let fixed = format!("{price:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceChange, Reading};
    use chrono::TimeZone;

    fn inst(name: &str, segment: &str, id: &str) -> ResolvedInstrument {
        ResolvedInstrument {
            query: name.to_string(),
            security_id: id.to_string(),
            segment: segment.to_string(),
            display_name: name.to_string(),
        }
    }

    fn priced(segment: &str, id: &str, price: f64, prev: Option<f64>, accepted: bool) -> Observation {
        Observation {
            key: InstrumentKey::new(segment, id),
            reading: Reading::Priced {
                price,
                change: prev.map(|p| PriceChange::between(p, price)),
            },
            accepted,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap()
    }

    #[test]
    fn test_plain_first_observation_has_no_delta() {
        let f = NotificationFormatter::new(MessageStyle::Plain, chrono_tz::Asia::Kolkata);
        let msg = f
            .format(
                &[inst("TCS", "NSE_EQ", "11536")],
                &[priced("NSE_EQ", "11536", 100.0, None, true)],
                at(),
            )
            .unwrap();

        let mut lines = msg.lines();
        assert_eq!(lines.next(), Some("LTP Update • 2024-03-01 09:30:00 IST"));
        assert_eq!(lines.next(), Some("TCS (NSE_EQ): 100"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_signed_change_and_instrument_order() {
        let f = NotificationFormatter::new(MessageStyle::Plain, chrono_tz::UTC);
        let instruments = vec![inst("NIFTY 50", "IDX_I", "13"), inst("TCS", "NSE_EQ", "11536")];
        // Reply order is reversed; output follows the instrument list
        let observations = vec![
            priced("NSE_EQ", "11536", 110.0, Some(100.0), true),
            priced("IDX_I", "13", 95.5, Some(100.0), true),
        ];

        let msg = f.format(&instruments, &observations, at()).unwrap();
        let lines: Vec<&str> = msg.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec!["NIFTY 50 (IDX_I): 95.5 (-4.50, -4.50%)", "TCS (NSE_EQ): 110 (+10.00, +10.00%)"]
        );
    }

    #[test]
    fn test_suppressed_lines_skipped_and_unavailable_flagged() {
        let f = NotificationFormatter::new(MessageStyle::Plain, chrono_tz::UTC);
        let instruments = vec![inst("A", "NSE_EQ", "1"), inst("B", "NSE_EQ", "2")];
        let observations = vec![
            priced("NSE_EQ", "1", 10.0, Some(10.0), false),
            Observation {
                key: InstrumentKey::new("NSE_EQ", "2"),
                reading: Reading::Unavailable,
                accepted: false,
            },
        ];

        let msg = f.format(&instruments, &observations, at()).unwrap();
        assert!(!msg.contains("A (NSE_EQ)"));
        assert!(msg.ends_with("B (NSE_EQ): (No Data)"));
    }

    #[test]
    fn test_nothing_to_report() {
        let f = NotificationFormatter::new(MessageStyle::Html, chrono_tz::UTC);
        let instruments = vec![inst("A", "NSE_EQ", "1")];
        assert!(f.format(&instruments, &[], at()).is_none());
        assert!(f
            .format(&instruments, &[priced("NSE_EQ", "1", 1.0, None, false)], at())
            .is_none());
    }

    #[test]
    fn test_html_escapes_and_bolds() {
        let f = NotificationFormatter::new(MessageStyle::Html, chrono_tz::UTC);
        let msg = f
            .format(
                &[inst("M&M", "NSE_EQ", "2031")],
                &[priced("NSE_EQ", "2031", 2875.25, None, true)],
                at(),
            )
            .unwrap();
        assert!(msg.starts_with("<b>LTP Update • 2024-03-01 04:00:00 UTC</b>"));
        assert!(msg.ends_with("<b>M&amp;M (NSE_EQ)</b>: 2875.25"));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(100.0), "100");
        assert_eq!(format_price(4520.5), "4520.5");
        assert_eq!(format_price(0.05), "0.05");
        assert_eq!(format_price(12.345678), "12.35");
        assert_eq!(format_price(0.0), "0");
    }

    #[test]
    fn test_message_style_parse() {
        assert_eq!(MessageStyle::parse("HTML"), Some(MessageStyle::Html));
        assert_eq!(MessageStyle::parse("plain"), Some(MessageStyle::Plain));
        assert_eq!(MessageStyle::parse("markdown"), None);
    }
}
