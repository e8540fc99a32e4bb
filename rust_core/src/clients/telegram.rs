use super::NotificationSink;
use crate::formatters::MessageStyle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects texts above 4096 characters; stay below that.
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    style: MessageStyle,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

impl TelegramClient {
    pub fn new(
        api_base: &str,
        bot_token: String,
        chat_id: String,
        style: MessageStyle,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            style,
        })
    }

    async fn send_one(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: match self.style {
                MessageStyle::Html => Some("HTML"),
                MessageStyle::Plain => None,
            },
            disable_web_page_preview: true,
        };

        // The URL embeds the bot token; keep it out of error messages
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Telegram API request failed: {}", e.without_url()))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Telegram API non-2xx: {status} body={text}");
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    fn sink_name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.send_one(&chunk).await?;
        }
        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters, breaking on line
/// boundaries. A single line longer than `limit` is cut by characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };

        if needed <= limit {
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_single_chunk() {
        assert_eq!(split_message("a\nb", 4000), vec!["a\nb".to_string()]);
        assert!(split_message("", 4000).is_empty());
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 9));
    }

    #[test]
    fn test_overlong_line_is_cut() {
        let chunks = split_message("ab\ncdefghij\nk", 4);
        assert_eq!(chunks, vec!["ab", "cdef", "ghij", "k"]);
    }

    #[test]
    fn test_request_omits_parse_mode_for_plain() {
        let body = SendMessageRequest {
            chat_id: "42",
            text: "hi",
            parse_mode: None,
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("parse_mode").is_none());
        assert_eq!(json["chat_id"], "42");
    }
}
