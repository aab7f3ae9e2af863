//! # notify — alert dispatch collaborators
//!
//! The pipeline hands a finished [`AlertCard`] plus a one-line header to a
//! [`Dispatch`] sink and moves on. A dispatch failure is logged by the
//! caller and never rolls back the alert budget.
//!
//! [`TelegramDispatcher`] is the real transport; when `TELEGRAM_TOKEN` /
//! `TELEGRAM_CHAT_ID` are unset the scanner falls back to
//! [`LogDispatcher`] so local runs still show what would have been sent.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::alert::AlertCard;

pub trait Dispatch {
    async fn dispatch(&self, header: &str, card: &AlertCard) -> anyhow::Result<()>;
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TelegramDispatcher {
    client:  reqwest::Client,
    token:   String,
    chat_id: String,
}

impl TelegramDispatcher {
    pub fn new(client: reqwest::Client, token: String, chat_id: String) -> Self {
        Self { client, token, chat_id }
    }
}

impl Dispatch for TelegramDispatcher {
    async fn dispatch(&self, header: &str, card: &AlertCard) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let payload = serde_json::to_string(card).context("card serialization failed")?;
        let text = format!("{header}\n\nJSON👇\n{payload}");

        let resp = self
            .client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text.as_str())])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .context("Telegram API unreachable")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram rejected alert: HTTP {status}: {body}");
        }

        info!(symbol = %card.symbol, "Telegram alert sent ✅");
        Ok(())
    }
}

// ─── Log-only fallback ────────────────────────────────────────────────────────

/// Prints the card instead of sending it. Used when Telegram credentials are
/// absent, and by dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl Dispatch for LogDispatcher {
    async fn dispatch(&self, header: &str, card: &AlertCard) -> anyhow::Result<()> {
        let payload = serde_json::to_string_pretty(card)?;
        info!(symbol = %card.symbol, "{header}\n{payload}");
        Ok(())
    }
}

// ─── Runtime selection ────────────────────────────────────────────────────────

/// Transport picked from the environment at startup.
#[derive(Debug, Clone)]
pub enum Notifier {
    Telegram(TelegramDispatcher),
    Log(LogDispatcher),
}

impl Notifier {
    pub fn from_env(client: reqwest::Client) -> Self {
        match (
            std::env::var("TELEGRAM_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        ) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Notifier::Telegram(TelegramDispatcher::new(client, token, chat_id))
            }
            _ => {
                warn!("TELEGRAM_TOKEN / TELEGRAM_CHAT_ID not set — alerts go to the log only");
                Notifier::Log(LogDispatcher)
            }
        }
    }
}

impl Dispatch for Notifier {
    async fn dispatch(&self, header: &str, card: &AlertCard) -> anyhow::Result<()> {
        match self {
            Notifier::Telegram(t) => t.dispatch(header, card).await,
            Notifier::Log(l) => l.dispatch(header, card).await,
        }
    }
}
