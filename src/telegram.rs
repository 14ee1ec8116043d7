use serde::Deserialize;
use tracing::{error, info};

use crate::config::DEFAULT_TELEGRAM_API_BASE;
use crate::report::RestartTally;
use crate::types::{AccountConfig, OperationResult, TelegramMessage};

#[derive(Debug, Deserialize)]
struct SendMessageReply {
    #[serde(default)]
    ok: bool,
}

/// Sends per-account notifications through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    api_base: String,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TELEGRAM_API_BASE)
    }
}

impl Notifier {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Returns `true` only when Telegram acknowledges the message. Never fails.
    pub async fn notify(&self, account: &AccountConfig, message: &str) -> bool {
        let (Some(chat_id), Some(bot_token)) = (&account.chat_id, &account.bot_token) else {
            info!("account [{}] has no Telegram settings, skipping notification", account.name);
            return false;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, bot_token);
        let payload = build_message(account, chat_id, message);
        let res = match self.client.post(&url).json(&payload).send().await {
            Ok(res) => res,
            Err(e) => {
                error!("account [{}] Telegram request failed: {}", account.name, e);
                return false;
            }
        };

        let status = res.status();
        match res.json::<SendMessageReply>().await {
            Ok(reply) if reply.ok => {
                info!("account [{}] Telegram notification sent", account.name);
                true
            }
            Ok(_) => {
                error!("account [{}] Telegram rejected notification: {}", account.name, status);
                false
            }
            Err(e) => {
                error!("account [{}] unreadable Telegram reply ({}): {}", account.name, status, e);
                false
            }
        }
    }
}

pub fn build_message<'a>(account: &AccountConfig, chat_id: &'a str, message: &str) -> TelegramMessage<'a> {
    TelegramMessage {
        chat_id,
        text: format!("<b>[{}]</b>\n\n{}", escape_html(&account.name), message),
        parse_mode: "HTML",
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

/// HTML message bodies for each notification kind.
pub mod templates {
    use super::*;

    fn now() -> String {
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    pub fn offline(app: &str, app_id: &str) -> String {
        format!(
            "🔴 <b>Databricks App offline</b>\n\n📱 App: <code>{}</code>\n🆔 ID: <code>{}</code>\n⏰ Time: {}\n\n⚡ Attempting automatic restart...",
            escape_html(app),
            escape_html(app_id),
            now()
        )
    }

    pub fn start_succeeded(app: &str, app_id: &str) -> String {
        format!(
            "✅ <b>Databricks App started</b>\n\n📱 App: <code>{}</code>\n🆔 ID: <code>{}</code>\n⏰ Time: {}\n\n🎉 The app is starting up, check on it shortly.",
            escape_html(app),
            escape_html(app_id),
            now()
        )
    }

    pub fn start_failed(app: &str, app_id: &str, error: &str) -> String {
        format!(
            "❌ <b>Databricks App failed to start</b>\n\n📱 App: <code>{}</code>\n🆔 ID: <code>{}</code>\n⏰ Time: {}\n💥 Error: <code>{}</code>\n\n🔧 Check the app configuration or start it manually.",
            escape_html(app),
            escape_html(app_id),
            now(),
            escape_html(error)
        )
    }

    pub fn manual_operation(operation: &str, results: &[OperationResult]) -> String {
        let tally = RestartTally::from_results(results);
        format!(
            "📊 <b>Databricks Apps {}</b>\n\n✅ Started: {}\n❌ Failed: {}\n⏰ Time: {}",
            escape_html(operation),
            tally.started,
            tally.failed,
            now()
        )
    }

    pub fn test() -> String {
        format!(
            "🔔 <b>Monitor test notification</b>\n\n✅ This is a test message.\n⏰ Time: {}\n\n🎉 Notifications are configured correctly!",
            now()
        )
    }
}
