//! Outbound notifications
//!
//! `Notifier` is what the monitor job talks to. `TelegramNotifier` posts
//! HTML messages through the Bot API; `LogNotifier` only logs them and is
//! used when no bot token is configured.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::NotifyError;
use crate::models::Listing;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one HTML-formatted message.
    async fn send_html(&self, html: &str) -> Result<(), NotifyError>;

    async fn send_upcoming_report(
        &self,
        listings: &[Listing],
        now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.send_html(&render_upcoming_report(listings, now)).await
    }

    async fn send_upcoming_alert(
        &self,
        listing: &Listing,
        now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.send_html(&render_upcoming_alert(listing, now)).await
    }

    async fn send_started_alert(&self, listing: &Listing) -> Result<(), NotifyError> {
        self.send_html(&render_started_alert(listing)).await
    }

    async fn send_startup_message(&self, source_names: &[String]) -> Result<(), NotifyError> {
        self.send_html(&render_startup_message(source_names)).await
    }
}

/// Writes every message to the log instead of a chat
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_html(&self, html: &str) -> Result<(), NotifyError> {
        info!("Notification (log only):\n{}", html);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    channel_post: Option<TelegramMessage>,
    #[serde(default)]
    edited_message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Telegram Bot API client.
///
/// Without a configured chat id, the chat of the bot's most recent update is
/// used and remembered.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    chat_id: Mutex<Option<String>>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: format!("{}/bot{}", TELEGRAM_API_BASE, bot_token),
            chat_id: Mutex::new(chat_id),
        })
    }

    async fn resolve_chat_id(&self) -> Result<String, NotifyError> {
        let mut cached = self.chat_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let response: TelegramResponse<Vec<TelegramUpdate>> = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .send()
            .await?
            .json()
            .await?;
        let updates = check_response(response)?;

        let id = latest_chat_id(&updates).ok_or(NotifyError::MissingChat)?;
        info!("Discovered Telegram chat id {}", id);
        *cached = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_html(&self, html: &str) -> Result<(), NotifyError> {
        let chat_id = self.resolve_chat_id().await?;

        let request = SendMessageRequest {
            chat_id: &chat_id,
            text: html,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let response: TelegramResponse<serde_json::Value> = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        check_response(response)?;

        debug!("Telegram message delivered to chat {}", chat_id);
        Ok(())
    }
}

fn check_response<T>(response: TelegramResponse<T>) -> Result<T, NotifyError> {
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        (_, _) => {
            let description = response
                .description
                .unwrap_or_else(|| "empty response".to_string());
            warn!("Telegram API rejected request: {}", description);
            Err(NotifyError::Api { description })
        }
    }
}

fn latest_chat_id(updates: &[TelegramUpdate]) -> Option<String> {
    updates.iter().rev().find_map(|update| {
        update
            .message
            .as_ref()
            .or(update.channel_post.as_ref())
            .or(update.edited_message.as_ref())
            .map(|m| m.chat.id.to_string())
    })
}

// Rendering

pub fn format_listing_time(time: DateTime<Utc>) -> String {
    time.format("%d.%m.%Y %H:%M UTC").to_string()
}

/// Remaining time as `Nd Nh`, `Nh Nm` or `Nm`
pub fn format_time_left(listing_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = listing_time - now;
    if left <= chrono::Duration::zero() {
        return "already started".to_string();
    }

    let days = left.num_days();
    let hours = left.num_hours() % 24;
    let minutes = left.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn link_line(listing: &Listing, label: &str) -> String {
    match &listing.announcement_url {
        Some(url) => format!("🔗 <a href=\"{}\">{}</a>\n", escape_html(url), label),
        None => String::new(),
    }
}

pub fn render_upcoming_report(listings: &[Listing], now: DateTime<Utc>) -> String {
    if listings.is_empty() {
        return "📊 <b>Upcoming listings</b>\n\nNo listings scheduled in the near future.".to_string();
    }

    let mut message = format!("📊 <b>{} nearest listings</b>\n\n", listings.len());
    for (i, listing) in listings.iter().enumerate() {
        message.push_str(&format!("<b>{}. {}</b>\n", i + 1, escape_html(&listing.symbol)));
        message.push_str(&format!("🏢 Exchange: {}\n", escape_html(&listing.exchange)));
        message.push_str(&format!("⏰ Time: {}\n", format_listing_time(listing.listing_time)));
        message.push_str(&format!(
            "⏳ Left: {}\n",
            format_time_left(listing.listing_time, now)
        ));
        message.push_str(&link_line(listing, "Announcement"));
        message.push('\n');
    }
    message
}

pub fn render_upcoming_alert(listing: &Listing, now: DateTime<Utc>) -> String {
    let mut message = String::from("⏰ <b>LISTING SOON!</b> ⏰\n\n");
    message.push_str(&format!("💰 <b>Token:</b> {}\n", escape_html(&listing.symbol)));
    message.push_str(&format!("🏢 <b>Exchange:</b> {}\n", escape_html(&listing.exchange)));
    message.push_str(&format!(
        "⏰ <b>Listing time:</b> {}\n",
        format_listing_time(listing.listing_time)
    ));
    message.push_str(&format!(
        "⏳ <b>Left:</b> {}\n",
        format_time_left(listing.listing_time, now)
    ));
    message.push_str(&link_line(listing, "Announcement"));
    message
}

pub fn render_started_alert(listing: &Listing) -> String {
    let mut message = String::from("🚨 <b>LISTING STARTED!</b> 🚨\n\n");
    message.push_str(&format!("💰 <b>Token:</b> {}\n", escape_html(&listing.symbol)));
    message.push_str(&format!("🏢 <b>Exchange:</b> {}\n", escape_html(&listing.exchange)));
    message.push_str(&format!(
        "⏰ <b>Started at:</b> {}\n",
        format_listing_time(listing.listing_time)
    ));
    message.push_str(&link_line(listing, "Details"));
    message.push_str("\n💡 <i>Trading is open.</i>");
    message
}

pub fn render_startup_message(source_names: &[String]) -> String {
    let mut message = String::from("🤖 <b>Listing monitor started</b>\n\n");
    message.push_str(&format!("📡 <b>Sources ({}):</b>\n", source_names.len()));
    for name in source_names {
        message.push_str(&format!("• {}\n", escape_html(name)));
    }
    message.push_str("\n⏰ Periodic report of the nearest listings\n");
    message.push_str("🚨 Alerts 60, 30, 15 and 5 minutes before a listing\n");
    message.push_str("💥 Repeated alert when a listing starts");
    message
}
