//! Review notifications for flagged handles
//!
//! When the worker finds a handle that no longer resolves, the hit is
//! forwarded to a human review channel with two choices: confirm the
//! document is dead (delete it from the index) or keep it. Sending is
//! fire-and-forget — a lost notification never blocks the cache write or
//! the worker loop, the handle just gets flagged again after the cache
//! entry goes stale.

use crate::core::metrics;
use crate::search::SearchHit;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html;

/// Callback payload prefix for "confirm invalid, delete the document".
pub const DELETE_DOC_PREFIX: &str = "delete_doc_";
/// Callback payload prefix for "keep the document".
pub const KEEP_DOC_PREFIX: &str = "keep_doc_";

/// Seam between the worker and whatever transports review notifications.
#[async_trait]
pub trait ReviewSink: Send + Sync {
    async fn notify(&self, hit: &SearchHit);
}

/// Posts flagged hits to the review channel via the dedicated review bot.
pub struct TelegramReviewNotifier {
    bot: Bot,
    channel: ChatId,
}

impl TelegramReviewNotifier {
    pub fn new(bot: Bot, channel: ChatId) -> Self {
        Self { bot, channel }
    }

    /// Builds the review message and its decision keyboard.
    fn build_message(hit: &SearchHit) -> Option<(String, InlineKeyboardMarkup)> {
        let doc_id = match hit.doc_id() {
            Some(id) => id,
            None => {
                log::error!("Review notification skipped: hit has no document id: {:?}", hit);
                return None;
            }
        };
        let username = hit.handle().unwrap_or_default();
        let title = hit.title.as_deref().unwrap_or_default();

        let text = format!(
            "<b>【疑似失效】</b>\n请审核: <a href=\"https://t.me/{}\">@{}</a>\n文档ID: <code>{}</code>",
            username,
            html::escape(title),
            doc_id
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("❌ 确认失效 (删除)", format!("{}{}", DELETE_DOC_PREFIX, doc_id)),
            InlineKeyboardButton::callback("✅ 保留 没有失效", format!("{}{}", KEEP_DOC_PREFIX, doc_id)),
        ]]);
        Some((text, keyboard))
    }
}

#[async_trait]
impl ReviewSink for TelegramReviewNotifier {
    async fn notify(&self, hit: &SearchHit) {
        let Some((text, keyboard)) = Self::build_message(hit) else {
            return;
        };

        // Detach the send so the worker's pacing never waits on the review
        // channel being slow or down.
        let bot = self.bot.clone();
        let channel = self.channel;
        tokio::spawn(async move {
            match bot
                .send_message(channel, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await
            {
                Ok(_) => {
                    metrics::REVIEW_NOTIFICATIONS_TOTAL.inc();
                }
                Err(e) => {
                    log::error!("Failed to send review notification: {}", e);
                }
            }
        });
    }
}
