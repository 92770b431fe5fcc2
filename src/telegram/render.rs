//! Search result rendering
//!
//! Builds the HTML result page and its inline keyboard. The page marker in
//! the header doubles as the pagination state for the callback protocol
//! (see [`crate::telegram::pagination`]), so its format is part of the wire
//! contract and must stay decodable.

use crate::search::{SearchHit, SearchResponse};
use crate::telegram::pagination::{encode, CallbackAction};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;

/// Filter buttons shown under every result page, in display order.
const FILTER_MODELS: [(&str, &str); 5] = [
    ("全部", "all"),
    ("群组", "group"),
    ("频道", "channel"),
    ("机器人", "bot"),
    ("消息", "message"),
];

const MAX_FILTER_BUTTONS_PER_ROW: usize = 3;

/// Longest message preview shown per hit, in characters.
const MESSAGE_PREVIEW_CHARS: usize = 120;

/// Renders one result page.
///
/// Returns the HTML text and, when there are hits, the pagination/filter
/// keyboard. An empty result set renders as a plain one-liner.
pub fn search_page(query: &str, filter: &str, result: &SearchResponse) -> (String, Option<InlineKeyboardMarkup>) {
    if result.hits.is_empty() {
        return (format!("<i>No results found for: </i>{}", html::escape(query)), None);
    }

    let current_page = result.page.max(1);
    let total_pages = result.total_pages.max(1);
    let hits_per_page = if result.hits_per_page > 0 { result.hits_per_page } else { 10 };

    let mut text = format!(
        "<b>🔍 关键字: {}</b> (第 {} 页 / 共 {} 页)\n\n",
        html::escape(query),
        current_page,
        total_pages
    );

    for (i, hit) in result.hits.iter().enumerate() {
        let ordinal = i as i64 + 1 + (current_page - 1) * hits_per_page;
        text.push_str(&render_hit(hit, ordinal));
    }

    (text, Some(keyboard(query, filter, current_page, total_pages)))
}

/// Renders one hit: a quoted message with a jump link, or a chat line with
/// type emoji and member count.
fn render_hit(hit: &SearchHit, ordinal: i64) -> String {
    let display_title = display_title(hit);

    if let Some(message_id) = hit.message_id {
        let Some(message_text) = hit.text.as_deref().filter(|t| !t.is_empty()) else {
            return String::new();
        };
        let preview: String = if message_text.chars().count() > MESSAGE_PREVIEW_CHARS {
            let cut: String = message_text.chars().take(MESSAGE_PREVIEW_CHARS).collect();
            format!("{}...", cut)
        } else {
            message_text.to_string()
        };
        let jump_link = hit
            .handle()
            .map(|u| format!(" <a href=\"https://t.me/{}/{}\">(跳转)</a>", u, message_id))
            .unwrap_or_default();

        format!(
            "<b>{}. 💬 消息</b> from {}{}\n<blockquote>{}</blockquote>\n",
            ordinal,
            display_title,
            jump_link,
            html::escape(&preview)
        )
    } else {
        let type_emoji = match hit.chat_type.as_deref() {
            Some("private") => "👤",
            Some("supergroup") => "👑",
            Some("group") => "👥",
            Some("channel") => "📢",
            Some("bot") => "🤖",
            _ => "",
        };
        let members = hit
            .members_count
            .filter(|&c| c > 0)
            .map(|c| format!(" {}", c))
            .unwrap_or_default();

        format!("<b>{}. {}</b> {}{}\n\n", ordinal, display_title, type_emoji, members)
    }
}

/// Title text: linked to t.me when the chat has a handle, with a typed
/// fallback label when the document has no title at all.
fn display_title(hit: &SearchHit) -> String {
    let title = match hit.title.as_deref().filter(|t| !t.is_empty()) {
        Some(t) => t.to_string(),
        None => match hit.chat_type.as_deref() {
            Some("private") => "私聊".to_string(),
            Some("group") | Some("supergroup") => "群组".to_string(),
            Some("channel") => "频道".to_string(),
            _ => "未知".to_string(),
        },
    };

    match hit.handle() {
        Some(username) => format!("<a href=\"https://t.me/{}\">{}</a>", username, html::escape(&title)),
        None => html::escape(&title),
    }
}

/// Pagination row plus filter rows, every button carrying an encoded payload.
fn keyboard(query: &str, filter: &str, current_page: i64, total_pages: i64) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    let mut pagination_row = Vec::new();
    if current_page > 1 {
        pagination_row.push(InlineKeyboardButton::callback(
            "⬅️ 上一页",
            encode(CallbackAction::Prev, filter, query),
        ));
    }
    pagination_row.push(InlineKeyboardButton::callback(
        format!("{}/{}", current_page, total_pages),
        encode(CallbackAction::Current, filter, query),
    ));
    if current_page < total_pages {
        pagination_row.push(InlineKeyboardButton::callback(
            "下一页 ➡️",
            encode(CallbackAction::Next, filter, query),
        ));
    }
    rows.push(pagination_row);

    let active_filter = if filter.is_empty() { "all" } else { filter };
    let filter_buttons: Vec<InlineKeyboardButton> = FILTER_MODELS
        .iter()
        .map(|(label, value)| {
            let text = if active_filter == *value {
                format!("✅ {}", label)
            } else {
                (*label).to_string()
            };
            InlineKeyboardButton::callback(text, encode(CallbackAction::Filter, value, query))
        })
        .collect();
    for chunk in filter_buttons.chunks(MAX_FILTER_BUTTONS_PER_ROW) {
        rows.push(chunk.to_vec());
    }

    InlineKeyboardMarkup::new(rows)
}
