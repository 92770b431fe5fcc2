//! Callback query routing
//!
//! Three families of payloads arrive here: review decisions from the
//! moderation channel (`delete_doc_` / `keep_doc_`), indexing retries
//! (`retry_index:`), and the pagination/filter protocol driving the search
//! UI. Pagination state is recovered from the rendered message text alone —
//! there is no server-side session to consult.

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::telegram::commands::{no_preview, queue_hits_for_validation};
use crate::telegram::pagination::{decode, DecodedAction};
use crate::telegram::render;
use crate::telegram::schema::HandlerDeps;
use crate::validation::{DELETE_DOC_PREFIX, KEEP_DOC_PREFIX};
use teloxide::prelude::*;
use teloxide::types::{MaybeInaccessibleMessage, MessageId, ParseMode};

/// Dispatches a callback query to the matching handler family.
pub async fn handle_callback_query(bot: &Bot, q: CallbackQuery, deps: &HandlerDeps) -> AppResult<()> {
    let callback_id = q.id.clone();
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(callback_id).await?;
        return Ok(());
    };

    // Review decisions carry their own grammar and can arrive from the
    // review channel where the rendered-text protocol does not apply.
    if data.starts_with(DELETE_DOC_PREFIX) || data.starts_with(KEEP_DOC_PREFIX) {
        return handle_review_decision(bot, &q, &data, deps).await;
    }

    let (chat_id, message_id, rendered_text) = match q.message.as_ref() {
        Some(MaybeInaccessibleMessage::Regular(msg)) => {
            (msg.chat.id, msg.id, msg.text().unwrap_or_default().to_string())
        }
        _ => {
            // Message too old or inaccessible: nothing to recover state from.
            bot.answer_callback_query(callback_id).text("页面状态已失效，请重新搜索").await?;
            return Ok(());
        }
    };

    if let Some(link) = data.strip_prefix("retry_index:") {
        bot.answer_callback_query(callback_id).await?;
        return super::commands::handle_index_link(bot, chat_id, link, deps).await;
    }

    match decode(&data, &rendered_text) {
        Ok(DecodedAction::Acknowledge) => {
            bot.answer_callback_query(callback_id).await?;
        }
        Ok(DecodedAction::Search { query, filter, page }) => {
            bot.answer_callback_query(callback_id).await?;
            metrics::SEARCHES_TOTAL.with_label_values(&["callback"]).inc();
            rerender_search_page(bot, chat_id, message_id, &query, &filter, page, deps).await?;
        }
        Err(e) => {
            log::debug!("Callback decode failed for payload '{}': {}", data, e);
            bot.answer_callback_query(callback_id).text(e.user_message()).await?;
        }
    }

    Ok(())
}

/// Re-runs the search and edits the page in place. The edited text becomes
/// the pagination state for the next interaction.
async fn rerender_search_page(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    query: &str,
    filter: &str,
    page: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let result = match deps
        .search
        .search(query, page, config::search::HITS_PER_PAGE, filter)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("search failed during callback re-render: {}", e);
            bot.send_message(chat_id, format!("🔍 搜索失败: {}", e))
                .link_preview_options(no_preview())
                .await?;
            return Ok(());
        }
    };

    queue_hits_for_validation(deps, &result);

    let (text, keyboard) = render::search_page(query, filter, &result);
    let mut request = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html)
        .link_preview_options(no_preview());
    if let Some(kb) = keyboard {
        request = request.reply_markup(kb);
    }
    request.await?;

    Ok(())
}

/// Applies a moderator's review decision and edits the review message to
/// show the result.
async fn handle_review_decision(bot: &Bot, q: &CallbackQuery, data: &str, deps: &HandlerDeps) -> AppResult<()> {
    let callback_id = q.id.clone();

    let response_text = if let Some(doc_id) = data.strip_prefix(DELETE_DOC_PREFIX) {
        if doc_id.is_empty() {
            log::error!("Attempted to delete document with empty ID.");
            "❌ 删除失败: 无效的文档ID".to_string()
        } else if doc_id.contains('/') || doc_id.contains('\\') {
            log::error!("Invalid document ID format: {}", doc_id);
            "❌ 删除失败: 无效的文档ID格式".to_string()
        } else {
            match deps.search.delete_document(doc_id).await {
                Ok(()) => format!("✅ 文档 {} 已被删除。", doc_id),
                Err(e) => {
                    log::error!("Failed to delete document {}: {}", doc_id, e);
                    "❌ 删除失败".to_string()
                }
            }
        }
    } else if let Some(doc_id) = data.strip_prefix(KEEP_DOC_PREFIX) {
        format!("👍 文档 {} 已被保留。", doc_id)
    } else {
        bot.answer_callback_query(callback_id).await?;
        return Ok(());
    };

    if let Some(MaybeInaccessibleMessage::Regular(msg)) = q.message.as_ref() {
        if let Err(e) = bot
            .edit_message_text(msg.chat.id, msg.id, response_text.clone())
            .parse_mode(ParseMode::Html)
            .await
        {
            log::error!("Failed to edit message for review callback: {}", e);
            bot.answer_callback_query(callback_id).text(response_text).await?;
            return Ok(());
        }
    }
    bot.answer_callback_query(callback_id).await?;

    Ok(())
}
