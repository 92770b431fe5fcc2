//! Message and command handlers

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::search::SearchResponse;
use crate::telegram::bot::Command;
use crate::telegram::indexer::{index_chat_link, IndexOutcome};
use crate::telegram::render;
use crate::telegram::schema::HandlerDeps;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions, ParseMode};
use teloxide::utils::html;

/// Texts shorter than this many characters trigger a search; anything longer
/// is treated as conversation and ignored.
const SEARCH_TRIGGER_MAX_CHARS: usize = 10;

/// Disabled link previews for result pages, which are full of t.me links.
pub fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Handles a parsed bot command.
pub async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> AppResult<()> {
    match cmd {
        Command::Start => send_welcome(bot, msg.chat.id).await,
        Command::Help => send_help(bot, msg.chat.id).await,
        Command::Search(query) => {
            let query = query.trim();
            if query.is_empty() {
                bot.send_message(msg.chat.id, "请输入搜索关键字。用法: /search <关键词>")
                    .await?;
                return Ok(());
            }
            metrics::SEARCHES_TOTAL.with_label_values(&["command"]).inc();
            run_search_and_reply(bot, msg.chat.id, query, 1, "", deps).await
        }
        Command::Sponsor => send_sponsor(bot, msg.chat.id).await,
        Command::Disclaimer => send_disclaimer(bot, msg.chat.id).await,
    }
}

/// Handles plain text: t.me links are indexed, short texts searched.
pub async fn handle_text_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let Some(text) = msg.text() else { return Ok(()) };
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    if text.starts_with("https://t.me/") {
        return handle_index_link(bot, msg.chat.id, text, deps).await;
    }

    if text.chars().count() < SEARCH_TRIGGER_MAX_CHARS {
        metrics::SEARCHES_TOTAL.with_label_values(&["short_text"]).inc();
        return run_search_and_reply(bot, msg.chat.id, text, 1, "", deps).await;
    }

    Ok(())
}

/// Runs a search and sends a fresh result page.
///
/// The rendered hits are queued for background handle validation at the same
/// time; nothing on this path waits for the validation pipeline.
pub async fn run_search_and_reply(
    bot: &Bot,
    chat_id: ChatId,
    query: &str,
    page: i64,
    filter: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let result = match deps
        .search
        .search(query, page, config::search::HITS_PER_PAGE, filter)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("search failed: {}", e);
            bot.send_message(chat_id, format!("🔍 搜索失败: {}", e))
                .link_preview_options(no_preview())
                .await?;
            return Ok(());
        }
    };

    queue_hits_for_validation(deps, &result);

    let (text, keyboard) = render::search_page(query, filter, &result);
    let mut request = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .link_preview_options(no_preview());
    if let Some(kb) = keyboard {
        request = request.reply_markup(kb);
    }
    request.await?;

    Ok(())
}

/// Hands a result batch to the validation queue. Fire-and-forget.
pub fn queue_hits_for_validation(deps: &HandlerDeps, result: &SearchResponse) {
    deps.validation.enqueue_hits(&result.hits);
}

/// Indexes the chat behind a t.me link and reports the outcome.
/// Also invoked by the `retry_index:` callback.
pub async fn handle_index_link(bot: &Bot, chat_id: ChatId, link: &str, deps: &HandlerDeps) -> AppResult<()> {
    let management = deps.management.as_deref();
    match index_chat_link(&deps.resolver, management, &deps.search, link).await {
        Ok(IndexOutcome::Indexed {
            title,
            username,
            description,
            members_count,
        }) => {
            let text = format!(
                "<b>群组收录成功</b>\n\n<b>标题:</b> {}\n<b>用户名:</b> @{}\n<b>描述:</b> {}\n<b>成员数量:</b> {}",
                html::escape(&title),
                html::escape(&username),
                html::escape(&description),
                members_count
            );
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .link_preview_options(no_preview())
                .await?;
        }
        Ok(IndexOutcome::NeedsBotInChat) => {
            let me = bot.get_me().await?;
            let add_url = format!(
                "https://t.me/{}?startgroup=true",
                me.username.as_deref().unwrap_or_default()
            );
            let keyboard = InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback("🔄 重新获取", format!("retry_index:{}", link)),
                InlineKeyboardButton::url("➕ 添加到群组/频道", add_url.parse()?),
            ]]);
            bot.send_message(chat_id, "获取用户数量失败，请将机器人拉入群组后重试。")
                .reply_markup(keyboard)
                .await?;
        }
        Err(e) => {
            log::error!("Failed to index chat from link {}: {}", link, e);
            bot.send_message(chat_id, "收录失败，请确认链接有效后重试。").await?;
        }
    }
    Ok(())
}

async fn send_welcome(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let text = "你好，欢迎使用聊天索引机器人！\n\n\
        <b>使用说明:</b>\n\
        - 发送 <code>https://t.me/用户名</code> 链接即可收录群组或频道。\n\
        - 发送短于10个字符的文本，将触发搜索功能。\n\
        - 使用 /search 命令搜索群组、频道和消息。\n\n\
        🔍✨ 搜索结果支持分页和过滤。";
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .link_preview_options(no_preview())
        .await?;
    Ok(())
}

async fn send_help(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let text = "<b>可用命令列表：</b>\n\n\
        /help - 显示此帮助信息\n\
        /search <关键词> - 搜索群组、频道和消息\n\
        /sponsor - 支持我们\n\
        /disclaimer - 查看免责声明\n\n\
        <b>使用说明：</b>\n\
        1. 发送 t.me 链接收录群组或频道\n\
        2. 使用 /search 命令搜索群组、频道和消息\n\
        3. 搜索结果支持分页和过滤功能\n\
        4. 点击搜索结果中的链接可以直接访问";
    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

async fn send_sponsor(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let text = "如果您觉得本机器人对您有帮助，请考虑赞助我们。\n\nTRX & USDT (TRC20):\n\n✨<code>TD5JGaR7cY5ZxDnZNgmCSv66axR9DhrcYz</code>✨";
    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

async fn send_disclaimer(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    let text = "⚠️ <b>法律声明</b> ⚠️\n\n\
        <b>使用限制</b>：本项目不适用于中国大陆。Telegram 在中国大陆受到政府的访问限制，\
        本项目的数据收集和处理活动可能违反当地法律法规。\n\n\
        <b>免责声明</b>：本项目开发人员对因使用不当、违反当地法律或数据隐私问题而导致的\
        任何后果概不负责。用户应自行评估法律风险，并在必要时咨询法律专业人士。";
    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_preview_disables_previews() {
        assert!(no_preview().is_disabled);
    }

    #[test]
    fn test_search_trigger_threshold() {
        assert!("短文本".chars().count() < SEARCH_TRIGGER_MAX_CHARS);
        assert!("这是一条足够长的普通聊天消息不应触发搜索".chars().count() >= SEARCH_TRIGGER_MAX_CHARS);
    }
}
