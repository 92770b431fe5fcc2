//! Dispatcher schema and handler dependencies

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::search::{ManagementClient, SearchClient};
use crate::telegram::bot::Command;
use crate::telegram::callbacks::handle_callback_query;
use crate::telegram::commands::{handle_command, handle_text_message};
use crate::telegram::indexer::ChatResolver;
use crate::validation::ValidationQueue;

/// Error type flowing out of dispatcher endpoints.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared dependencies handed to every handler.
#[derive(Clone)]
pub struct HandlerDeps {
    pub search: Arc<SearchClient>,
    pub management: Option<Arc<ManagementClient>>,
    pub resolver: Arc<ChatResolver>,
    pub validation: ValidationQueue,
}

impl HandlerDeps {
    pub fn new(
        search: Arc<SearchClient>,
        management: Option<Arc<ManagementClient>>,
        resolver: Arc<ChatResolver>,
        validation: ValidationQueue,
    ) -> Self {
        Self {
            search,
            management,
            resolver,
            validation,
        }
    }
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree serves production and the integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callbacks))
}

/// Handler for the commands in the [`Command`] enum.
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    log::error!("Command handler failed for chat {}: {}", msg.chat.id.0, e);
                }
                Ok(())
            }
        },
    ))
}

/// Handler for plain text: t.me links and short search queries.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_text_message(&bot, &msg, &deps).await {
                    log::error!("Message handler failed for chat {}: {}", msg.chat.id.0, e);
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (review decisions, indexing retries,
/// pagination).
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_callback_query(&bot, q, &deps).await {
                log::error!("Callback handler failed: {}", e);
            }
            Ok(())
        }
    })
}
