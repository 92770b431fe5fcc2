//! Telegram bot integration and handlers

pub mod bot;
pub mod callbacks;
pub mod commands;
pub mod indexer;
pub mod pagination;
pub mod render;
pub mod schema;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use callbacks::handle_callback_query;
pub use commands::{handle_command, handle_text_message};
pub use pagination::{decode, encode, CallbackAction, DecodeError, DecodedAction};
pub use schema::{schema, HandlerDeps, HandlerError};
