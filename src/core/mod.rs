//! Core utilities: configuration, errors, logging, metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod metrics_server;

pub use error::{AppError, AppResult, BotError};
pub use logging::init_logger;
