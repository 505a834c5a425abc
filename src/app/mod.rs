pub mod bot;
pub mod cli;

pub use bot::{Bot, BotError};
pub use cli::run_cli;
