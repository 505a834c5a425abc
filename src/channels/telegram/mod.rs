//! Telegram Bot API adapter: outbound calls, update parsing and the long
//! polling loop.

pub mod api;
pub mod poll;
pub mod updates;

pub use api::TelegramApiClient;
pub use poll::run_polling;
pub use updates::{to_inbound, TgUpdate};
