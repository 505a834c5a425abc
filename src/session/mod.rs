pub mod model;
pub mod store;

pub use model::{
    ChatState, DraftMode, DraftOrder, PendingReason, ReasonKind, Session, ALL_CHAT_STATES,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
