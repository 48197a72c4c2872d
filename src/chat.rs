//! GPT chat commands: per-session conversational memory, response chunking,
//! and the clear-memory reply widget.

mod active;
mod chunk;
mod handler;
mod store;

pub use active::{ActiveReply, ActiveReplyTracker};
pub use chunk::split_message;
pub use handler::ChatHandler;
pub use store::{ConversationStore, SessionKey};
