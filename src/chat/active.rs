//! Tracks the one reply per session that still carries a live clear button.

use std::collections::HashMap;
use std::sync::Arc;

use serenity::all::{ButtonStyle, ChannelId, CreateActionRow, CreateButton, MessageId};
use tokio::sync::Mutex;

use super::store::SessionKey;

pub const CLEAR_BUTTON_ID: &str = "clear";

/// Handle to the bot message currently carrying the clear button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveReply {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// At most one active reply exists per session; producing a new one
/// displaces the previous one, whose button the caller strips best-effort.
#[derive(Clone, Default)]
pub struct ActiveReplyTracker {
    replies: Arc<Mutex<HashMap<SessionKey, ActiveReply>>>,
}

impl ActiveReplyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the new active reply, returning the one it displaces.
    pub async fn replace(&self, key: &SessionKey, reply: ActiveReply) -> Option<ActiveReply> {
        self.replies.lock().await.insert(key.clone(), reply)
    }

    /// Remove the tracked reply only if it still points at `message_id`.
    ///
    /// A collector winding down for a reply that has already been superseded
    /// must not evict its successor.
    pub async fn remove_if(&self, key: &SessionKey, message_id: MessageId) -> bool {
        let mut replies = self.replies.lock().await;
        if replies.get(key).is_some_and(|r| r.message_id == message_id) {
            replies.remove(key);
            return true;
        }
        false
    }

    pub async fn get(&self, key: &SessionKey) -> Option<ActiveReply> {
        self.replies.lock().await.get(key).copied()
    }
}

/// The action row carrying the live "Clear Memory" button.
#[must_use]
pub fn clear_button_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CLEAR_BUTTON_ID)
            .label("Clear Memory")
            .style(ButtonStyle::Danger),
    ])
}

/// Replacement row shown once the memory has been cleared.
#[must_use]
pub fn cleared_button_row() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CLEAR_BUTTON_ID)
            .label("Memory Cleared")
            .style(ButtonStyle::Danger)
            .disabled(true),
    ])
}
