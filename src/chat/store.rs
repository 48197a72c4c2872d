//! Per-session conversational memory with idle expiry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serenity::all::{ChannelId, UserId};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::openai::ChatMessage;
use crate::types::Flavor;

/// Sessions are dropped after an hour without activity.
pub const IDLE_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Stable identity for one conversational-memory slot: (channel, user).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    #[must_use]
    pub fn new(channel_id: ChannelId, user_id: UserId) -> Self {
        Self(format!("{channel_id}{user_id}"))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Session {
    history: Vec<ChatMessage>,
    flavor: Flavor,
    expiry: Option<AbortHandle>,
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Keyed map of live conversations.
///
/// Reads hand out a snapshot and writes replace the whole history, so two
/// overlapping invocations for the same key resolve as last-write-wins —
/// the same behavior a single-threaded event loop with an awaited network
/// call in the middle would exhibit.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
    ttl: Duration,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(IDLE_EXPIRY)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Snapshot the session's history, or a fresh single-system-turn history
    /// when the session does not exist or was created with another flavor.
    ///
    /// Nothing is written to the store here; a conversation only becomes
    /// durable once [`commit`](Self::commit) runs after a successful
    /// completion.
    pub async fn get_or_create(
        &self,
        key: &SessionKey,
        flavor: Flavor,
        default_system_prompt: &str,
    ) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock().await;
        match sessions.get(key) {
            Some(session) if session.flavor == flavor => session.history.clone(),
            Some(session) => {
                debug!(
                    "Session {key} switching flavor {} -> {flavor}, starting over",
                    session.flavor
                );
                vec![ChatMessage::system(default_system_prompt)]
            }
            None => vec![ChatMessage::system(default_system_prompt)],
        }
    }

    /// Store the full history for a session, replacing whatever was there.
    pub async fn commit(&self, key: &SessionKey, history: Vec<ChatMessage>, flavor: Flavor) {
        let mut sessions = self.sessions.lock().await;
        let expiry = sessions
            .remove(key)
            .and_then(|mut session| session.expiry.take());
        sessions.insert(
            key.clone(),
            Session {
                history,
                flavor,
                expiry,
            },
        );
    }

    /// Reset the session's idle-expiry countdown.
    pub async fn touch(&self, key: &SessionKey) {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(key) else {
            return;
        };
        if let Some(handle) = session.expiry.take() {
            handle.abort();
        }

        let store = self.clone();
        let expired_key = key.clone();
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            debug!("Conversation memory for session {expired_key} expired");
            store.sessions.lock().await.remove(&expired_key);
        })
        .abort_handle();
        session.expiry = Some(handle);
    }

    /// Drop the session immediately, cancelling its expiry timer.
    pub async fn clear(&self, key: &SessionKey) {
        self.sessions.lock().await.remove(key);
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.lock().await.contains_key(key)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    const PROMPT: &str = "You are an assistant.";

    fn key() -> SessionKey {
        SessionKey::new(ChannelId::new(42), UserId::new(7))
    }

    #[tokio::test]
    async fn fresh_session_starts_with_one_system_turn() {
        let store = ConversationStore::new();
        let history = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        assert_eq!(history, vec![ChatMessage::system(PROMPT)]);
        assert!(!store.contains(&key()).await);
    }

    #[tokio::test]
    async fn same_flavor_returns_committed_turns_in_order() {
        let store = ConversationStore::new();
        let mut history = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        history.push(ChatMessage::user("first question"));
        history.push(ChatMessage::assistant("first answer"));
        store.commit(&key(), history, Flavor::None).await;

        let resumed = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        let system_turns = resumed
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .count();
        assert_eq!(system_turns, 1);
        assert_eq!(resumed[0], ChatMessage::system(PROMPT));
        assert_eq!(resumed[1], ChatMessage::user("first question"));
        assert_eq!(resumed[2], ChatMessage::assistant("first answer"));
    }

    #[tokio::test]
    async fn flavor_switch_discards_previous_history() {
        let store = ConversationStore::new();
        let mut history = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        history.push(ChatMessage::user("hello"));
        store.commit(&key(), history, Flavor::None).await;

        let switched = store.get_or_create(&key(), Flavor::Senko, "You are Senko.").await;
        assert_eq!(switched, vec![ChatMessage::system("You are Senko.")]);

        // Committing the switched conversation makes the old one unreachable.
        store.commit(&key(), switched, Flavor::Senko).await;
        let resumed = store.get_or_create(&key(), Flavor::Senko, "You are Senko.").await;
        assert!(!resumed.iter().any(|m| m.content == "hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_expires_after_an_hour() {
        let store = ConversationStore::new();
        store
            .commit(&key(), vec![ChatMessage::system(PROMPT)], Flavor::None)
            .await;
        store.touch(&key()).await;
        assert!(store.contains(&key()).await);

        tokio::time::advance(Duration::from_secs(61 * 60)).await;
        tokio::task::yield_now().await;
        assert!(!store.contains(&key()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_restarts_the_countdown() {
        let store = ConversationStore::new();
        store
            .commit(&key(), vec![ChatMessage::system(PROMPT)], Flavor::None)
            .await;
        store.touch(&key()).await;

        tokio::time::advance(Duration::from_secs(45 * 60)).await;
        store.touch(&key()).await;
        tokio::time::advance(Duration::from_secs(45 * 60)).await;
        tokio::task::yield_now().await;
        assert!(store.contains(&key()).await, "refreshed session must survive");

        tokio::time::advance(Duration::from_secs(16 * 60)).await;
        tokio::task::yield_now().await;
        assert!(!store.contains(&key()).await);
    }

    #[tokio::test]
    async fn clear_removes_the_session_immediately() {
        let store = ConversationStore::new();
        store
            .commit(&key(), vec![ChatMessage::system(PROMPT)], Flavor::None)
            .await;
        store.touch(&key()).await;
        store.clear(&key()).await;
        assert!(!store.contains(&key()).await);
    }

    #[tokio::test]
    async fn overlapping_commits_resolve_last_write_wins() {
        let store = ConversationStore::new();

        // Two invocations snapshot the same empty session...
        let mut first = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        let mut second = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        first.push(ChatMessage::user("from the first call"));
        second.push(ChatMessage::user("from the second call"));

        // ...and the later commit silently discards the earlier one's turns.
        store.commit(&key(), first, Flavor::None).await;
        store.commit(&key(), second, Flavor::None).await;

        let resumed = store.get_or_create(&key(), Flavor::None, PROMPT).await;
        assert!(resumed.iter().any(|m| m.content == "from the second call"));
        assert!(!resumed.iter().any(|m| m.content == "from the first call"));
    }
}
