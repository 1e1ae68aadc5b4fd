//! Per-user session state: bounded turn history and model preference.

use crate::UserId;
use crate::llm::routing::ModelPreference;

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Retention bound: turns kept per user after every update.
pub const MAX_RETAINED_TURNS: usize = 20;

/// Prompt composition reads only this many of the most recent turns.
pub const PROMPT_WINDOW_TURNS: usize = 10;

/// Author of one stored turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message exchange unit in session history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    turns: Vec<Turn>,
    preference: Option<ModelPreference>,
}

impl Session {
    fn truncate_to_bound(&mut self) {
        if self.turns.len() > MAX_RETAINED_TURNS {
            let excess = self.turns.len() - MAX_RETAINED_TURNS;
            self.turns.drain(..excess);
        }
    }
}

/// In-memory session store keyed by user id.
///
/// Sessions are created lazily, cleared only by explicit request, and live
/// for the process lifetime. Every mutation happens inside one write-lock
/// critical section with no await points, so concurrent tasks cannot
/// observe a half-applied update. Two in-flight turns from the same user
/// can still commit out of chronological order because generation awaits
/// between the history read and the commit; that interleaving is accepted.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full stored history for a user, oldest first. Empty if none exists.
    pub async fn history(&self, user_id: &str) -> Vec<Turn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(user_id)
            .map(|session| session.turns.clone())
            .unwrap_or_default()
    }

    /// Append one turn, then truncate from the front past the retention
    /// bound. Always succeeds.
    pub async fn append_turn(&self, user_id: &str, turn: Turn) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(UserId::from(user_id)).or_default();
        session.turns.push(turn);
        session.truncate_to_bound();
    }

    /// Commit a completed exchange: user turn, then assistant turn, then
    /// truncation, in one critical section. The only conversation-flow
    /// write path; `/clear` bypasses it via [`SessionStore::clear`].
    pub async fn commit(&self, user_id: &str, user_input: String, assistant_output: String) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(UserId::from(user_id)).or_default();
        session.turns.push(Turn::user(user_input));
        session.turns.push(Turn::assistant(assistant_output));
        session.truncate_to_bound();
    }

    /// Drop all turns for a user. Clearing an absent user is a no-op. The
    /// stored model preference survives a clear.
    pub async fn clear(&self, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(user_id) {
            session.turns.clear();
        }
    }

    pub async fn preference(&self, user_id: &str) -> Option<ModelPreference> {
        let sessions = self.sessions.read().await;
        sessions
            .get(user_id)
            .and_then(|session| session.preference.clone())
    }

    pub async fn set_preference(&self, user_id: &str, preference: ModelPreference) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(UserId::from(user_id)).or_default();
        session.preference = Some(preference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_is_empty_for_unknown_user() {
        let store = SessionStore::new();
        assert!(store.history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_appends_user_then_assistant() {
        let store = SessionStore::new();
        store.commit("u1", "hỏi".into(), "đáp".into()).await;

        let history = store.history("u1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Turn::user("hỏi"));
        assert_eq!(history[1], Turn::assistant("đáp"));
    }

    #[tokio::test]
    async fn test_history_never_exceeds_retention_bound() {
        let store = SessionStore::new();
        for i in 0..50 {
            store
                .commit("u1", format!("hỏi {i}"), format!("đáp {i}"))
                .await;
        }

        let history = store.history("u1").await;
        assert_eq!(history.len(), MAX_RETAINED_TURNS);
        // Oldest turns were truncated from the front.
        assert_eq!(history[0], Turn::user("hỏi 40"));
        assert_eq!(history[19], Turn::assistant("đáp 49"));
    }

    #[tokio::test]
    async fn test_clear_empties_history_and_is_idempotent() {
        let store = SessionStore::new();
        store.commit("u1", "hỏi".into(), "đáp".into()).await;

        store.clear("u1").await;
        assert!(store.history("u1").await.is_empty());

        store.clear("u1").await;
        store.clear("nobody").await;
        assert!(store.history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_preference_survives_clear() {
        let store = SessionStore::new();
        store
            .set_preference("u1", ModelPreference::Model("pro".into()))
            .await;
        store.commit("u1", "hỏi".into(), "đáp".into()).await;

        store.clear("u1").await;
        assert_eq!(
            store.preference("u1").await,
            Some(ModelPreference::Model("pro".into()))
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_user() {
        let store = SessionStore::new();
        store.commit("u1", "một".into(), "đáp".into()).await;
        store.commit("u2", "hai".into(), "đáp".into()).await;

        assert_eq!(store.history("u1").await[0], Turn::user("một"));
        assert_eq!(store.history("u2").await[0], Turn::user("hai"));
    }
}
