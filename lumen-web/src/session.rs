//! In-memory chat sessions keyed by a client-supplied identifier.
//!
//! Each session holds an ordered transcript of turns. Sessions are created
//! lazily, live for the lifetime of the process, and are only ever appended
//! to or wholly reset.
//!
//! The map lock is held only for lookup and insert. Every session carries its
//! own mutex, so writers to the same key are serialized while different keys
//! never wait on each other. [`SessionStore::lock`] holds that mutex for a
//! whole chat exchange.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Session key used when the client does not supply one.
pub const DEFAULT_SESSION_KEY: &str = "default";

/// Resolve an optional client key, falling back to [`DEFAULT_SESSION_KEY`]
/// when it is absent or blank.
pub fn resolve_key(key: Option<&str>) -> &str {
    match key {
        Some(k) if !k.trim().is_empty() => k,
        _ => DEFAULT_SESSION_KEY,
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// A conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub key: String,
    turns: Vec<Turn>,
}

impl Session {
    /// Create an empty session.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            turns: Vec::new(),
        }
    }

    /// Turns in call order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn::new(role, text));
    }

    fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Process-wide session map.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the slot for `key`, inserting an empty session on first use.
    async fn slot(&self, key: &str) -> Arc<Mutex<Session>> {
        if let Some(slot) = self.sessions.read().await.get(key) {
            return Arc::clone(slot);
        }

        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(session_id = %key, "Creating session");
            Arc::new(Mutex::new(Session::new(key)))
        });
        Arc::clone(slot)
    }

    /// Return a snapshot of the session for `key`, creating it if needed.
    pub async fn get_or_create(&self, key: &str) -> Session {
        self.slot(key).await.lock().await.clone()
    }

    /// Empty the transcript for `key`.
    ///
    /// Clears in place so a concurrent [`SessionGuard`] never writes into a
    /// detached copy.
    pub async fn reset(&self, key: &str) {
        let slot = self.slot(key).await;
        let mut session = slot.lock().await;
        let dropped = session.len();
        session.clear();
        tracing::debug!(session_id = %key, dropped, "Session reset");
    }

    /// Append one turn to the transcript for `key`.
    pub async fn append_turn(&self, key: &str, role: Role, text: impl Into<String>) {
        self.slot(key).await.lock().await.push(role, text);
    }

    /// Take exclusive access to the session for `key`.
    ///
    /// Other writers of the same key wait until the guard is dropped.
    pub async fn lock(&self, key: &str) -> SessionGuard {
        SessionGuard {
            inner: self.slot(key).await.lock_owned().await,
        }
    }

    /// Number of known sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Known session keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Exclusive handle on one session.
pub struct SessionGuard {
    inner: OwnedMutexGuard<Session>,
}

impl SessionGuard {
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Prior turns of this session.
    pub fn transcript(&self) -> &[Turn] {
        self.inner.turns()
    }

    pub fn append_turn(&mut self, role: Role, text: impl Into<String>) {
        self.inner.push(role, text);
    }

    /// Record a completed exchange: the user's message, then the reply.
    pub fn append_exchange(&mut self, message: impl Into<String>, reply: impl Into<String>) {
        self.inner.push(Role::User, message);
        self.inner.push(Role::Assistant, reply);
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("key", &self.inner.key)
            .field("turns", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key_defaults() {
        assert_eq!(resolve_key(None), "default");
        assert_eq!(resolve_key(Some("")), "default");
        assert_eq!(resolve_key(Some("   ")), "default");
        assert_eq!(resolve_key(Some("tab-2")), "tab-2");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::assistant("hello")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","text":"hello"}"#);
    }

    #[tokio::test]
    async fn test_new_key_is_empty() {
        let store = SessionStore::new();
        let session = store.get_or_create("never-seen").await;
        assert!(session.is_empty());
        assert_eq!(session.key, "never-seen");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_appends_preserve_order() {
        let store = SessionStore::new();
        store.append_turn("k", Role::User, "a").await;
        store.append_turn("k", Role::Assistant, "b").await;

        let session = store.get_or_create("k").await;
        assert_eq!(session.turns(), &[Turn::user("a"), Turn::assistant("b")]);
    }

    #[tokio::test]
    async fn test_reset_clears_and_restarts() {
        let store = SessionStore::new();
        store.append_turn("k", Role::User, "a").await;
        store.append_turn("k", Role::Assistant, "b").await;

        store.reset("k").await;
        assert!(store.get_or_create("k").await.is_empty());

        store.append_turn("k", Role::User, "c").await;
        assert_eq!(store.get_or_create("k").await.turns(), &[Turn::user("c")]);
    }

    #[tokio::test]
    async fn test_reset_unknown_key_creates_empty_entry() {
        let store = SessionStore::new();
        store.reset("fresh").await;
        assert_eq!(store.keys().await, vec!["fresh".to_string()]);
        assert!(store.get_or_create("fresh").await.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let store = SessionStore::new();
        store.append_turn("k1", Role::User, "one").await;
        store.append_turn("k2", Role::User, "two").await;

        assert_eq!(store.get_or_create("k1").await.turns(), &[Turn::user("one")]);
        assert_eq!(store.get_or_create("k2").await.turns(), &[Turn::user("two")]);

        store.reset("k1").await;
        assert_eq!(store.get_or_create("k2").await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = SessionStore::new();
        store.append_turn("k", Role::User, "a").await;

        let first = store.get_or_create("k").await;
        let second = store.get_or_create("k").await;
        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_guard_sees_and_extends_transcript() {
        let store = SessionStore::new();
        store.append_turn("k", Role::User, "a").await;

        {
            let mut guard = store.lock("k").await;
            assert_eq!(guard.key(), "k");
            assert_eq!(guard.transcript().len(), 1);
            guard.append_exchange("b", "c");
        }

        let turns = store.get_or_create("k").await.turns().to_vec();
        assert_eq!(
            turns,
            vec![Turn::user("a"), Turn::user("b"), Turn::assistant("c")]
        );
    }

    #[tokio::test]
    async fn test_reset_waits_for_guard() {
        let store = Arc::new(SessionStore::new());
        let mut guard = store.lock("k").await;

        let resetter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.reset("k").await })
        };
        tokio::task::yield_now().await;

        guard.append_exchange("hi", "hello");
        drop(guard);
        resetter.await.unwrap();

        assert!(store.get_or_create("k").await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exchanges_do_not_interleave() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut guard = store.lock("shared").await;
                guard.append_turn(Role::User, format!("q{i}"));
                tokio::task::yield_now().await;
                guard.append_turn(Role::Assistant, format!("a{i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = store.get_or_create("shared").await;
        assert_eq!(session.len(), 64);
        for pair in session.turns().chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(&pair[0].text[1..], &pair[1].text[1..]);
        }
    }
}
