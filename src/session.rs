//! Session Store
//!
//! Per-user in-memory state owned by the pipeline:
//! - Bounded conversation history (oldest evicted first)
//! - Pending message fragments awaiting the debounce window
//! - Last language-model request instant for rate limiting
//!
//! Sessions are created lazily and live until restart. The lock is never
//! held across an `.await`; every operation is one short critical section,
//! so callers must assume other tasks ran between any two calls.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of history entries kept per user
pub const DEFAULT_MAX_HISTORY: usize = 16;

/// Opaque chat-platform user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single remembered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Role,
    pub content: String,
}

impl MemoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Mutable state for one user
#[derive(Debug, Default)]
struct UserSession {
    history: VecDeque<MemoryEntry>,
    last_request_at: Option<Instant>,
    pending: Vec<String>,
    last_fragment_at: Option<Instant>,
    /// Bumped on every fragment; a debounced turn only fires if it still
    /// holds the latest value.
    generation: u64,
}

/// Read-only copy of a session for inspection
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub history: Vec<MemoryEntry>,
    pub pending: Vec<String>,
    pub generation: u64,
    pub last_request_at: Option<Instant>,
    pub last_fragment_at: Option<Instant>,
}

/// All user sessions
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, UserSession>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Snapshot of a user's session, if one exists
    pub fn get(&self, user: UserId) -> Option<SessionSnapshot> {
        let sessions = self.sessions.lock();
        sessions.get(&user).map(|s| SessionSnapshot {
            history: s.history.iter().cloned().collect(),
            pending: s.pending.clone(),
            generation: s.generation,
            last_request_at: s.last_request_at,
            last_fragment_at: s.last_fragment_at,
        })
    }

    /// Append to history, evicting the oldest entries beyond the cap
    pub fn put(&self, user: UserId, entry: MemoryEntry) {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(user).or_default();
        session.history.push_back(entry);
        while session.history.len() > self.max_history {
            session.history.pop_front();
        }
    }

    /// Shorthand for [`put`](Self::put)
    pub fn remember(&self, user: UserId, role: Role, content: &str) {
        self.put(user, MemoryEntry { role, content: content.to_string() });
    }

    /// Drop and return the oldest history entry
    pub fn evict_oldest(&self, user: UserId) -> Option<MemoryEntry> {
        let mut sessions = self.sessions.lock();
        sessions.get_mut(&user).and_then(|s| s.history.pop_front())
    }

    /// Full history in chronological order
    pub fn history(&self, user: UserId) -> Vec<MemoryEntry> {
        self.recent(user, usize::MAX)
    }

    /// The last `limit` history entries in chronological order
    pub fn recent(&self, user: UserId, limit: usize) -> Vec<MemoryEntry> {
        let sessions = self.sessions.lock();
        match sessions.get(&user) {
            Some(s) => {
                let skip = s.history.len().saturating_sub(limit);
                s.history.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn history_len(&self, user: UserId) -> usize {
        let sessions = self.sessions.lock();
        sessions.get(&user).map(|s| s.history.len()).unwrap_or(0)
    }

    /// Buffer a fragment and return the generation that now owns the turn
    pub fn push_fragment(&self, user: UserId, text: &str) -> u64 {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(user).or_default();
        session.pending.push(text.to_string());
        session.last_fragment_at = Some(Instant::now());
        session.generation += 1;
        session.generation
    }

    /// Drain the buffer into one turn if `generation` is still the latest.
    ///
    /// Returns `None` when a newer fragment arrived or another task already
    /// drained the buffer.
    pub fn take_turn(&self, user: UserId, generation: u64) -> Option<String> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&user)?;
        if session.generation != generation || session.pending.is_empty() {
            return None;
        }
        let fragments = std::mem::take(&mut session.pending);
        Some(fragments.join(" "))
    }

    /// Claim the user's next language-model slot.
    ///
    /// Returns how long the caller must wait before sending. The slot is
    /// recorded immediately so concurrent callers queue behind each other.
    pub fn reserve_request_slot(&self, user: UserId, min_interval: Duration) -> Duration {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(user).or_default();

        let slot = match session.last_request_at {
            Some(last) => (last + min_interval).max(now),
            None => now,
        };
        session.last_request_at = Some(slot);
        slot - now
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(12345);

    #[test]
    fn test_history_evicts_oldest_first() {
        let store = SessionStore::new(3);
        for i in 0..5 {
            store.remember(USER, Role::User, &format!("Message {}", i));
            assert!(store.history_len(USER) <= 3);
        }

        let history = store.history(USER);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "Message 2");
        assert_eq!(history[2].content, "Message 4");
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let store = SessionStore::new(16);
        store.put(USER, MemoryEntry::user("a"));
        store.put(USER, MemoryEntry::assistant("b"));
        store.put(USER, MemoryEntry::user("c"));

        let recent = store.recent(USER, 2);
        assert_eq!(recent, vec![MemoryEntry::assistant("b"), MemoryEntry::user("c")]);
        assert!(store.recent(UserId(1), 10).is_empty());
    }

    #[test]
    fn test_evict_oldest() {
        let store = SessionStore::new(4);
        store.put(USER, MemoryEntry::user("first"));
        store.put(USER, MemoryEntry::user("second"));

        assert_eq!(store.evict_oldest(USER), Some(MemoryEntry::user("first")));
        assert_eq!(store.history_len(USER), 1);
        assert_eq!(store.evict_oldest(UserId(999)), None);
    }

    #[test]
    fn test_user_isolation() {
        let store = SessionStore::default();
        store.remember(UserId(111), Role::User, "Chat 1 message");
        store.remember(UserId(222), Role::User, "Chat 2 message");

        assert_eq!(store.history(UserId(111)).len(), 1);
        assert_eq!(store.history(UserId(222))[0].content, "Chat 2 message");
        assert_eq!(store.history_len(UserId(333)), 0);
    }

    #[test]
    fn test_take_turn_requires_latest_generation() {
        let store = SessionStore::default();
        let first = store.push_fragment(USER, "I feel");
        let second = store.push_fragment(USER, "really");

        assert_eq!(store.take_turn(USER, first), None);
        assert_eq!(store.take_turn(USER, second), Some("I feel really".to_string()));
        // Already drained
        assert_eq!(store.take_turn(USER, second), None);
    }

    #[test]
    fn test_take_turn_unknown_user() {
        let store = SessionStore::default();
        assert_eq!(store.take_turn(USER, 1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserve_request_slot_spaces_requests() {
        let store = SessionStore::default();
        let interval = Duration::from_secs(1);

        assert_eq!(store.reserve_request_slot(USER, interval), Duration::ZERO);
        // Immediate second call must wait a full interval
        assert_eq!(store.reserve_request_slot(USER, interval), interval);
        // A third queues behind the second
        assert_eq!(store.reserve_request_slot(USER, interval), interval * 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.reserve_request_slot(USER, interval), Duration::ZERO);
        // Other users are unaffected
        assert_eq!(store.reserve_request_slot(UserId(7), interval), Duration::ZERO);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&MemoryEntry::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
