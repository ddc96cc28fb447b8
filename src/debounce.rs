//! Message Debouncer
//!
//! Users often send one thought as several quick messages. Each fragment is
//! buffered and the turn only fires once the user has been quiet for the
//! wait window; invocations superseded by a newer fragment return without
//! responding and the newest one owns the reply.
//!
//! Buffering ([`Debouncer::push`]) is synchronous so the transport can call
//! it in arrival order before handing the wait off to a task.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::session::{SessionStore, UserId};

/// Default quiet period before a buffered turn is processed
pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// Result of submitting a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub should_respond: bool,
    pub combined_text: String,
}

impl Decision {
    fn respond(combined_text: String) -> Self {
        Self { should_respond: true, combined_text }
    }

    fn skip() -> Self {
        Self { should_respond: false, combined_text: String::new() }
    }
}

/// Coalesces rapid fragments per user
#[derive(Clone)]
pub struct Debouncer {
    sessions: Arc<SessionStore>,
    wait: Duration,
}

impl Debouncer {
    pub fn new(sessions: Arc<SessionStore>, wait: Duration) -> Self {
        Self { sessions, wait }
    }

    /// Buffer `text`; returns the generation the caller waits on
    pub fn push(&self, user: UserId, text: &str) -> u64 {
        self.sessions.push_fragment(user, text)
    }

    /// Buffer `text` and, once the window passes, return the combined turn
    /// if no newer fragment arrived in the meantime.
    pub async fn submit(&self, user: UserId, text: &str) -> Decision {
        let generation = self.push(user, text);
        self.wait_for_turn(user, generation).await
    }

    /// Sleep out the window for a fragment buffered at `generation`
    pub async fn wait_for_turn(&self, user: UserId, generation: u64) -> Decision {
        tokio::time::sleep(self.wait).await;

        match self.sessions.take_turn(user, generation) {
            Some(combined) => {
                debug!("Turn ready for user {} (generation {})", user, generation);
                Decision::respond(combined)
            }
            None => {
                debug!("Fragment from user {} superseded (generation {})", user, generation);
                Decision::skip()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debouncer {
        Debouncer::new(Arc::new(SessionStore::default()), DEFAULT_WAIT)
    }

    async fn submit_after(d: &Debouncer, delay_ms: u64, user: UserId, text: &str) -> Decision {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        d.submit(user, text).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_fragment_responds() {
        let d = debouncer();
        let decision = d.submit(UserId(1), "hello").await;
        assert!(decision.should_respond);
        assert_eq!(decision.combined_text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_fragments_coalesce() {
        let d = debouncer();
        let user = UserId(42);

        let (a, b, c) = tokio::join!(
            submit_after(&d, 0, user, "I feel"),
            submit_after(&d, 500, user, "really"),
            submit_after(&d, 1000, user, "anxious"),
        );

        assert!(!a.should_respond);
        assert!(!b.should_respond);
        assert!(c.should_respond);
        assert_eq!(c.combined_text, "I feel really anxious");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_outside_window_are_separate_turns() {
        let d = debouncer();
        let user = UserId(42);

        let (a, b) = tokio::join!(
            submit_after(&d, 0, user, "first"),
            submit_after(&d, 4000, user, "second"),
        );

        assert_eq!(a.combined_text, "first");
        assert_eq!(b.combined_text, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_order_decides_turn_text() {
        let d = debouncer();
        let user = UserId(9);

        let first = d.push(user, "I feel");
        let second = d.push(user, "really");

        // Waiters may be polled in any order; the buffer keeps arrival order
        let (b, a) = tokio::join!(d.wait_for_turn(user, second), d.wait_for_turn(user, first));

        assert!(!a.should_respond);
        assert!(b.should_respond);
        assert_eq!(b.combined_text, "I feel really");
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_do_not_interfere() {
        let d = debouncer();

        let (a, b) = tokio::join!(
            submit_after(&d, 0, UserId(1), "mine"),
            submit_after(&d, 100, UserId(2), "yours"),
        );

        assert!(a.should_respond && b.should_respond);
        assert_eq!(a.combined_text, "mine");
        assert_eq!(b.combined_text, "yours");
    }
}
