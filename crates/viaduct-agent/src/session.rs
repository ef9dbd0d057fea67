//! Per-`(userId, chatId)` conversation state, keyed and owned exclusively by
//! `SessionManager`. The Orchestrator borrows a session for the duration of
//! one turn via `SessionHandle::lock`, which doubles as the per-session
//! mutex §5 requires to serialize turns from the same user.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard};
use viaduct::Message;

use crate::policy::PolicySession;

/// Oldest user/assistant messages are dropped first, in pairs, once history
/// exceeds this length — never leaving an orphaned half of a pair.
pub const MAX_HISTORY: usize = 20;

/// A session is evicted by `sweep()` once it has been idle this long.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Recommended interval between `sweep()` calls; not enforced by this module.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// The mutable state guarded by a session's mutex.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user_id: String,
    pub chat_id: String,
    pub history: Vec<Message>,
    /// Set by stateful providers (Responses API); echoed back on the next call.
    pub provider_response_id: Option<String>,
    pub allowed_tools: Option<HashSet<String>>,
    pub denied_tools: HashSet<String>,
}

impl Session {
    fn new(user_id: String, chat_id: String) -> Self {
        Session {
            user_id,
            chat_id,
            history: Vec::new(),
            provider_response_id: None,
            allowed_tools: None,
            denied_tools: HashSet::new(),
        }
    }

    /// Appends a message, then trims `history` back down to `MAX_HISTORY` by
    /// dropping whole pairs from the front so a trailing tool-result never
    /// loses the user turn that prompted it.
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
        while self.history.len() > MAX_HISTORY {
            let drop_count = if self.history.len() - MAX_HISTORY >= 2 { 2 } else { 1 };
            self.history.drain(0..drop_count);
        }
    }

    /// The view the policy engine consults: user/chat id plus the
    /// session-level allow/deny lists.
    pub fn policy_session(&self) -> PolicySession {
        PolicySession {
            user_id: self.user_id.clone(),
            chat_id: self.chat_id.clone(),
            allowed_tools: self.allowed_tools.clone(),
            denied_tools: self.denied_tools.clone(),
        }
    }
}

/// Jointly owned by `SessionManager`'s map and whichever orchestrator turn is
/// currently in flight; lifetime is the longer of the two (see `spec.md`
/// §3's Ownership note).
pub struct SessionHandle {
    pub user_id: String,
    pub chat_id: String,
    state: Mutex<Session>,
    /// Kept outside the async mutex so `sweep()` can read it without
    /// contending with an in-flight turn holding `state` locked.
    last_activity: StdMutex<Instant>,
}

impl SessionHandle {
    fn new(user_id: String, chat_id: String) -> Self {
        let session = Session::new(user_id.clone(), chat_id.clone());
        SessionHandle {
            user_id,
            chat_id,
            state: Mutex::new(session),
            last_activity: StdMutex::new(Instant::now()),
        }
    }

    /// Acquires the per-session mutex for the duration of one turn.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().await
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock().expect("last_activity mutex poisoned")
    }

    fn touch(&self) {
        *self.last_activity.lock().expect("last_activity mutex poisoned") = Instant::now();
    }
}

/// Sessions keyed by `(userId, chatId)`, with activity-based eviction.
#[derive(Default)]
pub struct SessionManager {
    sessions: StdMutex<HashMap<(String, String), Arc<SessionHandle>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            sessions: StdMutex::new(HashMap::new()),
        }
    }

    /// Looks up or creates the session for `(user_id, chat_id)`, updating
    /// `lastActivity` either way.
    pub fn get_or_create(&self, user_id: &str, chat_id: &str) -> Arc<SessionHandle> {
        let key = (user_id.to_string(), chat_id.to_string());
        let mut sessions = self.sessions.lock().expect("session map mutex poisoned");
        let handle = sessions
            .entry(key)
            .or_insert_with(|| Arc::new(SessionHandle::new(user_id.to_string(), chat_id.to_string())))
            .clone();
        handle.touch();
        handle
    }

    /// Removes a session outright, e.g. on an explicit user-initiated reset.
    pub fn clear(&self, user_id: &str, chat_id: &str) -> bool {
        let key = (user_id.to_string(), chat_id.to_string());
        self.sessions
            .lock()
            .expect("session map mutex poisoned")
            .remove(&key)
            .is_some()
    }

    /// Evicts every session idle for longer than `SESSION_TIMEOUT`. Returns
    /// the number evicted. An in-flight turn is not interrupted by eviction:
    /// the orchestrator holds its own `Arc<SessionHandle>` clone.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session map mutex poisoned");
        let before = sessions.len();
        sessions.retain(|_, handle| now.duration_since(handle.last_activity()) <= SESSION_TIMEOUT);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawns a background task that calls `sweep()` on `SWEEP_PERIOD`, for
/// callers (the CLI binary) that want the periodic sweep wired up without
/// hand-rolling the interval loop.
pub fn spawn_sweeper(manager: Arc<SessionManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_PERIOD);
        loop {
            interval.tick().await;
            let evicted = manager.sweep();
            if evicted > 0 {
                log::debug!("session sweep evicted {} idle session(s)", evicted);
            }
        }
    })
}

/// Epoch-counter helper only used in tests to simulate an idle session
/// without sleeping real wall-clock time.
#[cfg(test)]
fn backdate(handle: &SessionHandle, by: Duration) {
    *handle.last_activity.lock().unwrap() = Instant::now() - by;
}
