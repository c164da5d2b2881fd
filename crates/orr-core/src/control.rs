//! Session control: cancel in-flight retry sessions by request id.
//!
//! Each tracked session is registered with a cancellation token. The host (a
//! dropped connection, Ctrl-C, an admin call) cancels by id; the scheduler
//! sees the token at its next pause or during the running attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

struct Entry {
    serial: u64,
    token: CancellationToken,
}

/// Shared registry of request id -> cancellation token.
#[derive(Default)]
pub struct SessionControl {
    sessions: RwLock<HashMap<String, Entry>>,
    next_serial: AtomicU64,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. The returned guard carries the token and removes
    /// the entry when dropped. Registering an id that is already live cancels
    /// the older session.
    pub fn register(self: &Arc<Self>, id: impl Into<String>) -> SessionGuard {
        let id = id.into();
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.clone(),
                Entry {
                    serial,
                    token: token.clone(),
                },
            );
        if let Some(previous) = previous {
            tracing::warn!("session {} registered twice; cancelling the older one", id);
            previous.token.cancel();
        }
        SessionGuard {
            control: Arc::clone(self),
            id,
            serial,
            token,
        }
    }

    /// Cancel one session. Returns false when no such session is live.
    pub fn cancel(&self, id: &str) -> bool {
        match self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live session (shutdown).
    pub fn cancel_all(&self) {
        for entry in self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            entry.token.cancel();
        }
    }

    /// Number of live sessions.
    pub fn active(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn unregister(&self, id: &str, serial: u64) {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if sessions.get(id).is_some_and(|e| e.serial == serial) {
            sessions.remove(id);
        }
    }
}

/// Removes its session from the registry when dropped.
pub struct SessionGuard {
    control: Arc<SessionControl>,
    id: String,
    serial: u64,
    token: CancellationToken,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.control.unregister(&self.id, self.serial);
    }
}
