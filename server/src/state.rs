//! Process-wide state: the SSE session registry.
//!
//! A session is created when a client opens the stream. It carries the
//! credential headers captured at that moment (the per-session props bag)
//! and the channel responses are relayed over. Nothing else outlives a
//! request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use personalize_core::credentials::CredentialParts;
use serde_json::Value;
use tokio::sync::mpsc;

/// Queue depth per session before a slow consumer backpressures posts.
const SESSION_CHANNEL_CAPACITY: usize = 32;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<HashMap<String, SseSession>>>,
}

#[derive(Clone)]
pub struct SseSession {
    pub credentials: CredentialParts,
    sender: mpsc::Sender<Value>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a streaming session; returns the receiver the SSE stream
    /// drains.
    pub fn open_session(
        &self,
        session_id: &str,
        credentials: CredentialParts,
    ) -> mpsc::Receiver<Value> {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            session_id.to_string(),
            SseSession {
                credentials,
                sender,
            },
        );
        receiver
    }

    pub fn session(&self, session_id: &str) -> Option<SseSession> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned()
    }

    pub fn close_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}

impl SseSession {
    /// Relay one JSON-RPC response onto the stream. A `false` return means
    /// the client went away and the session should be closed.
    pub async fn relay(&self, message: Value) -> bool {
        self.sender.send(message).await.is_ok()
    }
}
