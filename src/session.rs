use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

/// A single step recorded for audit purposes.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub node_id: String,
    pub trigger: Option<String>,
}

/// A sender's in-memory dialog state.
#[derive(Debug, Clone)]
pub struct Session {
    pub current_node_id: String,
    pub variables: HashMap<String, String>,
    pub history: Vec<HistoryEntry>,
}

impl Session {
    pub fn new(start_node_id: String) -> Self {
        Self {
            current_node_id: start_node_id,
            variables: HashMap::new(),
            history: Vec::new(),
        }
    }

    pub fn record(&mut self, node_id: &str, trigger: Option<&str>) {
        self.history.push(HistoryEntry {
            at: Utc::now(),
            node_id: node_id.to_string(),
            trigger: trigger.map(str::to_string),
        });
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Concurrent sender-id -> [`Session`] map, one `tokio::sync::Mutex` per
/// sender.
///
/// Each request's engine step holds its sender's mutex for the whole step,
/// including the AI-client `.await` when a `gptQuery` node is hit
/// (`tokio::sync::Mutex` is designed to be held across await points, unlike
/// a plain OS mutex guard). Two calls for the same sender therefore
/// serialize exactly like sequential processing (§5); two calls for
/// different senders only ever contend on the `DashMap` shard lock for the
/// instant it takes to fetch or insert their handle, so they otherwise run
/// fully in parallel.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    /// Fetch (or lazily create, positioned at `start_node_id`) the handle
    /// for `sender_id`. Returns whether the session was just created.
    pub fn handle_for(&self, sender_id: &str, start_node_id: &str) -> (SessionHandle, bool) {
        if let Some(existing) = self.sessions.get(sender_id) {
            return (existing.clone(), false);
        }
        let handle: SessionHandle = Arc::new(Mutex::new(Session::new(start_node_id.to_string())));
        match self.sessions.entry(sender_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(handle.clone());
                (handle, true)
            }
        }
    }

    pub fn remove(&self, sender_id: &str) {
        self.sessions.remove(sender_id);
    }

    pub fn clear(&self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
