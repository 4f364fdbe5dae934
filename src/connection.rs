use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection state handed to the dispatcher alongside each command.
#[derive(Debug)]
pub struct ClientState {
    pub id: u64,
    /// Set by AUTH; pre-set when no password is configured.
    pub authenticated: bool,
}

impl ClientState {
    pub fn new() -> Self {
        ClientState {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            authenticated: false,
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
