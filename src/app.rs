use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::Session;

/// State shared by all request handlers.
///
/// The session sits behind an async mutex: each operation holds the lock for
/// its whole round-trip, so concurrent requests queue up on the one
/// connection instead of interleaving on it.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}
