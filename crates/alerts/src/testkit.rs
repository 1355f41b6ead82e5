//! Recording notifier for tests.

use crate::notifier::{Notifier, NotifyError};
use async_trait::async_trait;
use pricealert_feeds::FeedError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// [`Notifier`] that records every delivered message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far, as `(chat_id, text)`.
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sends attempted, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Http(FeedError::HttpStatus(502)));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat_id, text.to_string()));
        Ok(())
    }
}
