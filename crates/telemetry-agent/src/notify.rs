//! User-visible notifications

use std::sync::{Arc, Mutex};
use tracing::warn;

/// Sink for messages the vehicle owner should see
pub trait Notifier: Send {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "telemetry_agent::notify", "{}", message);
    }
}

/// Records notifications in memory; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_shares_log() {
        let notifier = MemoryNotifier::new();
        let observer = notifier.clone();

        notifier.notify("token missing");
        assert_eq!(observer.messages(), vec!["token missing".to_string()]);
    }
}
