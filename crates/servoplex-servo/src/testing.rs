use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::LinkError;
use crate::link::{RemoteCommand, RemoteLink};

/// Link that records every successful command and can fail one attempt.
#[derive(Default)]
pub(crate) struct RecordingLink {
    commands: Mutex<Vec<RemoteCommand>>,
    attempts: AtomicUsize,
    fail_at: Option<usize>,
}

impl RecordingLink {
    /// Fail the attempt with zero-based index `attempt`.
    pub(crate) fn failing_at(attempt: usize) -> Self {
        Self {
            fail_at: Some(attempt),
            ..Self::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<RemoteCommand> {
        self.commands.lock().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl RemoteLink for RecordingLink {
    fn send(&self, command: RemoteCommand) -> Result<(), LinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(attempt) {
            return Err(LinkError::Transport {
                url: format!("test://{command}"),
                message: "injected failure".to_string(),
            });
        }
        self.commands.lock().push(command);
        Ok(())
    }
}
