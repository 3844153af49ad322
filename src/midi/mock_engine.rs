use crate::midi::{MidiEngine, MidiError, MidiMessage, Result};
use std::sync::{Arc, Mutex};

/// Engine that records everything sent to it.
///
/// Clones share the same log, so a test can hand one clone to the player and
/// inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockMidiEngine {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<MidiMessage>,
    fail_after: Option<usize>,
    closed: bool,
}

impl MockMidiEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `count` messages, then fails every send.
    pub fn failing_after(count: usize) -> Self {
        let engine = Self::default();
        engine.lock().fail_after = Some(count);
        engine
    }

    pub fn sent(&self) -> Vec<MidiMessage> {
        self.lock().sent.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the log from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MidiEngine for MockMidiEngine {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(MidiError::SendError("mock output is closed".to_string()));
        }
        if state.fail_after.is_some_and(|limit| state.sent.len() >= limit) {
            return Err(MidiError::SendError("mock output unavailable".to_string()));
        }
        state.sent.push(msg);
        Ok(())
    }

    fn close(&mut self) {
        self.lock().closed = true;
    }
}
