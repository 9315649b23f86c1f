use crate::midi::{MidiEngine, MidiError, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared log of every message a [`MockMidiEngine`] has sent, in order.
pub type SentLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// In-memory transport for tests: records outbound messages and lets the
/// test inject inbound events through the paired sender.
pub struct MockMidiEngine {
    sent: SentLog,
    rx: Option<Receiver<Vec<u8>>>,
    fail_sends: Arc<AtomicBool>,
}

impl MockMidiEngine {
    /// Returns the engine plus the handles a test needs: the sent-message
    /// log and the sender that feeds the inbound channel.
    pub fn new() -> (Self, SentLog, Sender<Vec<u8>>) {
        let (tx, rx) = unbounded();
        let sent: SentLog = Arc::new(Mutex::new(Vec::new()));
        let engine = MockMidiEngine {
            sent: Arc::clone(&sent),
            rx: Some(rx),
            fail_sends: Arc::new(AtomicBool::new(false)),
        };
        (engine, sent, tx)
    }

    /// Flag that makes every subsequent send fail, for transport-failure
    /// scenarios.
    pub fn failure_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_sends)
    }
}

impl MidiEngine for MockMidiEngine {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MidiError::SendError("mock send failure".to_string()));
        }
        self.sent
            .lock()
            .expect("sent log poisoned")
            .push(bytes.to_vec());
        Ok(())
    }

    fn take_receiver(&mut self) -> Option<Receiver<Vec<u8>>> {
        self.rx.take()
    }

    fn port_description(&self) -> String {
        "mock device".to_string()
    }
}
