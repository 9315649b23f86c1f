use std::error::Error;
use std::fmt;

use crossbeam::channel::Receiver;

/// Custom error type for MIDI operations
#[derive(Debug)]
pub enum MidiError {
    /// A write into the output port failed; the operation may have had a
    /// partial effect on the device.
    SendError(String),
    /// The inbound channel failed or delivered nothing usable.
    RecvError(String),
    /// No matching port was found, or the port is closed. Distinct from the
    /// other kinds so callers can reconnect instead of retrying a command.
    ConnectionError(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::SendError(msg) => write!(f, "MIDI send error: {}", msg),
            MidiError::RecvError(msg) => write!(f, "MIDI receive error: {}", msg),
            MidiError::ConnectionError(msg) => write!(f, "MIDI connection error: {}", msg),
        }
    }
}

impl Error for MidiError {}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// Bidirectional byte transport to the device. Outbound messages go through
/// [`send`](MidiEngine::send); inbound traffic arrives on the channel handed
/// out by [`take_receiver`](MidiEngine::take_receiver), one message per
/// hardware event, in delivery order.
pub trait MidiEngine: Send {
    /// Writes one complete MIDI message to the device.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Hands the inbound receiver to the caller. The input listener takes it
    /// once per connection; subsequent calls return `None`.
    fn take_receiver(&mut self) -> Option<Receiver<Vec<u8>>>;

    /// Human-readable description of the connected ports, for logs.
    fn port_description(&self) -> String;
}
