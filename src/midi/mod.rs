//! MIDI transport and timing for padctl
//!
//! This module provides the byte-level device channel, including:
//! - Core transport trait and error handling
//! - Real device communication via midir
//! - A recording mock for tests
//! - Timed MIDI clock pulse generation
//!
//! The main components are:
//! - [`MidiEngine`] trait for sending bytes and taking the inbound channel
//! - [`MidirEngine`] for real MIDI device communication
//! - [`MockMidiEngine`] for testing
//! - [`ClockGenerator`] and [`ClockHandle`] for tempo runs
//!
mod engine;

pub mod clock;
pub mod midir_engine;
pub mod mock_engine;

// Re-export main types from engine
pub use engine::{MidiEngine, MidiError, Result};

// Re-export concrete implementations
pub use midir_engine::MidirEngine;
pub use mock_engine::MockMidiEngine;

// Re-export clock functionality
pub use clock::{ClockGenerator, ClockHandle, ClockOutcome, ClockStatus};

// Set default engine type
pub type DefaultMidiEngine = MidirEngine;
