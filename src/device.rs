//! Launchpad device handle
//!
//! [`Launchpad`] owns the output side of the transport and the mode state
//! machine, and is shared as `Arc<Mutex<Launchpad>>`. One mutex guards both:
//! a mode transition or a multi-note paint is several wire messages, and the
//! guard is held for the whole sequence so a hardware-triggered transition
//! and a dispatcher command cannot interleave on the port. The clock
//! generator takes the same lock for each single pulse and sleeps with the
//! lock released.

use std::sync::{Arc, Mutex};

use crate::midi::{MidiEngine, Result};
use crate::mode::{Mode, ModeMachine};
use crate::protocol::{self, ALL_NOTES};

/// Builds a fresh engine for the initial connection and for `reconnect`.
pub type EngineFactory = Box<dyn Fn() -> Result<Box<dyn MidiEngine>> + Send>;

/// Shared handle to the device; the mutex is the write lock described above.
pub type SharedLaunchpad = Arc<Mutex<Launchpad>>;

pub struct Launchpad {
    engine: Box<dyn MidiEngine>,
    connect: EngineFactory,
    mode: ModeMachine,
    generation: u64,
}

/// Wraps a [`Launchpad`] for sharing across the dispatcher, the input
/// listener and the clock generator.
pub fn create_shared_launchpad(launchpad: Launchpad) -> SharedLaunchpad {
    Arc::new(Mutex::new(launchpad))
}

impl Launchpad {
    /// Connects through the factory and keeps it around for reconnects.
    pub fn connect(factory: EngineFactory) -> Result<Self> {
        let engine = factory()?;
        Ok(Launchpad {
            engine,
            connect: factory,
            mode: ModeMachine::new(),
            generation: 0,
        })
    }

    /// Drops the current engine and opens a fresh one. Bumps the generation
    /// counter so in-flight clock runs notice the old port is gone and stop
    /// with a partial count instead of writing into a closed transport.
    pub fn reconnect(&mut self) -> Result<()> {
        let engine = (self.connect)()?;
        self.engine = engine;
        self.generation += 1;
        log::info!(
            "Reconnected to {} (generation {})",
            self.engine.port_description(),
            self.generation
        );
        Ok(())
    }

    /// Incremented on every reconnect; clock runs capture it at start.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.mode.current()
    }

    pub fn port_description(&self) -> String {
        self.engine.port_description()
    }

    /// Hands out the inbound receiver of the current engine, if it has not
    /// been taken yet. The input listener calls this at startup and again
    /// after a reconnect.
    pub fn take_receiver(&mut self) -> Option<crossbeam::channel::Receiver<Vec<u8>>> {
        self.engine.take_receiver()
    }

    /// Switches the device to `target`. Returns `false` when the target was
    /// already current and nothing was sent. The state commits only after
    /// the full indicator sequence went out, so a mid-sequence send failure
    /// leaves the machine ready to re-issue the whole transition.
    pub fn set_mode(&mut self, target: Mode) -> Result<bool> {
        let Some(messages) = self.mode.plan_transition(target) else {
            return Ok(false);
        };
        for message in &messages {
            self.engine.send(message)?;
        }
        self.mode.commit(target);
        log::info!("Mode switched to {}", target.name());
        Ok(true)
    }

    /// Turns off every pad.
    pub fn clear(&mut self) -> Result<()> {
        self.engine.send(&protocol::clear())
    }

    /// Paints `notes` with one RGB triple, one message per note.
    pub fn solid_rgb(&mut self, r: u8, g: u8, b: u8, notes: &[u8]) -> Result<()> {
        for &note in notes {
            self.engine.send(&protocol::solid_rgb(note, r, g, b))?;
        }
        Ok(())
    }

    /// Sets `notes` to a palette color. The literal full note set goes out
    /// as one bulk message; any other set is painted note by note, in input
    /// order.
    pub fn palette(&mut self, color: u8, notes: &[u8]) -> Result<()> {
        if notes == ALL_NOTES.as_slice() {
            self.engine.send(&protocol::palette_all(color))
        } else {
            for &note in notes {
                self.engine.send(&protocol::palette_note(note, color))?;
            }
            Ok(())
        }
    }

    /// Runs a pulse/flash effect across every pad with one palette color.
    pub fn effect(&mut self, effect_code: u8, color: u8) -> Result<()> {
        for &note in ALL_NOTES.iter() {
            self.engine.send(&protocol::effect(effect_code, note, color))?;
        }
        Ok(())
    }

    /// Scrolls an ASCII message across the grid.
    pub fn text(&mut self, color: u8, speed: u8, message: &str) -> Result<()> {
        self.engine.send(&protocol::text(color, 0x00, speed, message))
    }

    /// Sends a caller-supplied payload wrapped with the vendor header.
    pub fn send_sysex(&mut self, payload: &[u8]) -> Result<()> {
        self.engine.send(&protocol::wrap_sysex(payload))
    }

    /// Sends caller-supplied bytes untouched.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.engine.send(bytes)
    }

    /// Sends one timing pulse.
    pub fn send_clock_pulse(&mut self) -> Result<()> {
        self.engine.send(&protocol::clock_pulse())
    }

    /// Best-effort shutdown: blank the pads, ignore a dead port.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.clear() {
            log::warn!("Clear on shutdown failed: {}", e);
        }
    }
}
