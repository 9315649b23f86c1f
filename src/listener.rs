//! Hardware input listener
//!
//! A dedicated thread owns the inbound channel and handles each event in
//! delivery order, exactly once: a note-on for one of the four mode-select
//! notes triggers the same transition an explicit `mode` command would, and
//! when echo is enabled the classified event is logged and forwarded to the
//! observer. The event path never sleeps or waits on I/O; the only blocking
//! is the mode-transition writes themselves, taken under the device lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

use crate::device::SharedLaunchpad;
use crate::mode::Mode;
use crate::protocol::{self, PadEvent};

/// Consumes inbound events until the transport goes away for good.
pub fn run_input_listener(
    device: SharedLaunchpad,
    echo: Arc<AtomicBool>,
    observer: Option<Sender<PadEvent>>,
) {
    let Some(mut rx) = take_receiver(&device) else {
        log::error!("Inbound channel already taken, input listener exiting");
        return;
    };
    log::info!("Input listener started");

    loop {
        match rx.recv() {
            Ok(bytes) => handle_event(&device, &echo, observer.as_ref(), &bytes),
            Err(_) => {
                // The engine was dropped, usually by a reconnect. Pick up
                // the replacement engine's channel if there is one.
                match take_receiver(&device) {
                    Some(new_rx) => {
                        log::info!("Input listener rebound after reconnect");
                        rx = new_rx;
                    }
                    None => {
                        log::info!("Inbound channel closed, input listener exiting");
                        return;
                    }
                }
            }
        }
    }
}

fn take_receiver(device: &SharedLaunchpad) -> Option<Receiver<Vec<u8>>> {
    device.lock().ok()?.take_receiver()
}

fn handle_event(
    device: &SharedLaunchpad,
    echo: &AtomicBool,
    observer: Option<&Sender<PadEvent>>,
    bytes: &[u8],
) {
    let Some(event) = protocol::classify_inbound(bytes) else {
        return;
    };

    // A press (non-zero velocity) on a mode-select note switches modes; a
    // release is ignored.
    if event.velocity > 0 {
        if let Some(target) = Mode::from_note(event.note) {
            match device.lock() {
                Ok(mut guard) => {
                    if let Err(e) = guard.set_mode(target) {
                        log::error!("Hardware mode switch to {} failed: {}", target.name(), e);
                    }
                }
                Err(_) => log::error!("Device lock poisoned, dropping mode press"),
            }
        }
    }

    if echo.load(Ordering::SeqCst) {
        let label = Mode::from_status(event.status)
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| format!("0x{:X}", event.status));
        log::info!(
            "MIDI input: [{}] note={} velocity={}",
            label,
            event.note,
            event.velocity
        );
        if let Some(tx) = observer {
            let _ = tx.send(event);
        }
    }
}
