//! MIDI clock generation
//!
//! A tempo run emits timing pulses at `60 / (bpm * 24)` seconds per pulse
//! (24 pulses per quarter note). Each iteration locks the shared device just
//! long enough for one send, then sleeps with the lock released so mode and
//! color commands are not starved mid-run. Sleep deadlines are computed from
//! a monotonic anchor, not accumulated, so drift stays bounded over long
//! runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::device::SharedLaunchpad;

/// Pulses per quarter note, standard MIDI timing.
pub const PULSES_PER_QUARTER: u32 = 24;

/// How a tempo run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    /// The requested pulse count was sent.
    Completed,
    /// Cancellation was observed between pulses.
    Canceled,
    /// The transport was reconnected or the port died mid-run.
    Disconnected,
}

/// Final report of a tempo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOutcome {
    pub pulses_sent: u64,
    pub status: ClockStatus,
}

/// Cancel/progress handle for an active tempo run. Owned by the dispatcher;
/// the run itself owns its thread.
pub struct ClockHandle {
    running: Arc<AtomicBool>,
    pulses: Arc<AtomicU64>,
    thread: Option<JoinHandle<ClockOutcome>>,
    bpm: u32,
}

impl ClockHandle {
    /// Requests cancellation. Takes effect before the next pulse; an
    /// in-flight send is never interrupted.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Pulses actually sent so far.
    pub fn pulses_sent(&self) -> u64 {
        self.pulses.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Waits for the run thread and returns its outcome.
    pub fn join(mut self) -> ClockOutcome {
        let pulses = Arc::clone(&self.pulses);
        match self.thread.take() {
            Some(handle) => handle.join().unwrap_or(ClockOutcome {
                pulses_sent: pulses.load(Ordering::SeqCst),
                status: ClockStatus::Disconnected,
            }),
            None => ClockOutcome {
                pulses_sent: pulses.load(Ordering::SeqCst),
                status: ClockStatus::Canceled,
            },
        }
    }

    /// Cancels and waits, reporting the partial count.
    pub fn cancel_and_join(self) -> ClockOutcome {
        self.cancel();
        self.join()
    }
}

/// Spawns tempo runs against a shared device.
pub struct ClockGenerator;

impl ClockGenerator {
    /// Starts a run of `count` pulses (`None` for an unbounded run; the
    /// command surface only ever passes a bounded count) at `bpm`.
    pub fn start(device: SharedLaunchpad, bpm: u32, count: Option<u64>) -> ClockHandle {
        let period =
            Duration::from_secs_f64(60.0 / (f64::from(bpm) * f64::from(PULSES_PER_QUARTER)));
        let running = Arc::new(AtomicBool::new(true));
        let pulses = Arc::new(AtomicU64::new(0));

        let thread_running = Arc::clone(&running);
        let thread_pulses = Arc::clone(&pulses);

        let thread = thread::spawn(move || {
            run_pulse_loop(device, period, count, thread_running, thread_pulses)
        });

        log::info!(
            "Clock run started: {} BPM, {:?} pulses, {:?} period",
            bpm,
            count,
            period
        );

        ClockHandle {
            running,
            pulses,
            thread: Some(thread),
            bpm,
        }
    }
}

fn run_pulse_loop(
    device: SharedLaunchpad,
    period: Duration,
    count: Option<u64>,
    running: Arc<AtomicBool>,
    pulses: Arc<AtomicU64>,
) -> ClockOutcome {
    let generation = match device.lock() {
        Ok(guard) => guard.generation(),
        Err(_) => {
            return ClockOutcome {
                pulses_sent: 0,
                status: ClockStatus::Disconnected,
            }
        }
    };

    let anchor = Instant::now();
    let mut sent: u64 = 0;

    loop {
        if count.is_some_and(|max| sent >= max) {
            log::info!("Clock run completed after {} pulses", sent);
            return ClockOutcome {
                pulses_sent: sent,
                status: ClockStatus::Completed,
            };
        }
        if !running.load(Ordering::SeqCst) {
            log::info!("Clock run canceled after {} pulses", sent);
            return ClockOutcome {
                pulses_sent: sent,
                status: ClockStatus::Canceled,
            };
        }

        // Lock, write one pulse, unlock. Never sleep while holding the lock.
        {
            let mut guard = match device.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    return ClockOutcome {
                        pulses_sent: sent,
                        status: ClockStatus::Disconnected,
                    }
                }
            };
            if guard.generation() != generation {
                log::warn!(
                    "Transport reconnected mid-run, stopping after {} pulses",
                    sent
                );
                return ClockOutcome {
                    pulses_sent: sent,
                    status: ClockStatus::Disconnected,
                };
            }
            if let Err(e) = guard.send_clock_pulse() {
                log::error!("Clock pulse send failed after {} pulses: {}", sent, e);
                return ClockOutcome {
                    pulses_sent: sent,
                    status: ClockStatus::Disconnected,
                };
            }
        }

        sent += 1;
        pulses.store(sent, Ordering::SeqCst);

        if count == Some(sent) {
            log::info!("Clock run completed after {} pulses", sent);
            return ClockOutcome {
                pulses_sent: sent,
                status: ClockStatus::Completed,
            };
        }

        // Deadline from the anchor, so per-iteration jitter never
        // accumulates into drift.
        let deadline = anchor + period * u32::try_from(sent).unwrap_or(u32::MAX);
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}
