use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Sender};

use padctl::device::{create_shared_launchpad, EngineFactory, Launchpad, SharedLaunchpad};
use padctl::listener::run_input_listener;
use padctl::midi::mock_engine::SentLog;
use padctl::midi::{MidiEngine, MockMidiEngine};
use padctl::mode::Mode;
use padctl::protocol::{self, PadEvent};

fn mock_launchpad() -> (SharedLaunchpad, SentLog, Sender<Vec<u8>>) {
    let (engine, sent, tx) = MockMidiEngine::new();
    let slot = Mutex::new(Some(engine));
    let factory: EngineFactory = Box::new(move || {
        let engine = slot
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| MockMidiEngine::new().0);
        Ok(Box::new(engine) as Box<dyn MidiEngine>)
    });
    let launchpad = Launchpad::connect(factory).expect("mock connect");
    (create_shared_launchpad(launchpad), sent, tx)
}

fn wait_for<F: Fn() -> bool>(predicate: F) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for listener");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn mode_press_matches_explicit_dispatch_byte_for_byte() {
    // Listener path: start in user1, press the session select note.
    let (device, sent, tx) = mock_launchpad();
    device.lock().unwrap().set_mode(Mode::User1).unwrap();
    sent.lock().unwrap().clear();

    let echo = Arc::new(AtomicBool::new(false));
    let listener_device = device.clone();
    let listener_echo = Arc::clone(&echo);
    thread::spawn(move || run_input_listener(listener_device, listener_echo, None));

    tx.send(vec![144, Mode::Session.note(), 100]).unwrap();
    wait_for(|| device.lock().unwrap().current_mode() == Some(Mode::Session));
    let hardware_sequence = sent.lock().unwrap().clone();

    // Explicit path: same starting state, same target, no listener.
    let (device2, sent2, _tx2) = mock_launchpad();
    device2.lock().unwrap().set_mode(Mode::User1).unwrap();
    sent2.lock().unwrap().clear();
    device2.lock().unwrap().set_mode(Mode::Session).unwrap();
    let explicit_sequence = sent2.lock().unwrap().clone();

    assert_eq!(hardware_sequence, explicit_sequence);
}

#[test]
fn note_off_releases_are_ignored() {
    let (device, sent, tx) = mock_launchpad();
    let echo = Arc::new(AtomicBool::new(false));
    let listener_device = device.clone();
    let listener_echo = Arc::clone(&echo);
    thread::spawn(move || run_input_listener(listener_device, listener_echo, None));

    // velocity 0 is a release, not a press
    tx.send(vec![144, Mode::Mixer.note(), 0]).unwrap();
    // a press on a non-mode note does nothing either
    tx.send(vec![144, 55, 100]).unwrap();
    // follow with a real press so we know the earlier events were consumed
    tx.send(vec![144, Mode::Mixer.note(), 100]).unwrap();

    wait_for(|| device.lock().unwrap().current_mode() == Some(Mode::Mixer));
    let log = sent.lock().unwrap();
    // Only the one mixer transition is on the wire: layout select plus four
    // indicator paints, nothing for the ignored events.
    assert_eq!(log.len(), 5);
    assert_eq!(log[0], protocol::mode_select(0x04));
}

#[test]
fn echo_flag_gates_the_observer() {
    let (device, _sent, tx) = mock_launchpad();
    let echo = Arc::new(AtomicBool::new(false));
    let (observer_tx, observer_rx) = unbounded();

    let listener_device = device.clone();
    let listener_echo = Arc::clone(&echo);
    thread::spawn(move || run_input_listener(listener_device, listener_echo, Some(observer_tx)));

    // echo off: classified events are not surfaced
    tx.send(vec![144, 55, 100]).unwrap();
    assert!(observer_rx
        .recv_timeout(Duration::from_millis(100))
        .is_err());

    echo.store(true, Ordering::SeqCst);
    tx.send(vec![149, 56, 42]).unwrap();
    let event = observer_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("echoed event");
    assert_eq!(
        event,
        PadEvent {
            status: 149,
            note: 56,
            velocity: 42
        }
    );
}
