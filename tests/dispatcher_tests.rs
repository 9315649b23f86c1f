use std::sync::atomic::Ordering;
use std::sync::Mutex;

use padctl::commands::{
    CommandContext, CommandError, CommandOutcome, Dispatcher, ExposureProfile,
};
use padctl::device::{create_shared_launchpad, EngineFactory, Launchpad};
use padctl::midi::mock_engine::SentLog;
use padctl::midi::{MidiEngine, MockMidiEngine};
use padctl::protocol;

fn mock_dispatcher() -> (Dispatcher, SentLog) {
    let (engine, sent, _tx) = MockMidiEngine::new();
    let slot = Mutex::new(Some(engine));
    let factory: EngineFactory = Box::new(move || {
        let engine = slot
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| MockMidiEngine::new().0);
        Ok(Box::new(engine) as Box<dyn MidiEngine>)
    });
    let device = create_shared_launchpad(Launchpad::connect(factory).expect("mock connect"));
    (Dispatcher::new(CommandContext::new(device)), sent)
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn solid_rgb_paints_requested_notes() {
    let (dispatcher, sent) = mock_dispatcher();
    let outcome = dispatcher
        .dispatch("solid", &args(&["0", "63", "0", "11,12"]), ExposureProfile::Interactive)
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Success { .. }));
    let log = sent.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            protocol::solid_rgb(11, 0, 63, 0),
            protocol::solid_rgb(12, 0, 63, 0),
        ]
    );
}

#[test]
fn solid_palette_form_uses_bulk_opcode_for_all_pads() {
    let (dispatcher, sent) = mock_dispatcher();
    dispatcher
        .dispatch("solid", &args(&["45"]), ExposureProfile::Interactive)
        .unwrap();
    let log = sent.lock().unwrap();
    assert_eq!(*log, vec![protocol::palette_all(45)]);
}

#[test]
fn out_of_range_color_is_invalid_argument_and_sends_nothing() {
    let (dispatcher, sent) = mock_dispatcher();
    let err = dispatcher
        .dispatch("solid", &args(&["64", "0", "0"]), ExposureProfile::Interactive)
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidArgument(_)));
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn effects_cover_every_pad() {
    let (dispatcher, sent) = mock_dispatcher();
    dispatcher
        .dispatch("pulse", &args(&["21"]), ExposureProfile::Interactive)
        .unwrap();
    let log = sent.lock().unwrap();
    assert_eq!(log.len(), protocol::ALL_NOTES.len());
    assert_eq!(log[0], protocol::effect(protocol::OP_PULSE, 104, 21));
}

#[test]
fn text_rejects_non_ascii_messages() {
    let (dispatcher, sent) = mock_dispatcher();
    let err = dispatcher
        .dispatch("text", &args(&["45", "4", "héllo"]), ExposureProfile::Interactive)
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidArgument(_)));
    assert!(sent.lock().unwrap().is_empty());

    dispatcher
        .dispatch("text", &args(&["45", "4", "hello", "pads"]), ExposureProfile::Interactive)
        .unwrap();
    let log = sent.lock().unwrap();
    assert_eq!(log[0], protocol::text(45, 0x00, 4, "hello pads"));
}

#[test]
fn send_wraps_and_sendraw_does_not() {
    let (dispatcher, sent) = mock_dispatcher();
    dispatcher
        .dispatch("send", &args(&["0B", "11", "3F", "00", "00"]), ExposureProfile::Interactive)
        .unwrap();
    dispatcher
        .dispatch("sendraw", &args(&["F8", "F7"]), ExposureProfile::Interactive)
        .unwrap();
    let log = sent.lock().unwrap();
    assert_eq!(log[0], protocol::wrap_sysex(&[0x0B, 0x11, 0x3F, 0x00, 0x00]));
    assert_eq!(log[1], vec![0xF8, 0xF7]);
}

#[test]
fn unknown_command_is_not_invalid_argument() {
    let (dispatcher, _sent) = mock_dispatcher();
    let err = dispatcher
        .dispatch("blink", &[], ExposureProfile::Interactive)
        .unwrap_err();
    assert!(matches!(err, CommandError::UnknownCommand(_)));
}

#[test]
fn untrusted_reconnect_is_denied_without_transport_calls() {
    let (dispatcher, sent) = mock_dispatcher();
    let err = dispatcher
        .dispatch("reconnect", &[], ExposureProfile::Untrusted)
        .unwrap_err();
    assert!(matches!(err, CommandError::PermissionDenied(_)));
    assert!(sent.lock().unwrap().is_empty());
}

#[test]
fn interactive_profile_reaches_restricted_commands() {
    let (dispatcher, _sent) = mock_dispatcher();
    let outcome = dispatcher
        .dispatch("reconnect", &[], ExposureProfile::Interactive)
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Success { .. }));
}

#[test]
fn deny_list_is_a_configurable_policy() {
    let (dispatcher, _sent) = mock_dispatcher();
    assert!(dispatcher.deny_list().contains(&"mode".to_string()));

    let relaxed = dispatcher.with_deny_list(&["reconnect", "exit"]);
    let outcome = relaxed
        .dispatch("mode", &args(&["mixer"]), ExposureProfile::Untrusted)
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Success { .. }));
    assert!(matches!(
        relaxed.dispatch("exit", &[], ExposureProfile::Untrusted),
        Err(CommandError::PermissionDenied(_))
    ));
}

#[test]
fn exit_is_a_terminate_outcome_not_an_error() {
    let (dispatcher, _sent) = mock_dispatcher();
    let outcome = dispatcher
        .dispatch("exit", &[], ExposureProfile::Interactive)
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Terminate);
}

#[test]
fn listen_toggles_flip_the_echo_flag() {
    let (dispatcher, _sent) = mock_dispatcher();
    assert!(!dispatcher.context().echo.load(Ordering::SeqCst));
    dispatcher
        .dispatch("listenon", &[], ExposureProfile::Interactive)
        .unwrap();
    assert!(dispatcher.context().echo.load(Ordering::SeqCst));
    dispatcher
        .dispatch("listenoff", &[], ExposureProfile::Interactive)
        .unwrap();
    assert!(!dispatcher.context().echo.load(Ordering::SeqCst));
}

#[test]
fn send_failure_surfaces_as_transport_failure() {
    let (engine, _sent, _tx) = MockMidiEngine::new();
    let flag = engine.failure_flag();
    let slot = Mutex::new(Some(engine));
    let factory: EngineFactory = Box::new(move || {
        let engine = slot
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| MockMidiEngine::new().0);
        Ok(Box::new(engine) as Box<dyn MidiEngine>)
    });
    let device = create_shared_launchpad(Launchpad::connect(factory).expect("mock connect"));
    let dispatcher = Dispatcher::new(CommandContext::new(device));

    flag.store(true, Ordering::SeqCst);
    let err = dispatcher
        .dispatch("clear", &[], ExposureProfile::Interactive)
        .unwrap_err();
    assert!(matches!(err, CommandError::TransportFailure(_)));
}

#[test]
fn mode_dispatch_reports_idempotent_repeat() {
    let (dispatcher, sent) = mock_dispatcher();
    dispatcher
        .dispatch("mode", &args(&["user2"]), ExposureProfile::Interactive)
        .unwrap();
    let first = sent.lock().unwrap().len();
    let outcome = dispatcher
        .dispatch("mode", &args(&["user2"]), ExposureProfile::Interactive)
        .unwrap();
    assert_eq!(sent.lock().unwrap().len(), first);
    match outcome {
        CommandOutcome::Success { message } => assert!(message.contains("already active")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}
