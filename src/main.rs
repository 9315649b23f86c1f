use std::sync::Arc;
use std::thread;

use clap::Parser;

use padctl::cli::{validate_device, Args};
use padctl::commands::{CommandContext, Dispatcher};
use padctl::config::DEFAULT_DEVICE_MATCH;
use padctl::device::{create_shared_launchpad, EngineFactory, Launchpad, SharedLaunchpad};
use padctl::listener::run_input_listener;
use padctl::midi::{DefaultMidiEngine, MidiEngine};
use padctl::mode::Mode;
use padctl::{logging, server, shell};

fn main() {
    initialize_logging();
    let args = Args::parse();

    let devices = DefaultMidiEngine::list_devices();
    if args.device_list {
        println!("Available MIDI devices:");
        for device in &devices {
            println!("  - {}", device);
        }
        return;
    }

    if let Some(device_name) = &args.bind_to_device {
        if let Err(error_msg) = validate_device(device_name, &devices) {
            log::error!("{}", error_msg);
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }
    }

    let match_str = args
        .bind_to_device
        .clone()
        .unwrap_or_else(|| DEFAULT_DEVICE_MATCH.to_string());

    let device = match connect_device(match_str) {
        Ok(device) => device,
        Err(e) => {
            let error_msg = format!("Error connecting to MIDI device: {}", e);
            log::error!("{}", error_msg);
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }
    };

    if !args.no_startup_mode {
        set_startup_mode(&device);
    }

    let dispatcher = Dispatcher::new(CommandContext::new(device.clone()));

    let listener_device = device.clone();
    let listener_echo = Arc::clone(&dispatcher.context().echo);
    thread::spawn(move || {
        run_input_listener(listener_device, listener_echo, None);
    });

    if let Some(addr) = &args.serve {
        if let Err(e) = server::run_server(addr, Arc::new(dispatcher)) {
            log::error!("Server failed: {}", e);
            eprintln!("Server failed: {}", e);
            std::process::exit(1);
        }
    } else {
        shell::run_shell(&dispatcher);
        shutdown(&device);
    }
}

fn initialize_logging() {
    logging::init_logger().expect("Logger initialization failed");
    log::info!("Application starting");
}

fn connect_device(match_str: String) -> Result<SharedLaunchpad, padctl::midi::MidiError> {
    let factory: EngineFactory = Box::new(move || {
        let engine = DefaultMidiEngine::new(&match_str)?;
        Ok(Box::new(engine) as Box<dyn MidiEngine>)
    });
    let launchpad = Launchpad::connect(factory)?;
    println!("Connected to: {}", launchpad.port_description());
    Ok(create_shared_launchpad(launchpad))
}

fn set_startup_mode(device: &SharedLaunchpad) {
    if let Ok(mut guard) = device.lock() {
        if let Err(e) = guard.set_mode(Mode::Session) {
            log::error!("Startup mode switch failed: {}", e);
            eprintln!("Startup mode switch failed: {}", e);
        }
    }
}

fn shutdown(device: &SharedLaunchpad) {
    if let Ok(mut guard) = device.lock() {
        guard.shutdown();
    }
    log::info!("Exiting");
    println!("Exiting...");
}
