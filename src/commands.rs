//! Command dispatcher
//!
//! The single entry point behind both the interactive shell and the network
//! front end. The registry is a static table built once: name, usage, help
//! text, a restricted flag and a plain function handler. Argument validation
//! (range checks, hex parsing, note lists) lives here; the protocol codec
//! assumes validated input.
//!
//! Two exposure profiles exist. `Interactive` reaches every command;
//! `Untrusted` checks the dispatcher's deny list before the handler runs.
//! The deny list defaults to the commands flagged restricted in the table
//! and is reconfigurable per deployment.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{DEFAULT_CLOCK_COUNT, MAX_BPM, MIN_BPM};
use crate::device::SharedLaunchpad;
use crate::midi::clock::{ClockGenerator, ClockHandle};
use crate::midi::MidiError;
use crate::mode::Mode;
use crate::protocol::{ALL_NOTES, OP_FLASH, OP_PULSE};

/// Structured failure of one dispatch. No kind terminates the process; the
/// `exit` command is a [`CommandOutcome::Terminate`], not an error.
#[derive(Debug)]
pub enum CommandError {
    /// Out-of-range numeric, malformed hex, unknown mode name or note list.
    /// The operation was not attempted.
    InvalidArgument(String),
    /// The command name is not in the registry. Deliberately distinct from
    /// [`CommandError::InvalidArgument`].
    UnknownCommand(String),
    /// Deny-listed command under the untrusted profile; no handler ran.
    PermissionDenied(String),
    /// No matching port, or the port is closed. Callers should reconnect
    /// rather than retry the same command.
    DeviceUnavailable(String),
    /// A write failed mid-operation; some messages may already be on the
    /// wire. Not retried, the caller re-issues.
    TransportFailure(String),
}

impl CommandError {
    /// Stable kind string used by the network envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::InvalidArgument(_) => "invalid_argument",
            CommandError::UnknownCommand(_) => "unknown_command",
            CommandError::PermissionDenied(_) => "permission_denied",
            CommandError::DeviceUnavailable(_) => "device_unavailable",
            CommandError::TransportFailure(_) => "transport_failure",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            CommandError::UnknownCommand(name) => write!(f, "unknown command: {}", name),
            CommandError::PermissionDenied(name) => write!(f, "permission denied: {}", name),
            CommandError::DeviceUnavailable(msg) => write!(f, "device unavailable: {}", msg),
            CommandError::TransportFailure(msg) => write!(f, "transport failure: {}", msg),
        }
    }
}

impl Error for CommandError {}

impl From<MidiError> for CommandError {
    fn from(err: MidiError) -> Self {
        match err {
            MidiError::ConnectionError(msg) => CommandError::DeviceUnavailable(msg),
            MidiError::SendError(msg) | MidiError::RecvError(msg) => {
                CommandError::TransportFailure(msg)
            }
        }
    }
}

/// Successful dispatch result.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Success { message: String },
    /// The `exit` command: a control signal for the calling loop, handled
    /// explicitly rather than unwound as an error.
    Terminate,
}

/// Which caller class is invoking the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureProfile {
    /// Every registered command is reachable.
    Interactive,
    /// Deny-listed commands are rejected before the handler runs.
    Untrusted,
}

/// Shared plumbing every handler works against.
pub struct CommandContext {
    pub device: SharedLaunchpad,
    pub echo: Arc<AtomicBool>,
    /// The one active tempo run; a new `tempo` cancels the previous run.
    pub clock: Mutex<Option<ClockHandle>>,
}

impl CommandContext {
    pub fn new(device: SharedLaunchpad) -> Self {
        CommandContext {
            device,
            echo: Arc::new(AtomicBool::new(false)),
            clock: Mutex::new(None),
        }
    }
}

type Handler = fn(&CommandContext, &[String]) -> Result<CommandOutcome, CommandError>;

/// One registry entry.
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    /// Default deny-list membership for the untrusted profile.
    pub restricted: bool,
    handler: Handler,
}

/// The full command surface, built once. Registration order is the order
/// `help` prints.
static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "solid",
        usage: "solid <r> <g> <b> [notes] | solid <palette> [notes]",
        summary: "Light notes with RGB (0-63) or a palette index (0-127)",
        restricted: false,
        handler: cmd_solid,
    },
    CommandSpec {
        name: "pulse",
        usage: "pulse <color 0-127>",
        summary: "Breathing effect across all pads",
        restricted: false,
        handler: cmd_pulse,
    },
    CommandSpec {
        name: "flash",
        usage: "flash <color 0-127>",
        summary: "Flashing effect across all pads",
        restricted: false,
        handler: cmd_flash,
    },
    CommandSpec {
        name: "text",
        usage: "text <color 0-127> <speed 0-7> <message>",
        summary: "Scroll a text message across the grid",
        restricted: false,
        handler: cmd_text,
    },
    CommandSpec {
        name: "clear",
        usage: "clear",
        summary: "Turn off all pads",
        restricted: false,
        handler: cmd_clear,
    },
    CommandSpec {
        name: "tempo",
        usage: "tempo <bpm 40-240> [count 1-10000]",
        summary: "Send MIDI clock pulses at BPM (default count 32)",
        restricted: false,
        handler: cmd_tempo,
    },
    CommandSpec {
        name: "stoptempo",
        usage: "stoptempo",
        summary: "Cancel the active clock run",
        restricted: false,
        handler: cmd_stoptempo,
    },
    CommandSpec {
        name: "send",
        usage: "send <hex bytes...>",
        summary: "Send a SysEx payload wrapped with the vendor header",
        restricted: true,
        handler: cmd_send,
    },
    CommandSpec {
        name: "sendraw",
        usage: "sendraw <hex bytes...>",
        summary: "Send raw bytes unwrapped",
        restricted: true,
        handler: cmd_sendraw,
    },
    CommandSpec {
        name: "mode",
        usage: "mode <session|user1|user2|mixer>",
        summary: "Switch the device display mode",
        restricted: true,
        handler: cmd_mode,
    },
    CommandSpec {
        name: "reconnect",
        usage: "reconnect",
        summary: "Reopen the MIDI ports",
        restricted: true,
        handler: cmd_reconnect,
    },
    CommandSpec {
        name: "listenon",
        usage: "listenon",
        summary: "Start echoing MIDI input",
        restricted: true,
        handler: cmd_listenon,
    },
    CommandSpec {
        name: "listenoff",
        usage: "listenoff",
        summary: "Stop echoing MIDI input",
        restricted: true,
        handler: cmd_listenoff,
    },
    CommandSpec {
        name: "consoleclear",
        usage: "consoleclear",
        summary: "Clear the console output",
        restricted: true,
        handler: cmd_consoleclear,
    },
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "Show this help",
        restricted: false,
        handler: cmd_help,
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        summary: "Exit the shell",
        restricted: true,
        handler: cmd_exit,
    },
];

/// Maps `(name, args)` pairs to operations under a uniform contract.
pub struct Dispatcher {
    ctx: CommandContext,
    deny: Vec<String>,
}

impl Dispatcher {
    /// Builds a dispatcher with the default deny list taken from the
    /// registry's restricted flags.
    pub fn new(ctx: CommandContext) -> Self {
        let deny = COMMANDS
            .iter()
            .filter(|spec| spec.restricted)
            .map(|spec| spec.name.to_string())
            .collect();
        let dispatcher = Dispatcher { ctx, deny };
        log::info!(
            "Dispatcher ready; untrusted profile denies: {}",
            dispatcher.deny.join(", ")
        );
        dispatcher
    }

    /// Replaces the untrusted-profile deny list. The membership is a
    /// deployment policy, not part of the protocol.
    pub fn with_deny_list(mut self, deny: &[&str]) -> Self {
        self.deny = deny.iter().map(|s| s.to_string()).collect();
        log::info!(
            "Untrusted deny list reconfigured: {}",
            self.deny.join(", ")
        );
        self
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny
    }

    /// Runs one command. Every failure comes back as a classified
    /// [`CommandError`]; nothing escapes a handler unclassified.
    pub fn dispatch(
        &self,
        name: &str,
        args: &[String],
        profile: ExposureProfile,
    ) -> Result<CommandOutcome, CommandError> {
        let spec = COMMANDS
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        if profile == ExposureProfile::Untrusted && self.deny.iter().any(|d| d == name) {
            log::warn!("Denied untrusted '{}' request", name);
            return Err(CommandError::PermissionDenied(name.to_string()));
        }

        log::debug!("Dispatching '{}' with {:?}", name, args);
        (spec.handler)(&self.ctx, args)
    }
}

// ---------------------------------------------------------------------------
// Argument parsing

/// Parses a decimal or `0x` hex integer and checks its range.
fn parse_int(value: &str, min: u32, max: u32, name: &str) -> Result<u32, CommandError> {
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse::<u32>()
    };
    match parsed {
        Ok(v) if (min..=max).contains(&v) => Ok(v),
        _ => Err(CommandError::InvalidArgument(format!(
            "{} must be {}-{}",
            name, min, max
        ))),
    }
}

/// Parses a comma-separated note list; an absent argument means all pads.
fn parse_note_list(arg: Option<&String>) -> Result<Vec<u8>, CommandError> {
    let Some(raw) = arg else {
        return Ok(ALL_NOTES.to_vec());
    };
    if raw.trim().is_empty() {
        return Ok(ALL_NOTES.to_vec());
    }
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| CommandError::InvalidArgument(format!("invalid note '{}'", part)))
        })
        .collect()
}

/// Parses whitespace-separated hex bytes, with or without a `0x` prefix.
fn parse_hex_bytes(args: &[String]) -> Result<Vec<u8>, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidArgument(
            "expected hex bytes, e.g. 0B 11 3F 00 00".to_string(),
        ));
    }
    args.iter()
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16)
                .map_err(|_| CommandError::InvalidArgument(format!("invalid hex byte '{}'", token)))
        })
        .collect()
}

fn lock_device(
    ctx: &CommandContext,
) -> Result<std::sync::MutexGuard<'_, crate::device::Launchpad>, CommandError> {
    ctx.device
        .lock()
        .map_err(|_| CommandError::DeviceUnavailable("device lock poisoned".to_string()))
}

// ---------------------------------------------------------------------------
// Handlers

fn cmd_solid(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidArgument(
            "usage: solid <r> <g> <b> [notes] or solid <palette> [notes]".to_string(),
        ));
    }
    if args.len() >= 3 {
        let r = parse_int(&args[0], 0, 63, "Red")? as u8;
        let g = parse_int(&args[1], 0, 63, "Green")? as u8;
        let b = parse_int(&args[2], 0, 63, "Blue")? as u8;
        let notes = parse_note_list(args.get(3))?;
        lock_device(ctx)?.solid_rgb(r, g, b, &notes)?;
        Ok(CommandOutcome::Success {
            message: format!("Notes set to RGB ({}, {}, {})", r, g, b),
        })
    } else {
        let color = parse_int(&args[0], 0, 127, "Palette")? as u8;
        let notes = parse_note_list(args.get(1))?;
        lock_device(ctx)?.palette(color, &notes)?;
        Ok(CommandOutcome::Success {
            message: format!("Notes set to palette color {}", color),
        })
    }
}

fn run_effect(
    ctx: &CommandContext,
    args: &[String],
    effect_code: u8,
    effect_name: &str,
) -> Result<CommandOutcome, CommandError> {
    let color = parse_int(
        args.first().map(String::as_str).unwrap_or(""),
        0,
        127,
        "Color index",
    )?;
    lock_device(ctx)?.effect(effect_code, color as u8)?;
    Ok(CommandOutcome::Success {
        message: format!("{} effect set to color index {}", effect_name, color),
    })
}

fn cmd_pulse(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    run_effect(ctx, args, OP_PULSE, "Pulse")
}

fn cmd_flash(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    run_effect(ctx, args, OP_FLASH, "Flash")
}

fn cmd_text(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    if args.len() < 3 {
        return Err(CommandError::InvalidArgument(
            "usage: text <color 0-127> <speed 0-7> <message>".to_string(),
        ));
    }
    let color = parse_int(&args[0], 0, 127, "Color")? as u8;
    let speed = parse_int(&args[1], 0, 7, "Speed")? as u8;
    let message = args[2..].join(" ");
    // The wire format is one byte per character. Rejecting here beats
    // silently emitting out-of-range bytes the device chokes on.
    if !message.is_ascii() {
        return Err(CommandError::InvalidArgument(
            "message must be 7-bit ASCII".to_string(),
        ));
    }
    lock_device(ctx)?.text(color, speed, &message)?;
    Ok(CommandOutcome::Success {
        message: format!("Displaying text: {} color {} speed {}", message, color, speed),
    })
}

fn cmd_clear(ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    lock_device(ctx)?.clear()?;
    Ok(CommandOutcome::Success {
        message: "All pads cleared".to_string(),
    })
}

fn cmd_tempo(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    if args.is_empty() {
        return Err(CommandError::InvalidArgument(
            "usage: tempo <bpm 40-240> [count 1-10000]".to_string(),
        ));
    }
    let bpm = parse_int(&args[0], MIN_BPM, MAX_BPM, "BPM")?;
    let count = match args.get(1) {
        Some(raw) => u64::from(parse_int(raw, 1, 10_000, "Count")?),
        None => DEFAULT_CLOCK_COUNT,
    };

    let mut slot = ctx
        .clock
        .lock()
        .map_err(|_| CommandError::TransportFailure("clock slot poisoned".to_string()))?;
    if let Some(previous) = slot.take() {
        let outcome = previous.cancel_and_join();
        log::info!(
            "Previous clock run stopped at {} pulses",
            outcome.pulses_sent
        );
    }
    *slot = Some(ClockGenerator::start(
        ctx.device.clone(),
        bpm,
        Some(count),
    ));
    Ok(CommandOutcome::Success {
        message: format!("Sending {} clock pulses at {} BPM", count, bpm),
    })
}

fn cmd_stoptempo(ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let mut slot = ctx
        .clock
        .lock()
        .map_err(|_| CommandError::TransportFailure("clock slot poisoned".to_string()))?;
    match slot.take() {
        Some(handle) => {
            let outcome = handle.cancel_and_join();
            Ok(CommandOutcome::Success {
                message: format!("Clock run stopped after {} pulses", outcome.pulses_sent),
            })
        }
        None => Ok(CommandOutcome::Success {
            message: "No clock run active".to_string(),
        }),
    }
}

fn cmd_send(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    let bytes = parse_hex_bytes(args)?;
    lock_device(ctx)?.send_sysex(&bytes)?;
    Ok(CommandOutcome::Success {
        message: format!("Sent SysEx payload ({} bytes)", bytes.len()),
    })
}

fn cmd_sendraw(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    let bytes = parse_hex_bytes(args)?;
    lock_device(ctx)?.send_raw(&bytes)?;
    Ok(CommandOutcome::Success {
        message: format!("Sent raw message ({} bytes)", bytes.len()),
    })
}

fn cmd_mode(ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome, CommandError> {
    let name = args.first().map(String::as_str).unwrap_or("");
    let target = Mode::from_name(name).ok_or_else(|| {
        CommandError::InvalidArgument("usage: mode <session|user1|user2|mixer>".to_string())
    })?;
    let changed = lock_device(ctx)?.set_mode(target)?;
    Ok(CommandOutcome::Success {
        message: if changed {
            format!("Mode set to {}", target.name())
        } else {
            format!("Mode {} already active", target.name())
        },
    })
}

fn cmd_reconnect(ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let mut device = lock_device(ctx)?;
    device.reconnect()?;
    Ok(CommandOutcome::Success {
        message: format!("Reconnected to {}", device.port_description()),
    })
}

fn cmd_listenon(ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let was_on = ctx.echo.swap(true, Ordering::SeqCst);
    Ok(CommandOutcome::Success {
        message: if was_on {
            "Listener already running".to_string()
        } else {
            "Input listener started".to_string()
        },
    })
}

fn cmd_listenoff(ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let was_on = ctx.echo.swap(false, Ordering::SeqCst);
    Ok(CommandOutcome::Success {
        message: if was_on {
            "Input listener stopped".to_string()
        } else {
            "Listener is not running".to_string()
        },
    })
}

fn cmd_consoleclear(_ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let term = dialoguer::console::Term::stdout();
    let _ = term.clear_screen();
    Ok(CommandOutcome::Success {
        message: String::new(),
    })
}

fn cmd_help(_ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    let mut message = String::from("Commands:\n");
    for spec in COMMANDS {
        message.push_str(&format!("  {:<42} {}\n", spec.usage, spec.summary));
    }
    Ok(CommandOutcome::Success { message })
}

fn cmd_exit(_ctx: &CommandContext, _args: &[String]) -> Result<CommandOutcome, CommandError> {
    Ok(CommandOutcome::Terminate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_accepts_decimal_and_hex() {
        assert_eq!(parse_int("63", 0, 63, "Red").unwrap(), 63);
        assert_eq!(parse_int("0x3F", 0, 63, "Red").unwrap(), 63);
        assert!(parse_int("64", 0, 63, "Red").is_err());
        assert!(parse_int("red", 0, 63, "Red").is_err());
    }

    #[test]
    fn parse_note_list_defaults_to_all_pads() {
        assert_eq!(parse_note_list(None).unwrap(), ALL_NOTES.to_vec());
        assert_eq!(
            parse_note_list(Some(&" ".to_string())).unwrap(),
            ALL_NOTES.to_vec()
        );
        assert_eq!(
            parse_note_list(Some(&"11, 12,13".to_string())).unwrap(),
            vec![11, 12, 13]
        );
        assert!(parse_note_list(Some(&"11,x".to_string())).is_err());
    }

    #[test]
    fn parse_hex_bytes_handles_prefixes() {
        assert_eq!(
            parse_hex_bytes(&["0B".to_string(), "0x3F".to_string()]).unwrap(),
            vec![0x0B, 0x3F]
        );
        assert!(parse_hex_bytes(&["zz".to_string()]).is_err());
        assert!(parse_hex_bytes(&[]).is_err());
    }
}
