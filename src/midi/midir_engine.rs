use crate::midi::{MidiEngine, MidiError, Result};
use crossbeam::channel::{unbounded, Receiver};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

/// Real device transport backed by midir. Picks the first input and output
/// ports whose names contain the product match string (case-insensitive);
/// the input callback forwards every raw message into a crossbeam channel
/// that the input listener drains on its own thread.
pub struct MidirEngine {
    #[allow(dead_code)]
    input: MidiInputConnection<()>,
    output: MidiOutputConnection,
    rx: Option<Receiver<Vec<u8>>>,
    description: String,
}

impl MidirEngine {
    pub fn new(match_str: &str) -> Result<Self> {
        let needle = match_str.to_lowercase();

        let mut midi_in = MidiInput::new("padctl-in")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        midi_in.ignore(Ignore::None);

        let in_ports = midi_in.ports();
        let in_port = in_ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            })
            .ok_or_else(|| {
                MidiError::ConnectionError(format!("no input port matching '{}'", match_str))
            })?;
        let in_name = midi_in.port_name(in_port).unwrap_or_default();

        let (tx, rx) = unbounded();
        let input = midi_in
            .connect(
                in_port,
                "padctl-input",
                move |_stamp, message, _| {
                    let _ = tx.send(message.to_vec());
                },
                (),
            )
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        let midi_out = MidiOutput::new("padctl-out")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        let out_ports = midi_out.ports();
        let out_port = out_ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
            })
            .ok_or_else(|| {
                MidiError::ConnectionError(format!("no output port matching '{}'", match_str))
            })?;
        let out_name = midi_out.port_name(out_port).unwrap_or_default();
        let output = midi_out
            .connect(out_port, "padctl-output")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        log::info!("Connected to '{}' (in) / '{}' (out)", in_name, out_name);
        Ok(MidirEngine {
            input,
            output,
            rx: Some(rx),
            description: format!("{} (in), {} (out)", in_name, out_name),
        })
    }

    /// Enumerates every visible MIDI input port, for `--device-list`.
    pub fn list_devices() -> Vec<String> {
        let mut devices = Vec::new();
        if let Ok(midi_in) = MidiInput::new("padctl-list") {
            for port in midi_in.ports() {
                if let Ok(name) = midi_in.port_name(&port) {
                    devices.push(name);
                }
            }
        }
        devices
    }
}

impl MidiEngine for MidirEngine {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.output
            .send(bytes)
            .map_err(|e| MidiError::SendError(e.to_string()))
    }

    fn take_receiver(&mut self) -> Option<Receiver<Vec<u8>>> {
        self.rx.take()
    }

    fn port_description(&self) -> String {
        self.description.clone()
    }
}
