//! SysEx codec for the Launchpad Mk2
//!
//! Every function here is a pure byte builder or parser: no port access, no
//! state. Range validation happens in the dispatcher before values reach this
//! module, so the encoders assume their inputs are already in range.
//!
//! All device-directed messages share the fixed vendor header
//! `F0 00 20 29 02 18` and the `F7` terminator, except the raw clock pulse
//! which the device consumes unframed.

/// Novation vendor SysEx header for the Launchpad Mk2.
pub const HEADER: [u8; 6] = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x18];

/// SysEx terminator byte.
pub const TERMINATOR: u8 = 0xF7;

/// Opcode: paint one note with an RGB triple (also lights mode indicators).
pub const OP_RGB: u8 = 0x0B;
/// Opcode: set every pad to one palette color.
pub const OP_PALETTE_ALL: u8 = 0x0E;
/// Opcode: set a single note to a palette color.
pub const OP_PALETTE_NOTE: u8 = 0x0A;
/// Opcode: select the active device layout.
pub const OP_LAYOUT: u8 = 0x22;
/// Opcode: scroll a text message across the grid.
pub const OP_TEXT: u8 = 0x14;
/// Opcode: pulse (breathing) effect on one note.
pub const OP_PULSE: u8 = 0x28;
/// Opcode: flash effect on one note.
pub const OP_FLASH: u8 = 0x23;

/// Every addressable note on the device: the top control row, then each grid
/// row with its scene-launch button on the right. The device treats this set
/// as "all pads" for the bulk operations.
pub const ALL_NOTES: [u8; 80] = [
    104, 105, 106, 107, 108, 109, 110, 111, //
    81, 82, 83, 84, 85, 86, 87, 88, 89, //
    71, 72, 73, 74, 75, 76, 77, 78, 79, //
    61, 62, 63, 64, 65, 66, 67, 68, 69, //
    51, 52, 53, 54, 55, 56, 57, 58, 59, //
    41, 42, 43, 44, 45, 46, 47, 48, 49, //
    31, 32, 33, 34, 35, 36, 37, 38, 39, //
    21, 22, 23, 24, 25, 26, 27, 28, 29, //
    11, 12, 13, 14, 15, 16, 17, 18, 19, //
];

/// A pad color in one of the two representations the device understands.
/// A command uses exactly one representation per invocation, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Direct RGB, each channel 0..=63.
    Rgb { r: u8, g: u8, b: u8 },
    /// Device palette lookup index, 0..=127.
    Palette(u8),
}

/// A classified inbound channel message (raw MIDI, not SysEx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadEvent {
    pub status: u8,
    pub note: u8,
    pub velocity: u8,
}

/// Wraps an arbitrary payload with the vendor header and terminator.
pub fn wrap_sysex(payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(HEADER.len() + payload.len() + 1);
    msg.extend_from_slice(&HEADER);
    msg.extend_from_slice(payload);
    msg.push(TERMINATOR);
    msg
}

/// Selects the active on-device layout.
pub fn mode_select(layout: u8) -> Vec<u8> {
    wrap_sysex(&[OP_LAYOUT, layout])
}

/// Paints one mode-select note with an RGB triple.
pub fn mode_indicator(note: u8, rgb: (u8, u8, u8)) -> Vec<u8> {
    wrap_sysex(&[OP_RGB, note, rgb.0, rgb.1, rgb.2])
}

/// Turns off every pad (bulk palette write of color 0).
pub fn clear() -> Vec<u8> {
    wrap_sysex(&[OP_PALETTE_ALL, 0x00])
}

/// Paints a single note with an RGB triple.
pub fn solid_rgb(note: u8, r: u8, g: u8, b: u8) -> Vec<u8> {
    wrap_sysex(&[OP_RGB, note, r, g, b])
}

/// Sets every pad to one palette color. Callers must use this, not a loop of
/// [`palette_note`], when the target set is literally [`ALL_NOTES`].
pub fn palette_all(color: u8) -> Vec<u8> {
    wrap_sysex(&[OP_PALETTE_ALL, color])
}

/// Sets a single note to a palette color.
pub fn palette_note(note: u8, color: u8) -> Vec<u8> {
    wrap_sysex(&[OP_PALETTE_NOTE, note, color])
}

/// One effect message for one note. The device expects the effect opcode, a
/// zero channel byte, the note and the palette color.
pub fn effect(effect_code: u8, note: u8, color: u8) -> Vec<u8> {
    wrap_sysex(&[effect_code, 0x00, note, color])
}

/// Scrolling text. The message must already be 7-bit ASCII; the dispatcher
/// rejects anything else before it gets here.
pub fn text(color: u8, loop_flag: u8, speed: u8, message: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + message.len());
    payload.extend_from_slice(&[OP_TEXT, color, loop_flag, speed]);
    payload.extend(message.bytes());
    wrap_sysex(&payload)
}

/// A single MIDI timing pulse. Sent unframed, without the vendor header.
pub fn clock_pulse() -> Vec<u8> {
    vec![0xF8, TERMINATOR]
}

/// Parses an inbound channel message into status/note/velocity. Returns
/// `None` for empty input; missing data bytes read as zero.
pub fn classify_inbound(bytes: &[u8]) -> Option<PadEvent> {
    let status = *bytes.first()?;
    let note = bytes.get(1).copied().unwrap_or(0);
    let velocity = bytes.get(2).copied().unwrap_or(0);
    Some(PadEvent {
        status,
        note,
        velocity,
    })
}
