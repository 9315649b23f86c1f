// config.rs

/// Product string the port matcher looks for when no device is named.
pub const DEFAULT_DEVICE_MATCH: &str = "launchpad";

/// Pulses a `tempo` command sends when no count is given.
pub const DEFAULT_CLOCK_COUNT: u64 = 32;

/// BPM bounds accepted by the command surface.
pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 240;
