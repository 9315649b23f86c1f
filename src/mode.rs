//! Display mode state machine
//!
//! The device has four layouts selectable either from the shell or by
//! pressing one of the four mode buttons on the top row. [`ModeMachine`]
//! owns the "current mode" and plans the exact wire sequence for a
//! transition; the [`Launchpad`](crate::device::Launchpad) handle writes the
//! sequence and commits the new state under its lock, so a hardware press
//! and an explicit command can never interleave their messages.

use crate::protocol;

/// One of the device's four display modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Session,
    User1,
    User2,
    Mixer,
}

/// Static per-mode attributes from the firmware: the channel status byte its
/// events arrive on, the top-row select note, the layout code and the two
/// indicator colors.
struct ModeInfo {
    name: &'static str,
    status: u8,
    note: u8,
    layout: u8,
    inactive_rgb: (u8, u8, u8),
    active_rgb: (u8, u8, u8),
}

static MODE_TABLE: [ModeInfo; 4] = [
    ModeInfo {
        name: "session",
        status: 144,
        note: 108,
        layout: 0x00,
        inactive_rgb: (0, 32, 0),
        active_rgb: (0, 63, 0),
    },
    ModeInfo {
        name: "user1",
        status: 149,
        note: 109,
        layout: 0x01,
        inactive_rgb: (5, 0, 32),
        active_rgb: (10, 0, 63),
    },
    ModeInfo {
        name: "user2",
        status: 157,
        note: 110,
        layout: 0x02,
        inactive_rgb: (32, 0, 32),
        active_rgb: (63, 0, 63),
    },
    ModeInfo {
        name: "mixer",
        status: 176,
        note: 111,
        layout: 0x04,
        inactive_rgb: (0, 21, 32),
        active_rgb: (0, 42, 63),
    },
];

impl Mode {
    /// Fixed enumeration order; indicator painting iterates this.
    pub const ALL: [Mode; 4] = [Mode::Session, Mode::User1, Mode::User2, Mode::Mixer];

    fn info(&self) -> &'static ModeInfo {
        &MODE_TABLE[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.info().name
    }

    pub fn status(&self) -> u8 {
        self.info().status
    }

    /// The top-row note that selects this mode.
    pub fn note(&self) -> u8 {
        self.info().note
    }

    pub fn layout(&self) -> u8 {
        self.info().layout
    }

    pub fn inactive_rgb(&self) -> (u8, u8, u8) {
        self.info().inactive_rgb
    }

    pub fn active_rgb(&self) -> (u8, u8, u8) {
        self.info().active_rgb
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Looks a mode up by its select note (hardware press path).
    pub fn from_note(note: u8) -> Option<Mode> {
        Mode::ALL.iter().copied().find(|m| m.note() == note)
    }

    /// Looks a mode up by the status byte its events arrive on (used to
    /// label echoed traffic).
    pub fn from_status(status: u8) -> Option<Mode> {
        Mode::ALL.iter().copied().find(|m| m.status() == status)
    }
}

/// Owns the current display mode and plans transitions.
#[derive(Debug, Default)]
pub struct ModeMachine {
    current: Option<Mode>,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Mode> {
        self.current
    }

    /// Computes the wire sequence for a transition to `target`, or `None`
    /// when the target is already current (a transition is idempotent and
    /// the second request emits nothing).
    ///
    /// The sequence is: deselect the prior mode's indicator if one exists,
    /// select the target layout, then repaint every indicator in
    /// [`Mode::ALL`] order. The target gets its active color; the siblings
    /// get their inactive color only when the target is session or mixer,
    /// and black otherwise. The user layouts blanking their sibling
    /// indicators is firmware behavior, reproduced exactly.
    pub fn plan_transition(&self, target: Mode) -> Option<Vec<Vec<u8>>> {
        if self.current == Some(target) {
            return None;
        }

        let mut messages = Vec::with_capacity(Mode::ALL.len() + 2);
        if let Some(prior) = self.current {
            messages.push(protocol::mode_indicator(prior.note(), (0, 0, 0)));
        }
        messages.push(protocol::mode_select(target.layout()));

        let peer_visible = matches!(target, Mode::Session | Mode::Mixer);
        for mode in Mode::ALL {
            let rgb = if mode == target {
                mode.active_rgb()
            } else if peer_visible {
                mode.inactive_rgb()
            } else {
                (0, 0, 0)
            };
            messages.push(protocol::mode_indicator(mode.note(), rgb));
        }
        Some(messages)
    }

    /// Records `target` as current. Called after the planned sequence was
    /// written, so a failed write leaves the machine ready to re-issue the
    /// full transition.
    pub fn commit(&mut self, target: Mode) {
        self.current = Some(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_lookup_by_name_note_and_status() {
        assert_eq!(Mode::from_name("mixer"), Some(Mode::Mixer));
        assert_eq!(Mode::from_name("drums"), None);
        assert_eq!(Mode::from_note(109), Some(Mode::User1));
        assert_eq!(Mode::from_note(42), None);
        assert_eq!(Mode::from_status(144), Some(Mode::Session));
        assert_eq!(Mode::from_status(0xF8), None);
    }

    #[test]
    fn transition_is_idempotent() {
        let mut machine = ModeMachine::new();
        assert!(machine.plan_transition(Mode::Session).is_some());
        machine.commit(Mode::Session);
        assert!(machine.plan_transition(Mode::Session).is_none());
    }

    #[test]
    fn first_transition_has_no_deselect_message() {
        let machine = ModeMachine::new();
        let messages = machine.plan_transition(Mode::Session).unwrap();
        // layout select + 4 indicators, no prior mode to deselect
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], protocol::mode_select(0x00));
    }

    #[test]
    fn user_target_blanks_sibling_indicators() {
        let mut machine = ModeMachine::new();
        machine.commit(Mode::Session);
        let messages = machine.plan_transition(Mode::User1).unwrap();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], protocol::mode_indicator(108, (0, 0, 0)));
        assert_eq!(messages[1], protocol::mode_select(0x01));
        assert_eq!(messages[2], protocol::mode_indicator(108, (0, 0, 0)));
        assert_eq!(messages[3], protocol::mode_indicator(109, (10, 0, 63)));
        assert_eq!(messages[4], protocol::mode_indicator(110, (0, 0, 0)));
        assert_eq!(messages[5], protocol::mode_indicator(111, (0, 0, 0)));
    }

    #[test]
    fn session_target_keeps_siblings_dimly_lit() {
        let mut machine = ModeMachine::new();
        machine.commit(Mode::User2);
        let messages = machine.plan_transition(Mode::Session).unwrap();
        assert_eq!(messages[0], protocol::mode_indicator(110, (0, 0, 0)));
        assert_eq!(messages[1], protocol::mode_select(0x00));
        assert_eq!(messages[2], protocol::mode_indicator(108, (0, 63, 0)));
        assert_eq!(messages[3], protocol::mode_indicator(109, (5, 0, 32)));
        assert_eq!(messages[4], protocol::mode_indicator(110, (32, 0, 32)));
        assert_eq!(messages[5], protocol::mode_indicator(111, (0, 21, 32)));
    }
}
