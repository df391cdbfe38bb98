//! Closed value types shared by the keypad worker and the reconciler.

use std::fmt;

/// Arm state mirrored from the base station. Only a confirmed poll moves it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ArmState {
    #[default]
    Unknown,
    Disarmed,
    Armed,
}

impl ArmState {
    /// Literal written to the flag file; `None` while nothing is confirmed yet.
    pub fn flag_literal(self) -> Option<&'static str> {
        match self {
            ArmState::Unknown => None,
            ArmState::Disarmed => Some("False"),
            ArmState::Armed => Some("True"),
        }
    }

    pub fn is_confirmed(self) -> bool {
        !matches!(self, ArmState::Unknown)
    }
}

impl fmt::Display for ArmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArmState::Unknown => "unknown",
            ArmState::Disarmed => "disarmed",
            ArmState::Armed => "armed",
        };
        f.write_str(label)
    }
}

/// Outcome of one gateway poll. `Unavailable` is never folded into a default.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArmPoll {
    Armed,
    Disarmed,
    Unavailable,
}

impl ArmPoll {
    /// The confirmed state carried by this poll, if any.
    pub fn confirmed(self) -> Option<ArmState> {
        match self {
            ArmPoll::Armed => Some(ArmState::Armed),
            ArmPoll::Disarmed => Some(ArmState::Disarmed),
            ArmPoll::Unavailable => None,
        }
    }
}

impl From<bool> for ArmPoll {
    fn from(armed: bool) -> Self {
        if armed {
            ArmPoll::Armed
        } else {
            ArmPoll::Disarmed
        }
    }
}

/// User intent decoded from one completed keypad entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Right,
    WrongCode,
    Refresh,
    Quit,
}

/// What the panel shows. Derived on every render, never stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DisplayState {
    Waiting,
    Armed,
    Disarmed,
    WrongCodeOverlay,
}

impl DisplayState {
    /// Combine the mirrored state with the one-shot wrong-code flag.
    pub fn derive(arm_state: ArmState, wrong_code: bool) -> Self {
        if wrong_code {
            return DisplayState::WrongCodeOverlay;
        }
        match arm_state {
            ArmState::Unknown => DisplayState::Waiting,
            ArmState::Armed => DisplayState::Armed,
            ArmState::Disarmed => DisplayState::Disarmed,
        }
    }
}

/// Outbound event kinds. The names match the webhook event identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Armed,
    Disarmed,
    WrongCode { snapshot_url: String },
}

impl Notification {
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::Armed => "armed",
            Notification::Disarmed => "disarmed",
            Notification::WrongCode { .. } => "wrongPIN",
        }
    }

    /// Notification for an observed transition into `state`.
    pub fn for_transition(state: ArmState) -> Option<Self> {
        match state {
            ArmState::Armed => Some(Notification::Armed),
            ArmState::Disarmed => Some(Notification::Disarmed),
            ArmState::Unknown => None,
        }
    }
}
