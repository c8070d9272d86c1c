//! First-run PIN setup: enter, then confirm.

use haven_core::{constant_time_eq, Pin};

/// Message shown when the confirmation differs
pub const MISMATCH_MESSAGE: &str = "PINs do not match";

/// Which entry the setup flow is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// First entry ("Create PIN")
    Enter,
    /// Second entry ("Confirm PIN")
    Confirm,
}

/// Result of submitting one entry
#[derive(Debug)]
pub enum SetupOutcome {
    /// First entry accepted; ask for confirmation
    ConfirmPin,
    /// Confirmation differed; flow restarted at [`SetupStep::Enter`]
    Mismatch,
    /// Both entries agreed
    Confirmed(Pin),
}

/// Double-entry setup flow
#[derive(Debug)]
pub struct SetupFlow {
    first: Option<Pin>,
}

impl SetupFlow {
    /// Start at the first entry
    pub fn new() -> Self {
        Self { first: None }
    }

    /// Step the flow is waiting for
    pub fn step(&self) -> SetupStep {
        if self.first.is_some() {
            SetupStep::Confirm
        } else {
            SetupStep::Enter
        }
    }

    /// Submit the next entry
    pub fn submit(&mut self, pin: Pin) -> SetupOutcome {
        match self.first.take() {
            None => {
                self.first = Some(pin);
                SetupOutcome::ConfirmPin
            }
            Some(first) if constant_time_eq(first.as_bytes(), pin.as_bytes()) => {
                SetupOutcome::Confirmed(pin)
            }
            Some(_) => SetupOutcome::Mismatch,
        }
    }

    /// Discard any first entry and start over
    pub fn restart(&mut self) {
        self.first = None;
    }
}

impl Default for SetupFlow {
    fn default() -> Self {
        Self::new()
    }
}
