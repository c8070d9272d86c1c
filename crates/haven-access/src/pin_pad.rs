//! PIN pad entry buffer

use haven_core::{Pin, PinPolicy};
use zeroize::Zeroizing;

/// Result of a key press
#[derive(Debug)]
pub enum PadStatus {
    /// Still collecting; number of digits entered so far
    Incomplete(usize),
    /// Exactly the configured number of digits; buffer has been cleared
    Complete(Pin),
}

/// Collects digits until exactly the configured length is reached.
pub struct PinPad {
    digits: Zeroizing<String>,
    length: usize,
}

impl PinPad {
    /// Pad for the policy's PIN length
    pub fn new(policy: &PinPolicy) -> Self {
        Self {
            digits: Zeroizing::new(String::with_capacity(policy.length)),
            length: policy.length,
        }
    }

    /// Add a digit. Anything but an ASCII digit is ignored.
    pub fn push(&mut self, key: char) -> PadStatus {
        if key.is_ascii_digit() && self.digits.len() < self.length {
            self.digits.push(key);
        }
        if self.digits.len() == self.length {
            let pin = Pin::new(self.digits.as_str());
            self.clear();
            return PadStatus::Complete(pin);
        }
        PadStatus::Incomplete(self.digits.len())
    }

    /// Remove the last digit
    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    /// Remove every digit
    pub fn clear(&mut self) {
        self.digits.clear();
    }

    /// Digits entered so far
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Returns `true` if nothing has been entered
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// One filled dot per entered digit, one empty dot per remaining digit
    pub fn masked(&self) -> String {
        let filled = self.digits.len();
        "●".repeat(filled) + &"○".repeat(self.length - filled)
    }
}
