//! Access states and the transition table

use haven_core::PinRole;

/// Where the app is. Never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessState {
    /// Calculator disguise
    #[default]
    Disguised,
    /// PIN pad open
    Authenticating,
    /// Real app unlocked
    UnlockedReal,
    /// Decoy facade unlocked
    UnlockedDecoy,
    /// Wipe PIN entered; data destroyed
    Wiped,
    /// No role matched
    Denied,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    /// Hidden gesture on the disguise opened the PIN pad
    OpenPinPad,
    /// A completed PIN matched this role
    Matched(PinRole),
    /// A completed PIN matched no role
    NoMatch,
    /// First-run setup stored the real PIN
    SetupComplete,
    /// User backed out of the PIN pad
    Cancel,
    /// Exit, timeout or acknowledgement of the failure screen
    Exit,
    /// User erased all data from the real app
    EraseAll,
}

/// Rejected transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid access transition: {event:?} in {state:?}")]
pub struct InvalidTransition {
    /// State the event arrived in
    pub state: AccessState,
    /// Offending event
    pub event: AccessEvent,
}

/// Apply `event` to `state`.
///
/// A Vault PIN entered on the disguise does not unlock the app and is
/// handled exactly like a PIN that matched nothing.
pub fn next_state(state: AccessState, event: AccessEvent) -> Result<AccessState, InvalidTransition> {
    use AccessEvent as E;
    use AccessState as S;

    let next = match (state, event) {
        (S::Disguised, E::OpenPinPad) => S::Authenticating,

        (S::Authenticating, E::Matched(PinRole::Real)) => S::UnlockedReal,
        (S::Authenticating, E::Matched(PinRole::Decoy)) => S::UnlockedDecoy,
        (S::Authenticating, E::Matched(PinRole::Wipe)) => S::Wiped,
        (S::Authenticating, E::Matched(PinRole::Vault)) => S::Denied,
        (S::Authenticating, E::NoMatch) => S::Denied,
        (S::Authenticating, E::SetupComplete) => S::UnlockedReal,
        (S::Authenticating, E::Cancel) => S::Disguised,

        (S::UnlockedReal, E::EraseAll) => S::Disguised,

        (S::Disguised, E::Exit) => return Err(InvalidTransition { state, event }),
        (_, E::Exit) => S::Disguised,

        _ => return Err(InvalidTransition { state, event }),
    };
    Ok(next)
}

/// Which facade the home screen is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facade {
    /// Real data
    Real,
    /// Decoy data
    Decoy,
}

/// What the UI renders for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Calculator disguise
    Calculator,
    /// PIN pad
    PinPad,
    /// App home; real and decoy share one layout
    Home(Facade),
    /// Generic "incorrect PIN"
    IncorrectPin,
}

impl AccessState {
    /// Screen for this state. Wiped and Denied render identically.
    pub fn screen(self) -> Screen {
        match self {
            AccessState::Disguised => Screen::Calculator,
            AccessState::Authenticating => Screen::PinPad,
            AccessState::UnlockedReal => Screen::Home(Facade::Real),
            AccessState::UnlockedDecoy => Screen::Home(Facade::Decoy),
            AccessState::Wiped | AccessState::Denied => Screen::IncorrectPin,
        }
    }

    /// Returns `true` for the two unlocked states
    pub fn is_unlocked(self) -> bool {
        matches!(self, AccessState::UnlockedReal | AccessState::UnlockedDecoy)
    }
}
