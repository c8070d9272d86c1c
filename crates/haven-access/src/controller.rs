//! Access controller
//!
//! Threads an [`AccessState`] through [`next_state`] and performs the side
//! effects of each transition: role matching, duress wipe, first-run setup
//! and the advisory failure counter.

use crate::pin_pad::{PadStatus, PinPad};
use crate::setup::{SetupFlow, SetupOutcome, SetupStep};
use crate::state::{next_state, AccessEvent, AccessState, Screen};
use crate::{Error, Result};
use haven_core::{Pin, PinRole};
use haven_params::{BackoffPolicy, HavenConfig};
use haven_storage::{CredentialManager, DecoyFacade, EvidenceVault, SettingsStore};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a key press or a submitted PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryResult {
    /// PIN incomplete; digits entered so far
    Pending(usize),
    /// Setup: first entry taken, enter it again
    ConfirmPin,
    /// Setup: entries differed, start over
    Mismatch,
    /// Entry finished and the state changed
    Resolved(AccessState),
}

/// Drives the disguise, PIN pad and unlocked states
pub struct AccessController {
    vault: Arc<EvidenceVault>,
    credentials: Arc<CredentialManager>,
    settings: SettingsStore,
    backoff: BackoffPolicy,
    state: AccessState,
    pad: PinPad,
    setup: Option<SetupFlow>,
    decoy: Option<DecoyFacade>,
    failures: u32,
    wipe_pending: bool,
}

impl AccessController {
    /// Create a controller in the disguised state, gated by the vault's
    /// credentials
    pub fn new(vault: Arc<EvidenceVault>, config: &HavenConfig) -> Self {
        let credentials = vault.credentials().clone();
        let pad = PinPad::new(credentials.policy());
        Self {
            settings: SettingsStore::new(vault.record_store().clone()),
            credentials,
            vault,
            backoff: config.backoff,
            state: AccessState::Disguised,
            pad,
            setup: None,
            decoy: None,
            failures: 0,
            wipe_pending: false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current state
    pub fn state(&self) -> AccessState {
        self.state
    }

    /// What the UI should render
    pub fn screen(&self) -> Screen {
        self.state.screen()
    }

    /// Consecutive failed entries since the last unlock
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Advisory wait before the next attempt. Never enforced.
    pub fn retry_after(&self) -> Duration {
        self.backoff.delay_for(self.failures)
    }

    /// Returns `true` while the PIN pad is collecting the first real PIN
    pub fn in_setup(&self) -> bool {
        self.setup.is_some()
    }

    /// Setup step, if setup is running
    pub fn setup_step(&self) -> Option<SetupStep> {
        self.setup.as_ref().map(SetupFlow::step)
    }

    /// Cancel is hidden on first run
    pub fn can_cancel(&self) -> bool {
        self.state == AccessState::Authenticating && self.setup.is_none()
    }

    /// Masked PIN pad contents
    pub fn masked_entry(&self) -> String {
        self.pad.masked()
    }

    /// Decoy data, reachable only while the decoy is unlocked
    pub fn decoy(&self) -> Option<&DecoyFacade> {
        match self.state {
            AccessState::UnlockedDecoy => self.decoy.as_ref(),
            _ => None,
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Hidden gesture on the disguise: open the PIN pad.
    ///
    /// Enters setup mode when no real PIN exists yet.
    pub fn open_pin_pad(&mut self) -> Result<AccessState> {
        let next = next_state(self.state, AccessEvent::OpenPinPad)?;
        self.finish_pending_wipe();

        let first_run = !self.credentials.is_configured(PinRole::Real)?;
        self.pad.clear();
        self.setup = first_run.then(SetupFlow::new);
        self.state = next;
        tracing::debug!("PIN pad opened");
        Ok(self.state)
    }

    /// Feed one key from the PIN pad. The entry is submitted as soon as it
    /// reaches the configured length.
    pub fn press_key(&mut self, key: char) -> Result<EntryResult> {
        self.require_authenticating(AccessEvent::NoMatch)?;
        match self.pad.push(key) {
            PadStatus::Incomplete(n) => Ok(EntryResult::Pending(n)),
            PadStatus::Complete(pin) => self.submit_pin(&pin),
        }
    }

    /// Remove the last digit from the PIN pad
    pub fn backspace(&mut self) {
        self.pad.backspace();
    }

    /// Submit a complete PIN
    pub fn submit_pin(&mut self, pin: &Pin) -> Result<EntryResult> {
        self.require_authenticating(AccessEvent::NoMatch)?;
        self.pad.clear();

        if self.setup.is_some() {
            return self.submit_setup(pin);
        }

        let matched = self.credentials.match_any_role(pin)?;
        let event = match matched {
            Some(role) => AccessEvent::Matched(role),
            None => AccessEvent::NoMatch,
        };
        let next = next_state(self.state, event)?;

        match matched {
            Some(PinRole::Real) => {
                self.failures = 0;
                tracing::info!("Unlocked");
            }
            Some(PinRole::Decoy) => {
                self.failures = 0;
                self.decoy = Some(DecoyFacade::new());
                tracing::info!("Unlocked");
            }
            Some(PinRole::Wipe) => {
                self.wipe_pending = true;
                self.finish_pending_wipe();
                self.failures = self.failures.saturating_add(1);
                tracing::debug!("PIN rejected");
            }
            Some(PinRole::Vault) | None => {
                self.failures = self.failures.saturating_add(1);
                tracing::debug!("PIN rejected");
            }
        }

        self.state = next;
        Ok(EntryResult::Resolved(next))
    }

    /// Back out of the PIN pad without submitting
    pub fn cancel(&mut self) -> Result<AccessState> {
        if self.state == AccessState::Authenticating && self.setup.is_some() {
            return Err(Error::CancelSuppressed);
        }
        self.state = next_state(self.state, AccessEvent::Cancel)?;
        self.pad.clear();
        Ok(self.state)
    }

    /// Leave any screen (exit, timeout, acknowledgement) and return to the
    /// disguise.
    ///
    /// Refused during first-run setup, like [`AccessController::cancel`].
    pub fn exit(&mut self) -> Result<AccessState> {
        if self.state == AccessState::Authenticating && self.setup.is_some() {
            return Err(Error::CancelSuppressed);
        }
        self.state = next_state(self.state, AccessEvent::Exit)?;
        self.pad.clear();
        self.setup = None;
        self.decoy = None;
        Ok(self.state)
    }

    /// Erase every credential, evidence record and setting from the
    /// unlocked real app, then return to the disguise.
    pub fn wipe_data(&mut self) -> Result<AccessState> {
        let next = next_state(self.state, AccessEvent::EraseAll)?;
        self.vault.wipe()?;
        self.pad.clear();
        self.decoy = None;
        self.failures = 0;
        self.wipe_pending = false;
        self.state = next;
        Ok(next)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn submit_setup(&mut self, pin: &Pin) -> Result<EntryResult> {
        pin.check(self.credentials.policy())?;

        let Some(flow) = self.setup.as_mut() else {
            return Err(Error::InvalidTransition(crate::InvalidTransition {
                state: self.state,
                event: AccessEvent::SetupComplete,
            }));
        };

        match flow.submit(pin.clone()) {
            SetupOutcome::ConfirmPin => Ok(EntryResult::ConfirmPin),
            SetupOutcome::Mismatch => Ok(EntryResult::Mismatch),
            SetupOutcome::Confirmed(pin) => {
                let next = next_state(self.state, AccessEvent::SetupComplete)?;
                self.credentials.set_credential(PinRole::Real, &pin)?;
                self.settings.mark_setup_complete()?;
                self.setup = None;
                self.failures = 0;
                self.state = next;
                tracing::info!("Initial PIN configured");
                Ok(EntryResult::Resolved(next))
            }
        }
    }

    /// Run an outstanding duress wipe. A failure leaves it pending so the
    /// next PIN pad opening tries again; nothing about it is surfaced.
    fn finish_pending_wipe(&mut self) {
        if self.wipe_pending && self.vault.wipe().is_ok() {
            self.wipe_pending = false;
        }
    }

    fn require_authenticating(&self, event: AccessEvent) -> Result<()> {
        if self.state == AccessState::Authenticating {
            Ok(())
        } else {
            Err(Error::InvalidTransition(crate::InvalidTransition {
                state: self.state,
                event,
            }))
        }
    }
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("state", &self.state)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::test_helpers::{fast_codec, fast_kdf_params};
    use haven_core::{CipherSuite, PinPolicy};
    use haven_storage::{MemoryRecordStore, MemorySecretStore};

    fn controller() -> (AccessController, Arc<CredentialManager>) {
        let credentials = Arc::new(CredentialManager::with_params(
            Arc::new(MemorySecretStore::new()),
            fast_kdf_params(),
            PinPolicy::default(),
        ));
        let vault = Arc::new(EvidenceVault::new(
            Arc::new(MemoryRecordStore::new()),
            credentials.clone(),
            fast_codec(CipherSuite::ChaCha20Poly1305),
        ));
        let controller = AccessController::new(vault, &HavenConfig::default());
        (controller, credentials)
    }

    fn type_pin(controller: &mut AccessController, digits: &str) -> EntryResult {
        let mut last = EntryResult::Pending(0);
        for key in digits.chars() {
            last = controller.press_key(key).unwrap();
        }
        last
    }

    #[test]
    fn test_starts_disguised() {
        let (controller, _) = controller();
        assert_eq!(controller.state(), AccessState::Disguised);
        assert_eq!(controller.screen(), Screen::Calculator);
        assert_eq!(controller.retry_after(), Duration::ZERO);
    }

    #[test]
    fn test_never_completes_early() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        controller.open_pin_pad().unwrap();
        assert_eq!(type_pin(&mut controller, "12345"), EntryResult::Pending(5));
        assert_eq!(controller.state(), AccessState::Authenticating);
        assert_eq!(
            controller.press_key('6').unwrap(),
            EntryResult::Resolved(AccessState::UnlockedReal)
        );
    }

    #[test]
    fn test_keys_rejected_outside_pin_pad() {
        let (mut controller, _) = controller();
        assert!(matches!(controller.press_key('1'), Err(Error::InvalidTransition(_))));
    }

    #[test]
    fn test_first_run_setup() {
        let (mut controller, credentials) = controller();
        controller.open_pin_pad().unwrap();
        assert!(controller.in_setup());
        assert!(!controller.can_cancel());
        assert!(matches!(controller.cancel(), Err(Error::CancelSuppressed)));
        assert!(matches!(controller.exit(), Err(Error::CancelSuppressed)));
        assert_eq!(controller.state(), AccessState::Authenticating);

        assert_eq!(type_pin(&mut controller, "123456"), EntryResult::ConfirmPin);
        assert_eq!(controller.setup_step(), Some(SetupStep::Confirm));
        assert_eq!(
            type_pin(&mut controller, "123456"),
            EntryResult::Resolved(AccessState::UnlockedReal)
        );
        assert!(!controller.in_setup());
        assert!(credentials.verify_credential(PinRole::Real, &Pin::new("123456")).unwrap());
    }

    #[test]
    fn test_setup_mismatch_restarts() {
        let (mut controller, credentials) = controller();
        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "123456");
        assert_eq!(type_pin(&mut controller, "111111"), EntryResult::Mismatch);
        assert_eq!(controller.setup_step(), Some(SetupStep::Enter));
        assert_eq!(controller.state(), AccessState::Authenticating);
        assert!(!credentials.is_configured(PinRole::Real).unwrap());
    }

    #[test]
    fn test_cancel_returns_to_disguise() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "123");
        assert!(controller.can_cancel());
        assert_eq!(controller.cancel().unwrap(), AccessState::Disguised);
        assert_eq!(controller.masked_entry(), "○○○○○○");
        assert_eq!(controller.failures(), 0);
    }

    #[test]
    fn test_failures_drive_backoff_and_reset() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        for _ in 0..4 {
            controller.open_pin_pad().unwrap();
            type_pin(&mut controller, "000000");
            assert_eq!(controller.state(), AccessState::Denied);
            controller.exit().unwrap();
        }
        assert_eq!(controller.failures(), 4);
        assert_eq!(controller.retry_after(), Duration::from_millis(1000));

        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "123456");
        assert_eq!(controller.failures(), 0);
        assert_eq!(controller.retry_after(), Duration::ZERO);
    }

    #[test]
    fn test_vault_pin_does_not_unlock() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        credentials.set_credential(PinRole::Vault, &Pin::new("246810")).unwrap();
        controller.open_pin_pad().unwrap();
        assert_eq!(
            type_pin(&mut controller, "246810"),
            EntryResult::Resolved(AccessState::Denied)
        );
        assert_eq!(controller.failures(), 1);
    }

    #[test]
    fn test_decoy_facade_only_when_decoy_unlocked() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        credentials.set_credential(PinRole::Decoy, &Pin::new("654321")).unwrap();

        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "654321");
        assert_eq!(controller.state(), AccessState::UnlockedDecoy);
        assert_eq!(controller.decoy().map(|d| d.list_records().len()), Some(3));

        controller.exit().unwrap();
        assert!(controller.decoy().is_none());
        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "123456");
        assert!(controller.decoy().is_none());
    }

    #[test]
    fn test_wipe_data_only_when_real_unlocked() {
        let (mut controller, credentials) = controller();
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        credentials.set_credential(PinRole::Decoy, &Pin::new("654321")).unwrap();

        assert!(controller.wipe_data().is_err());
        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "654321");
        assert!(matches!(controller.wipe_data(), Err(Error::InvalidTransition(_))));
        assert!(credentials.is_configured(PinRole::Real).unwrap());

        controller.exit().unwrap();
        controller.open_pin_pad().unwrap();
        type_pin(&mut controller, "123456");
        assert_eq!(controller.wipe_data().unwrap(), AccessState::Disguised);
        for role in PinRole::ALL {
            assert!(!credentials.is_configured(role).unwrap());
        }
    }
}
