//! End-to-end access scenarios over in-memory stores
//!
//! Tests cover:
//! - Real, decoy and unmatched PINs from the disguise
//! - Duress wipe rendering exactly like a wrong PIN
//! - Return to the disguise after every outcome

use haven_access::{AccessController, AccessState, EntryResult, Error, Screen};
use haven_core::test_helpers::{fast_codec, fast_kdf_params};
use haven_core::{CipherSuite, Pin, PinPolicy, PinRole};
use haven_params::HavenConfig;
use haven_storage::{
    CredentialManager, EvidenceKind, EvidenceMeta, EvidenceVault, MemoryRecordStore,
    MemorySecretStore, RecordStore, SettingsStore,
};
use proptest::prelude::*;
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

const REAL: &str = "123456";
const DECOY: &str = "654321";
const WIPE: &str = "999999";

struct Harness {
    records: Arc<dyn RecordStore>,
    credentials: Arc<CredentialManager>,
    vault: Arc<EvidenceVault>,
    controller: AccessController,
}

fn harness() -> Harness {
    let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let credentials = Arc::new(CredentialManager::with_params(
        Arc::new(MemorySecretStore::new()),
        fast_kdf_params(),
        PinPolicy::default(),
    ));
    credentials.set_credential(PinRole::Real, &Pin::new(REAL)).unwrap();
    credentials.set_credential(PinRole::Decoy, &Pin::new(DECOY)).unwrap();
    credentials.set_credential(PinRole::Wipe, &Pin::new(WIPE)).unwrap();

    let vault = Arc::new(EvidenceVault::new(
        records.clone(),
        credentials.clone(),
        fast_codec(CipherSuite::ChaCha20Poly1305),
    ));
    let controller = AccessController::new(vault.clone(), &HavenConfig::default());

    Harness {
        records,
        credentials,
        vault,
        controller,
    }
}

fn enter(controller: &mut AccessController, digits: &str) -> AccessState {
    controller.open_pin_pad().unwrap();
    match controller.submit_pin(&Pin::new(digits)).unwrap() {
        EntryResult::Resolved(state) => state,
        other => panic!("entry did not resolve: {:?}", other),
    }
}

// =============================================================================
// Unlock outcomes
// =============================================================================

#[test]
fn test_real_pin_unlocks_real() {
    let mut h = harness();
    assert_eq!(enter(&mut h.controller, REAL), AccessState::UnlockedReal);
    assert_eq!(h.controller.screen(), Screen::Home(haven_access::Facade::Real));
    assert_eq!(h.controller.exit().unwrap(), AccessState::Disguised);
}

#[test]
fn test_decoy_pin_unlocks_decoy() {
    let mut h = harness();
    assert_eq!(enter(&mut h.controller, DECOY), AccessState::UnlockedDecoy);
    assert_eq!(h.controller.screen(), Screen::Home(haven_access::Facade::Decoy));
}

#[test]
fn test_unknown_pin_denied() {
    let mut h = harness();
    assert_eq!(enter(&mut h.controller, "000000"), AccessState::Denied);
    assert_eq!(h.controller.screen(), Screen::IncorrectPin);
    assert_eq!(h.controller.failures(), 1);
    assert!(h.credentials.is_configured(PinRole::Real).unwrap());
}

#[test]
fn test_wipe_and_denied_are_indistinguishable() {
    let mut denied = harness();
    let mut wiped = harness();

    let denied_result = {
        denied.controller.open_pin_pad().unwrap();
        denied.controller.submit_pin(&Pin::new("000000")).unwrap()
    };
    let wiped_result = {
        wiped.controller.open_pin_pad().unwrap();
        wiped.controller.submit_pin(&Pin::new(WIPE)).unwrap()
    };

    assert_eq!(denied.controller.screen(), wiped.controller.screen());
    assert_eq!(denied.controller.failures(), wiped.controller.failures());
    assert_eq!(denied.controller.retry_after(), wiped.controller.retry_after());
    assert!(matches!(denied_result, EntryResult::Resolved(AccessState::Denied)));
    assert!(matches!(wiped_result, EntryResult::Resolved(AccessState::Wiped)));
}

// =============================================================================
// Duress wipe
// =============================================================================

#[test]
fn test_wipe_pin_destroys_everything() {
    let mut h = harness();
    let real = Pin::new(REAL);
    h.vault
        .add_record(EvidenceKind::Note, b"first", &real, EvidenceMeta::titled("one"))
        .unwrap();
    h.vault
        .add_record(EvidenceKind::Photo, b"second", &real, EvidenceMeta::default())
        .unwrap();
    SettingsStore::new(h.records.clone()).mark_setup_complete().unwrap();
    assert_eq!(h.vault.list_records().unwrap().len(), 2);

    assert_eq!(enter(&mut h.controller, WIPE), AccessState::Wiped);

    assert!(h.vault.list_records().unwrap().is_empty());
    for role in PinRole::ALL {
        assert!(!h.credentials.is_configured(role).unwrap());
    }
    assert!(SettingsStore::new(h.records.clone()).load().unwrap().first_launch);

    // Back on the disguise the app behaves like a fresh install.
    h.controller.exit().unwrap();
    h.controller.open_pin_pad().unwrap();
    assert!(h.controller.in_setup());
}

#[test]
fn test_erase_all_from_real_app() {
    let mut h = harness();
    let real = Pin::new(REAL);
    h.vault
        .add_record(EvidenceKind::Audio, b"recording", &real, EvidenceMeta::default())
        .unwrap();
    let settings = SettingsStore::new(h.records.clone());
    settings.mark_setup_complete().unwrap();

    assert_eq!(enter(&mut h.controller, REAL), AccessState::UnlockedReal);
    assert_eq!(h.controller.wipe_data().unwrap(), AccessState::Disguised);

    assert_eq!(h.vault.record_count().unwrap(), 0);
    for role in PinRole::ALL {
        assert!(!h.credentials.is_configured(role).unwrap());
    }
    assert!(settings.load().unwrap().first_launch);
    assert_eq!(h.controller.screen(), Screen::Calculator);
}

// =============================================================================
// Cancel and exit
// =============================================================================

#[test]
fn test_cancel_writes_nothing() {
    let mut h = harness();
    h.controller.open_pin_pad().unwrap();
    for key in "99999".chars() {
        assert!(matches!(h.controller.press_key(key).unwrap(), EntryResult::Pending(_)));
    }
    assert_eq!(h.controller.cancel().unwrap(), AccessState::Disguised);
    assert!(h.credentials.is_configured(PinRole::Wipe).unwrap());
    assert_eq!(h.controller.failures(), 0);
}

#[test]
fn test_cancel_suppressed_on_first_run() {
    let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let credentials = Arc::new(CredentialManager::with_params(
        Arc::new(MemorySecretStore::new()),
        fast_kdf_params(),
        PinPolicy::default(),
    ));
    let vault = Arc::new(EvidenceVault::new(
        records,
        credentials,
        fast_codec(CipherSuite::ChaCha20Poly1305),
    ));
    let mut controller = AccessController::new(vault, &HavenConfig::default());
    controller.open_pin_pad().unwrap();
    assert!(matches!(controller.cancel(), Err(Error::CancelSuppressed)));
    assert!(matches!(controller.exit(), Err(Error::CancelSuppressed)));
    assert_eq!(controller.state(), AccessState::Authenticating);
}

#[test]
fn test_exit_from_disguise_rejected() {
    let mut h = harness();
    assert!(matches!(h.controller.exit(), Err(Error::InvalidTransition(_))));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_unknown_pins_never_unlock(digits in "[0-9]{6}") {
        prop_assume!(digits != REAL && digits != DECOY && digits != WIPE);
        let mut h = harness();
        prop_assert_eq!(enter(&mut h.controller, &digits), AccessState::Denied);
        prop_assert!(h.credentials.is_configured(PinRole::Real).unwrap());
    }
}
