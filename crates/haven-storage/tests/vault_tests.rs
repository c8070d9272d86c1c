//! Evidence vault tests across credential, record and wipe boundaries
//!
//! Tests cover:
//! - All-or-nothing re-keying when one record is damaged
//! - Duress wipe leaving no credentials and no records
//! - Persistence through the SQLite stores
//! - Mixed cipher suites in one vault

use haven_core::test_helpers::{fast_codec, fast_kdf_params};
use haven_core::{CipherSuite, EncryptionEnvelope, Error, Pin, PinPolicy, PinRole};
use haven_storage::{
    CredentialManager, Database, EvidenceKind, EvidenceMeta, EvidenceVault,
    MemoryRecordStore, MemorySecretStore, RecordStore, SecretStore, SettingsStore,
    SqliteRecordStore, SqliteSecretStore, EVIDENCE_KEY,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

struct Harness {
    secrets: Arc<dyn SecretStore>,
    records: Arc<dyn RecordStore>,
    credentials: Arc<CredentialManager>,
    vault: EvidenceVault,
}

fn harness_over(secrets: Arc<dyn SecretStore>, records: Arc<dyn RecordStore>) -> Harness {
    let credentials = Arc::new(CredentialManager::with_params(
        secrets.clone(),
        fast_kdf_params(),
        PinPolicy::default(),
    ));
    let vault = EvidenceVault::new(
        records.clone(),
        credentials.clone(),
        fast_codec(CipherSuite::ChaCha20Poly1305),
    );
    Harness {
        secrets,
        records,
        credentials,
        vault,
    }
}

fn memory_harness() -> Harness {
    harness_over(
        Arc::new(MemorySecretStore::new()),
        Arc::new(MemoryRecordStore::new()),
    )
}

fn configure_all_roles(credentials: &CredentialManager) {
    credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
    credentials.set_credential(PinRole::Decoy, &Pin::new("654321")).unwrap();
    credentials.set_credential(PinRole::Wipe, &Pin::new("999999")).unwrap();
    credentials.set_credential(PinRole::Vault, &Pin::new("111111")).unwrap();
}

/// Flip the last tag byte of record `index` in the stored list.
fn corrupt_record(records: &dyn RecordStore, index: usize) {
    let raw = records.get_blob(EVIDENCE_KEY).unwrap().unwrap();
    let mut list: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let payload = list[index]["payload"].as_str().unwrap().to_string();
    let mut envelope = EncryptionEnvelope::from_base64(&payload).unwrap();
    envelope.tag[15] ^= 0xff;
    list[index]["payload"] = serde_json::Value::String(envelope.to_base64());
    records
        .put_blob(EVIDENCE_KEY, &serde_json::to_string(&list).unwrap())
        .unwrap();
}

// =============================================================================
// Re-keying
// =============================================================================

#[test]
fn test_rekey_aborts_on_corrupt_record_and_writes_nothing() {
    let h = memory_harness();
    h.credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
    let old = Pin::new("123456");

    let ids: Vec<String> = ["first", "second", "third"]
        .iter()
        .map(|body| {
            h.vault
                .add_record(EvidenceKind::Note, body.as_bytes(), &old, EvidenceMeta::default())
                .unwrap()
        })
        .collect();

    corrupt_record(h.records.as_ref(), 1);
    let before = h.records.get_blob(EVIDENCE_KEY).unwrap();

    let err = h.vault.rekey_all(&old, &Pin::new("222222")).unwrap_err();
    assert!(matches!(err, Error::RekeyAborted(_)));
    assert_eq!(h.records.get_blob(EVIDENCE_KEY).unwrap(), before);

    // Intact records still open under the old PIN.
    assert_eq!(h.vault.reveal_record(&ids[0], &old).unwrap().as_slice(), b"first");
    assert_eq!(h.vault.reveal_record(&ids[2], &old).unwrap().as_slice(), b"third");
    assert!(matches!(
        h.vault.reveal_record(&ids[1], &old),
        Err(Error::Auth(_))
    ));
}

#[test]
fn test_change_pin_aborts_without_touching_credential() {
    let h = memory_harness();
    let old = Pin::new("123456");
    h.credentials.set_credential(PinRole::Real, &old).unwrap();
    h.vault
        .add_record(EvidenceKind::Note, b"a", &old, EvidenceMeta::default())
        .unwrap();
    h.vault
        .add_record(EvidenceKind::Note, b"b", &old, EvidenceMeta::default())
        .unwrap();
    corrupt_record(h.records.as_ref(), 0);

    let err = h
        .vault
        .change_pin(PinRole::Real, &old, &Pin::new("222222"))
        .unwrap_err();
    assert!(matches!(err, Error::RekeyAborted(_)));
    assert!(h.credentials.verify_credential(PinRole::Real, &old).unwrap());
}

#[test]
fn test_rekey_empty_vault() {
    let h = memory_harness();
    assert_eq!(
        h.vault.rekey_all(&Pin::new("123456"), &Pin::new("654321")).unwrap(),
        0
    );
}

/// Secret store that accepts reads but refuses writes once armed.
struct WriteFailingStore {
    inner: MemorySecretStore,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl SecretStore for WriteFailingStore {
    fn set_secret(&self, key: &str, value: &str) -> haven_storage::Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(haven_storage::Error::Unavailable("read-only".to_string()));
        }
        self.inner.set_secret(key, value)
    }
    fn get_secret(&self, key: &str) -> haven_storage::Result<Option<String>> {
        self.inner.get_secret(key)
    }
    fn delete_secret(&self, key: &str) -> haven_storage::Result<()> {
        self.inner.delete_secret(key)
    }
}

#[test]
fn test_change_pin_restores_records_when_credential_write_fails() {
    let store = Arc::new(WriteFailingStore {
        inner: MemorySecretStore::new(),
        fail_writes: std::sync::atomic::AtomicBool::new(false),
    });
    let h = harness_over(store.clone(), Arc::new(MemoryRecordStore::new()));
    let old = Pin::new("123456");
    h.credentials.set_credential(PinRole::Real, &old).unwrap();
    let id = h
        .vault
        .add_record(EvidenceKind::Photo, b"jpeg", &old, EvidenceMeta::default())
        .unwrap();
    let before = h.records.get_blob(EVIDENCE_KEY).unwrap();

    store
        .fail_writes
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let err = h
        .vault
        .change_pin(PinRole::Real, &old, &Pin::new("222222"))
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.records.get_blob(EVIDENCE_KEY).unwrap(), before);
    assert_eq!(h.vault.reveal_record(&id, &old).unwrap().as_slice(), b"jpeg");
}

// =============================================================================
// Wipe
// =============================================================================

#[test]
fn test_wipe_destroys_records_and_all_roles() {
    let h = memory_harness();
    configure_all_roles(&h.credentials);
    let vault_pin = Pin::new("111111");
    h.vault
        .add_record(EvidenceKind::Photo, b"one", &vault_pin, EvidenceMeta::default())
        .unwrap();
    h.vault
        .add_record(EvidenceKind::Audio, b"two", &vault_pin, EvidenceMeta::default())
        .unwrap();
    let settings = SettingsStore::new(h.records.clone());
    settings.mark_setup_complete().unwrap();

    h.vault.wipe().unwrap();

    assert!(h.vault.list_records().unwrap().is_empty());
    for role in PinRole::ALL {
        assert!(!h.credentials.is_configured(role).unwrap());
    }
    for pin in ["123456", "654321", "999999", "111111"] {
        assert_eq!(h.credentials.match_any_role(&Pin::new(pin)).unwrap(), None);
    }
    assert!(settings.load().unwrap().first_launch);
    assert_eq!(h.secrets.get_secret("haven.pin.real").unwrap(), None);
}

// =============================================================================
// SQLite persistence
// =============================================================================

#[test]
fn test_sqlite_vault_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haven.db");
    let pin = Pin::new("123456");

    let id = {
        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let h = harness_over(
            Arc::new(SqliteSecretStore::new(db.clone())),
            Arc::new(SqliteRecordStore::new(db)),
        );
        h.credentials.set_credential(PinRole::Real, &pin).unwrap();
        h.vault
            .add_record(
                EvidenceKind::Note,
                b"persisted",
                &pin,
                EvidenceMeta::titled("log").at(10.0, 20.0),
            )
            .unwrap()
    };

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let h = harness_over(
        Arc::new(SqliteSecretStore::new(db.clone())),
        Arc::new(SqliteRecordStore::new(db)),
    );
    assert_eq!(h.credentials.match_any_role(&pin).unwrap(), Some(PinRole::Real));
    let listed = h.vault.list_records().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title.as_deref(), Some("log"));
    assert_eq!(h.vault.reveal_record(&id, &pin).unwrap().as_slice(), b"persisted");

    let raw = std::fs::read(&path).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("persisted"));
}

#[test]
fn test_records_from_both_suites_open() {
    let secrets: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
    let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let credentials = Arc::new(CredentialManager::with_params(
        secrets,
        fast_kdf_params(),
        PinPolicy::default(),
    ));
    let pin = Pin::new("123456");
    credentials.set_credential(PinRole::Real, &pin).unwrap();

    let chacha = EvidenceVault::new(
        records.clone(),
        credentials.clone(),
        fast_codec(CipherSuite::ChaCha20Poly1305),
    );
    let aes = EvidenceVault::new(records, credentials, fast_codec(CipherSuite::Aes256Gcm));

    let a = chacha
        .add_record(EvidenceKind::Note, b"chacha", &pin, EvidenceMeta::default())
        .unwrap();
    let b = aes
        .add_record(EvidenceKind::Note, b"aes", &pin, EvidenceMeta::default())
        .unwrap();

    assert_eq!(aes.reveal_record(&a, &pin).unwrap().as_slice(), b"chacha");
    assert_eq!(chacha.reveal_record(&b, &pin).unwrap().as_slice(), b"aes");
    assert_eq!(aes.rekey_all(&pin, &Pin::new("654321")).unwrap(), 2);
}
