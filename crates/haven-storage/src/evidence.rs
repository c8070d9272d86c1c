//! Encrypted evidence vault
//!
//! All records live in one JSON list under [`EVIDENCE_KEY`], in insertion
//! order. Every payload is an envelope sealed with the vault secret; titles,
//! timestamps and location tags stay readable so the list screen works
//! without a PIN.
//!
//! A single mutex covers every read-modify-write of the list, so a re-key
//! works from a consistent snapshot and cannot lose a concurrent add or
//! delete.

use crate::credentials::require;
use crate::wipe::wipe_all;
use crate::{CredentialManager, RecordStore};
use haven_core::{
    CancelToken, EncryptionEnvelope, EnvelopeCodec, Error, Pin, PinRole, Result,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Record store key for the evidence list
pub const EVIDENCE_KEY: &str = "haven.evidence";

/// Kind of captured evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    /// Camera capture
    Photo,
    /// Voice recording
    Audio,
    /// Written note
    Note,
}

/// Where a record was captured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTag {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

/// Optional plaintext metadata attached when adding a record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceMeta {
    /// Display title
    pub title: Option<String>,
    /// Capture location
    pub geo_tag: Option<GeoTag>,
    /// Recording length, for audio
    pub duration_secs: Option<u32>,
}

impl EvidenceMeta {
    /// Metadata with just a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Attach a location
    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.geo_tag = Some(GeoTag { lat, lon });
        self
    }
}

/// A stored evidence record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// UUID v4
    pub id: String,
    /// Evidence kind
    pub kind: EvidenceKind,
    /// Capture time, unix milliseconds
    pub created_at: i64,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Base64 envelope holding the content
    pub payload: String,
    /// Capture location
    #[serde(default)]
    pub geo_tag: Option<GeoTag>,
    /// Recording length, for audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

/// Listing entry: everything but the payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceSummary {
    /// Record id
    pub id: String,
    /// Evidence kind
    pub kind: EvidenceKind,
    /// Capture time, unix milliseconds
    pub created_at: i64,
    /// Display title
    pub title: Option<String>,
    /// Capture location
    pub geo_tag: Option<GeoTag>,
    /// Recording length, for audio
    pub duration_secs: Option<u32>,
}

impl From<&EvidenceRecord> for EvidenceSummary {
    fn from(record: &EvidenceRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            created_at: record.created_at,
            title: record.title.clone(),
            geo_tag: record.geo_tag,
            duration_secs: record.duration_secs,
        }
    }
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// CRUD over encrypted evidence records.
pub struct EvidenceVault {
    records: Arc<dyn RecordStore>,
    credentials: Arc<CredentialManager>,
    codec: EnvelopeCodec,
    lock: Mutex<()>,
    clock: Clock,
}

impl EvidenceVault {
    /// Create a vault over `records`, gated by `credentials`
    pub fn new(
        records: Arc<dyn RecordStore>,
        credentials: Arc<CredentialManager>,
        codec: EnvelopeCodec,
    ) -> Self {
        Self {
            records,
            credentials,
            codec,
            lock: Mutex::new(()),
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replace the timestamp source (unix milliseconds)
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Encrypt `plaintext` under `pin` and append it as a new record.
    ///
    /// `pin` must verify as the vault secret.
    pub fn add_record(
        &self,
        kind: EvidenceKind,
        plaintext: &[u8],
        pin: &Pin,
        meta: EvidenceMeta,
    ) -> Result<String> {
        let _guard = self.lock.lock();
        require(self.credentials.verify_vault_secret(pin)?)?;
        let envelope = self.codec.seal(plaintext, pin)?;

        let record = EvidenceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            created_at: (self.clock)(),
            title: meta.title,
            payload: envelope.to_base64(),
            geo_tag: meta.geo_tag,
            duration_secs: meta.duration_secs,
        };
        let id = record.id.clone();

        let mut records = self.load()?;
        records.push(record);
        self.save(&records)?;

        tracing::debug!("Evidence record added ({} total)", records.len());
        Ok(id)
    }

    /// Metadata for every record, most recent first.
    ///
    /// Records with the same timestamp are ordered by later insertion first.
    pub fn list_records(&self) -> Result<Vec<EvidenceSummary>> {
        let _guard = self.lock.lock();
        let records = self.load()?;
        let mut summaries: Vec<EvidenceSummary> =
            records.iter().rev().map(EvidenceSummary::from).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Number of stored records
    pub fn record_count(&self) -> Result<usize> {
        let _guard = self.lock.lock();
        Ok(self.load()?.len())
    }

    /// Decrypt one record. The vault secret is verified on every call and
    /// nothing is cached.
    pub fn reveal_record(&self, id: &str, pin: &Pin) -> Result<Zeroizing<Vec<u8>>> {
        let _guard = self.lock.lock();
        require(self.credentials.verify_vault_secret(pin)?)?;

        let payload = self
            .load()?
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| r.payload)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;

        let envelope = EncryptionEnvelope::from_base64(&payload)?;
        self.codec.open(&envelope, pin)
    }

    /// Permanently remove one record
    pub fn delete_record(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        records.remove(index);
        self.save(&records)?;
        tracing::debug!("Evidence record deleted ({} remaining)", records.len());
        Ok(())
    }

    /// Re-encrypt every record from `old_pin` to `new_pin`.
    ///
    /// Either every record is re-keyed and the list is written once, or
    /// nothing is written and [`Error::RekeyAborted`] is returned.
    pub fn rekey_all(&self, old_pin: &Pin, new_pin: &Pin) -> Result<usize> {
        self.rekey_all_with_cancel(old_pin, new_pin, &CancelToken::new())
    }

    /// [`EvidenceVault::rekey_all`] that stops between records when `cancel`
    /// fires, returning [`Error::Cancelled`] without writing.
    pub fn rekey_all_with_cancel(
        &self,
        old_pin: &Pin,
        new_pin: &Pin,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let _guard = self.lock.lock();
        let records = self.load()?;
        let rekeyed = self.rekey_records(&records, old_pin, new_pin, cancel)?;
        self.save(&rekeyed)?;
        tracing::info!("Re-keyed {} evidence records", rekeyed.len());
        Ok(rekeyed.len())
    }

    /// Change the PIN for `role`, re-keying the evidence if that PIN is (or
    /// becomes) the vault secret.
    ///
    /// `current` must verify for `role`. When a Vault PIN is being set for
    /// the first time, `current` is the Real PIN that protects the records
    /// today. If the credential write fails after the records were re-keyed,
    /// the previous record list is put back.
    pub fn change_pin(&self, role: PinRole, current: &Pin, new_pin: &Pin) -> Result<()> {
        new_pin.check(self.credentials.policy())?;

        // Held from verification through the credential write, so no add,
        // delete or wipe can land between the check and the re-key.
        let _guard = self.lock.lock();
        let vault_role = self.credentials.vault_secret_role()?;
        let auth_role = if self.credentials.is_configured(role)? {
            role
        } else if role == PinRole::Vault {
            vault_role
        } else {
            return Err(Error::auth());
        };
        require(self.credentials.verify_credential(auth_role, current)?)?;

        let owns_vault = role == vault_role || role == PinRole::Vault;
        if !owns_vault {
            return self.credentials.set_credential(role, new_pin);
        }

        let previous = self.records.get_blob(EVIDENCE_KEY)?;
        let records = self.load()?;
        let rekeyed = self.rekey_records(&records, current, new_pin, &CancelToken::new())?;
        self.save(&rekeyed)?;

        if let Err(e) = self.credentials.set_credential(role, new_pin) {
            tracing::warn!("Credential update failed, restoring evidence: {}", e);
            let restored = match &previous {
                Some(blob) => self.records.put_blob(EVIDENCE_KEY, blob),
                None => self.records.remove_blob(EVIDENCE_KEY),
            };
            if let Err(restore_err) = restored {
                tracing::warn!("Failed to restore evidence: {}", restore_err);
            }
            return Err(e);
        }

        tracing::info!("PIN changed, {} evidence records re-keyed", rekeyed.len());
        Ok(())
    }

    /// Delete every credential and every stored record.
    ///
    /// Runs under the vault lock, so an add already in flight either lands
    /// before the wipe and is destroyed with everything else, or sees the
    /// wiped credentials and fails.
    pub fn wipe(&self) -> Result<()> {
        let _guard = self.lock.lock();
        wipe_all(&self.credentials, self.records.as_ref())
    }

    /// Credentials gating this vault
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Backing record store
    pub fn record_store(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    fn rekey_records(
        &self,
        records: &[EvidenceRecord],
        old_pin: &Pin,
        new_pin: &Pin,
        cancel: &CancelToken,
    ) -> Result<Vec<EvidenceRecord>> {
        let total = records.len();
        let mut rekeyed = Vec::with_capacity(total);
        for (index, record) in records.iter().enumerate() {
            cancel.check()?;
            let aborted =
                |_| Error::RekeyAborted(format!("record {} of {} could not be re-keyed", index + 1, total));

            let envelope = EncryptionEnvelope::from_base64(&record.payload).map_err(aborted)?;
            let plaintext = self.codec.open(&envelope, old_pin).map_err(aborted)?;
            let sealed = self.codec.seal(&plaintext, new_pin).map_err(aborted)?;

            rekeyed.push(EvidenceRecord {
                payload: sealed.to_base64(),
                ..record.clone()
            });
        }
        Ok(rekeyed)
    }

    fn load(&self) -> Result<Vec<EvidenceRecord>> {
        match self.records.get_blob(EVIDENCE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[EvidenceRecord]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.records.put_blob(EVIDENCE_KEY, &raw)?;
        Ok(())
    }
}
