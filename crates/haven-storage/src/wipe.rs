//! Duress wipe

use crate::{CredentialManager, RecordStore};
use haven_core::Result;

/// Delete every PIN credential and every stored record (evidence and
/// settings).
///
/// Both steps always run; the first failure is returned afterwards. Nothing
/// is logged.
pub(crate) fn wipe_all(credentials: &CredentialManager, records: &dyn RecordStore) -> Result<()> {
    let credentials_result = credentials.clear_all();
    let records_result = records.clear().map_err(haven_core::Error::from);
    credentials_result.and(records_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryRecordStore, MemorySecretStore, EVIDENCE_KEY, SETTINGS_KEY};
    use haven_core::test_helpers::fast_kdf_params;
    use haven_core::{Pin, PinPolicy, PinRole};
    use std::sync::Arc;

    #[test]
    fn test_wipe_clears_everything() {
        let secrets = Arc::new(MemorySecretStore::new());
        let credentials =
            CredentialManager::with_params(secrets.clone(), fast_kdf_params(), PinPolicy::default());
        credentials.set_credential(PinRole::Real, &Pin::new("123456")).unwrap();
        credentials.set_credential(PinRole::Wipe, &Pin::new("999999")).unwrap();

        let records = MemoryRecordStore::new();
        records.put_blob(EVIDENCE_KEY, "[]").unwrap();
        records.put_blob(SETTINGS_KEY, "{}").unwrap();

        wipe_all(&credentials, &records).unwrap();
        assert!(secrets.is_empty());
        assert!(records.keys().is_empty());
    }
}
