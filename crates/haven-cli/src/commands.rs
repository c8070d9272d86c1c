//! Command handlers

use anyhow::{bail, Context};
use haven_access::{AccessController, EntryResult, Facade, Screen, MISMATCH_MESSAGE};
use haven_core::{EnvelopeCodec, Pin, PinRole};
use haven_params::HavenConfig;
use haven_storage::{
    CredentialManager, Database, DecoyFacade, EvidenceKind, EvidenceMeta, EvidenceSummary,
    EvidenceVault, FallbackSecretStore, GeoTag, RecordStore, SecretStore, SettingsStore,
    SqliteRecordStore, SqliteSecretStore,
};
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Database file inside the data directory
pub const DATABASE_FILE_NAME: &str = "haven.db";

/// Show the user-facing text for a core error, keeping the detail in the log.
fn user_facing(e: haven_core::Error) -> anyhow::Error {
    tracing::debug!("{} error: {}", e.category(), e);
    anyhow::anyhow!(e.user_message())
}

fn access_error(e: haven_access::Error) -> anyhow::Error {
    match e {
        haven_access::Error::Core(e) => user_facing(e),
        other => other.into(),
    }
}

/// Stores and services opened for one invocation
pub struct App {
    config: HavenConfig,
    credentials: Arc<CredentialManager>,
    records: Arc<dyn RecordStore>,
    vault: Arc<EvidenceVault>,
}

impl App {
    /// Open the SQLite stores under `data_dir`
    pub fn open(data_dir: &Path, config: HavenConfig) -> anyhow::Result<Self> {
        let db_path = data_dir.join(DATABASE_FILE_NAME);
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        let db = Arc::new(Mutex::new(db));

        let software: Arc<dyn SecretStore> = Arc::new(SqliteSecretStore::new(db.clone()));
        let secrets: Arc<dyn SecretStore> = Arc::new(FallbackSecretStore::from_platform(software));
        let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db));

        let credentials = Arc::new(CredentialManager::new(secrets, &config));
        let codec = EnvelopeCodec::from_config(&config).map_err(user_facing)?;
        let vault = Arc::new(EvidenceVault::new(records.clone(), credentials.clone(), codec));

        Ok(Self {
            config,
            credentials,
            records,
            vault,
        })
    }

    fn controller(&self) -> AccessController {
        AccessController::new(self.vault.clone(), &self.config)
    }

    fn require_vault_secret(&self, pin: &Pin) -> anyhow::Result<()> {
        if self.credentials.verify_vault_secret(pin).map_err(user_facing)? {
            Ok(())
        } else {
            Err(user_facing(haven_core::Error::auth()))
        }
    }

    /// Refuse a PIN that some other role already answers to
    fn require_unused(&self, pin: &Pin, role: PinRole) -> anyhow::Result<()> {
        match self.credentials.match_any_role(pin).map_err(user_facing)? {
            Some(existing) if existing != role => bail!("That PIN is already in use"),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// First-run setup: the PIN must be entered twice
    pub fn setup(&self, pin: &str, confirm: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut controller = self.controller();
        controller.open_pin_pad().map_err(access_error)?;
        if !controller.in_setup() {
            bail!("A PIN is already configured");
        }

        controller.submit_pin(&Pin::new(pin)).map_err(access_error)?;
        match controller.submit_pin(&Pin::new(confirm)).map_err(access_error)? {
            EntryResult::Resolved(_) => writeln!(out, "PIN configured")?,
            EntryResult::Mismatch => bail!(MISMATCH_MESSAGE),
            other => bail!("Unexpected setup state: {:?}", other),
        }
        Ok(())
    }

    /// Enter a PIN at the disguise and print the home listing on success
    pub fn unlock(&self, pin: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut controller = self.controller();
        controller.open_pin_pad().map_err(access_error)?;
        // No real PIN reads the same as a wrong one; after a duress wipe
        // the store must not announce that it is empty.
        if controller.in_setup() {
            return Err(user_facing(haven_core::Error::auth()));
        }
        controller.submit_pin(&Pin::new(pin)).map_err(access_error)?;

        let listing = match controller.screen() {
            Screen::Home(Facade::Real) => self.vault.list_records().map_err(user_facing)?,
            Screen::Home(Facade::Decoy) => controller
                .decoy()
                .map(DecoyFacade::list_records)
                .unwrap_or_default(),
            _ => return Err(user_facing(haven_core::Error::auth())),
        };

        writeln!(out, "Unlocked")?;
        write_listing(out, &listing)?;
        Ok(())
    }

    /// Erase every PIN, evidence record and setting, authorized by the Real PIN
    pub fn wipe(&self, real: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut controller = self.controller();
        controller.open_pin_pad().map_err(access_error)?;
        if controller.in_setup() {
            return Err(user_facing(haven_core::Error::auth()));
        }
        controller.submit_pin(&Pin::new(real)).map_err(access_error)?;
        if controller.screen() != Screen::Home(Facade::Real) {
            return Err(user_facing(haven_core::Error::auth()));
        }

        controller.wipe_data().map_err(access_error)?;
        writeln!(out, "All data erased")?;
        Ok(())
    }

    /// Configure a Decoy, Wipe or first Vault PIN, authorized by the Real PIN
    pub fn set_pin(
        &self,
        role: PinRole,
        pin: &str,
        real: &str,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let real = Pin::new(real);
        let pin = Pin::parse(pin, self.credentials.policy()).map_err(user_facing)?;

        if !self
            .credentials
            .verify_credential(PinRole::Real, &real)
            .map_err(user_facing)?
        {
            return Err(user_facing(haven_core::Error::auth()));
        }
        self.require_unused(&pin, role)?;

        match role {
            PinRole::Decoy | PinRole::Wipe => self
                .credentials
                .set_credential(role, &pin)
                .map_err(user_facing)?,
            PinRole::Vault => {
                if self.credentials.is_configured(PinRole::Vault).map_err(user_facing)? {
                    bail!("A vault PIN exists; use `haven change-pin vault <old> <new>`");
                }
                self.vault
                    .change_pin(PinRole::Vault, &real, &pin)
                    .map_err(user_facing)?;
            }
            PinRole::Real => bail!("Use `haven change-pin real <old> <new>`"),
        }

        writeln!(out, "{} PIN set", role)?;
        Ok(())
    }

    /// Change the PIN for `role`
    pub fn change_pin(
        &self,
        role: PinRole,
        old: &str,
        new: &str,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let old = Pin::new(old);
        let new = Pin::new(new);

        // Authorize before the in-use check so it cannot be used as a PIN oracle.
        let auth_role = if self.credentials.is_configured(role).map_err(user_facing)? {
            role
        } else if role == PinRole::Vault {
            self.credentials.vault_secret_role().map_err(user_facing)?
        } else {
            return Err(user_facing(haven_core::Error::auth()));
        };
        if !self
            .credentials
            .verify_credential(auth_role, &old)
            .map_err(user_facing)?
        {
            return Err(user_facing(haven_core::Error::auth()));
        }
        self.require_unused(&new, role)?;

        self.vault
            .change_pin(role, &old, &new)
            .map_err(user_facing)?;
        writeln!(out, "{} PIN changed", role)?;
        Ok(())
    }

    // ========================================================================
    // Evidence
    // ========================================================================

    /// Encrypt and store a record, printing its id
    pub fn add_evidence(
        &self,
        kind: EvidenceKind,
        content: &[u8],
        title: Option<String>,
        geo: Option<(f64, f64)>,
        pin: &str,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let meta = EvidenceMeta {
            title,
            geo_tag: geo.map(|(lat, lon)| GeoTag { lat, lon }),
            duration_secs: None,
        };
        let id = self
            .vault
            .add_record(kind, content, &Pin::new(pin), meta)
            .map_err(user_facing)?;
        writeln!(out, "{}", id)?;
        Ok(())
    }

    /// List record metadata
    pub fn list_evidence(&self, pin: &str, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
        self.require_vault_secret(&Pin::new(pin))?;
        let listing = self.vault.list_records().map_err(user_facing)?;
        if json {
            writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
        } else {
            write_listing(out, &listing)?;
        }
        Ok(())
    }

    /// Decrypt a record to `dest`, or to `out` when no file is given
    pub fn reveal_evidence(
        &self,
        id: &str,
        pin: &str,
        dest: Option<&Path>,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let plaintext = self
            .vault
            .reveal_record(id, &Pin::new(pin))
            .map_err(user_facing)?;
        match dest {
            Some(path) => std::fs::write(path, plaintext.as_slice())
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => out.write_all(&plaintext)?,
        }
        Ok(())
    }

    /// Delete a record
    pub fn delete_evidence(&self, id: &str, pin: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        self.require_vault_secret(&Pin::new(pin))?;
        self.vault.delete_record(id).map_err(user_facing)?;
        writeln!(out, "Deleted {}", id)?;
        Ok(())
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Print settings as JSON
    pub fn show_settings(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let settings = SettingsStore::new(self.records.clone())
            .load()
            .map_err(user_facing)?;
        writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
        Ok(())
    }
}

fn kind_label(kind: EvidenceKind) -> &'static str {
    match kind {
        EvidenceKind::Photo => "photo",
        EvidenceKind::Audio => "audio",
        EvidenceKind::Note => "note",
    }
}

fn write_listing(out: &mut dyn Write, listing: &[EvidenceSummary]) -> std::io::Result<()> {
    if listing.is_empty() {
        return writeln!(out, "No items");
    }
    for item in listing {
        let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(item.created_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{}  {:<5}  {}  {}",
            item.id,
            kind_label(item.kind),
            when,
            item.title.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}
