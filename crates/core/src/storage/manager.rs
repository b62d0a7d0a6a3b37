use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::errors::CoreError;
use crate::models::ledger::LedgerState;
use crate::models::user::UserId;

use super::encryption::{self, KdfParams};
use super::format::{self, RecordBody};
use super::store::LedgerStore;

/// Loads and saves one user's [`LedgerState`] through a [`LedgerStore`].
///
/// Flow on save: LedgerState → bincode → (AES-256-GCM(Argon2id(passphrase)) when
/// a passphrase is configured) → framed record → store. Load reverses it.
#[derive(Clone)]
pub struct StorageManager {
    store: Arc<dyn LedgerStore>,
    passphrase: Option<String>,
    kdf: KdfParams,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("store", &self.store.name())
            .field("sealed", &self.passphrase.is_some())
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl StorageManager {
    /// Unsealed records.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            passphrase: None,
            kdf: KdfParams::default(),
        }
    }

    /// Records sealed with `passphrase`.
    pub fn sealed(
        store: Arc<dyn LedgerStore>,
        passphrase: impl Into<String>,
        kdf: KdfParams,
    ) -> Self {
        Self {
            store,
            passphrase: Some(passphrase.into()),
            kdf,
        }
    }

    pub fn from_config(store: Arc<dyn LedgerStore>, config: &StoreConfig) -> Self {
        match &config.passphrase {
            Some(passphrase) => Self::sealed(store, passphrase.clone(), config.kdf),
            None => Self::new(store),
        }
    }

    /// Load the user's ledger, never failing the session.
    ///
    /// - No record yet: seed defaults and persist them.
    /// - Unreadable/corrupted record: fall back to seeded defaults without
    ///   overwriting the bad record, so it stays available for recovery.
    pub fn load(&self, user: &UserId) -> LedgerState {
        match self.try_load(user) {
            Ok(Some(state)) => state,
            Ok(None) => {
                let state = LedgerState::seeded();
                info!(user = %user, "No ledger found, seeding defaults");
                if let Err(e) = self.save(user, &state) {
                    warn!(user = %user, error = %e, "Could not persist seeded ledger");
                }
                state
            }
            Err(e) => {
                warn!(user = %user, error = %e, "Ledger unreadable, falling back to defaults");
                LedgerState::seeded()
            }
        }
    }

    /// Load the user's ledger, surfacing every failure.
    pub fn try_load(&self, user: &UserId) -> Result<Option<LedgerState>, CoreError> {
        match self.store.read(&user.storage_key())? {
            Some(bytes) => self.decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Persist the full ledger. Any failure is reported as
    /// `CoreError::Persistence` so callers can warn that changes aren't durable.
    pub fn save(&self, user: &UserId, state: &LedgerState) -> Result<(), CoreError> {
        let bytes = self
            .encode(state)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        self.store
            .write(&user.storage_key(), &bytes)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        debug!(user = %user, bytes = bytes.len(), store = self.store.name(), "Ledger saved");
        Ok(())
    }

    /// Encode a ledger into a framed record.
    pub fn encode(&self, state: &LedgerState) -> Result<Vec<u8>, CoreError> {
        let plaintext = bincode::serialize(state)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;

        let body = match &self.passphrase {
            Some(passphrase) => {
                RecordBody::Sealed(encryption::seal(&plaintext, passphrase, self.kdf)?)
            }
            None => RecordBody::Plain(plaintext),
        };
        Ok(format::write_record(&body))
    }

    /// Decode a framed record.
    pub fn decode(&self, bytes: &[u8]) -> Result<LedgerState, CoreError> {
        let plaintext = match format::read_record(bytes)? {
            RecordBody::Plain(plaintext) => plaintext,
            RecordBody::Sealed(sealed) => {
                let passphrase = self.passphrase.as_deref().ok_or(CoreError::Decryption)?;
                encryption::open(&sealed, passphrase)?
            }
        };

        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }
}
