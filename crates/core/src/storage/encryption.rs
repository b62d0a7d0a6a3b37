use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Argon2id parameters for deriving the record key from the store passphrase.
/// Written into every sealed record so they can change between saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 19_456, // 19 MiB, OWASP minimum for Argon2id
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Reject parameters outside the range we're willing to run. Records are
    /// untrusted input, so this runs before any key derivation.
    pub fn check(&self) -> Result<(), String> {
        if !(8..=1_048_576).contains(&self.memory_cost) {
            return Err(format!(
                "KDF memory_cost out of range: {} KiB (expected 8..=1048576)",
                self.memory_cost
            ));
        }
        if !(1..=20).contains(&self.time_cost) {
            return Err(format!(
                "KDF time_cost out of range: {} (expected 1..=20)",
                self.time_cost
            ));
        }
        if !(1..=16).contains(&self.parallelism) {
            return Err(format!(
                "KDF parallelism out of range: {} (expected 1..=16)",
                self.parallelism
            ));
        }
        Ok(())
    }
}

/// Ciphertext plus everything except the passphrase needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedRecord {
    pub kdf: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    /// AES-256-GCM output, auth tag included
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a fresh salt and nonce.
pub fn seal(plaintext: &[u8], passphrase: &str, kdf: KdfParams) -> Result<SealedRecord, CoreError> {
    let salt: [u8; 16] = random_bytes()?;
    let nonce: [u8; 12] = random_bytes()?;
    let cipher = cipher_for(passphrase, &salt, &kdf)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CoreError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

    Ok(SealedRecord {
        kdf,
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a sealed record. A wrong passphrase and a tampered record are
/// indistinguishable and both yield `CoreError::Decryption`.
pub fn open(record: &SealedRecord, passphrase: &str) -> Result<Vec<u8>, CoreError> {
    let cipher = cipher_for(passphrase, &record.salt, &record.kdf)?;
    let plaintext = cipher.decrypt(Nonce::from_slice(&record.nonce), record.ciphertext.as_slice())?;
    Ok(plaintext)
}

fn cipher_for(passphrase: &str, salt: &[u8; 16], kdf: &KdfParams) -> Result<Aes256Gcm, CoreError> {
    kdf.check().map_err(CoreError::Encryption)?;
    let params = Params::new(kdf.memory_cost, kdf.time_cost, kdf.parallelism, Some(32))
        .map_err(|e| CoreError::Encryption(format!("Invalid Argon2 params: {e}")))?;

    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CoreError::Encryption(format!("Argon2 key derivation failed: {e}")))?;

    Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))
}

fn random_bytes<const N: usize>() -> Result<[u8; N], CoreError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)
        .map_err(|e| CoreError::Encryption(format!("Failed to gather randomness: {e}")))?;
    Ok(buf)
}
