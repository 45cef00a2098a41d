//! Encryption primitives
//!
//! AES-256-GCM and ChaCha20-Poly1305 for record payloads, Argon2id for
//! passphrase-derived keys, zeroization for key bytes.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::ChaCha20Poly1305;
use entry_core::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Argon2id parameters: memory (KiB), iterations, lanes
const ARGON2_PARAMS: (u32, u32, u32) = (65536, 3, 4);

/// Salt length for key derivation
pub const SALT_LENGTH: usize = 16;

/// Payload encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    /// AES-256-GCM
    AesGcm,
    /// ChaCha20-Poly1305
    ChaCha20Poly1305,
}

/// Generate a random key-derivation salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive 32 key bytes from a passphrase with Argon2id
pub fn derive_key_bytes(passphrase: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let (m_cost, t_cost, p_cost) = ARGON2_PARAMS;
    let params = Params::new(m_cost, t_cost, p_cost, Some(32))
        .map_err(|e| Error::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

/// Key for SQLCipher page encryption
pub struct EncryptionKey(Zeroizing<[u8; 32]>);

impl EncryptionKey {
    /// Derive from passphrase using Argon2id + salt
    pub fn from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self> {
        Ok(Self(Zeroizing::new(derive_key_bytes(passphrase, salt)?)))
    }

    /// Derive using SHA-256 (opening databases from old installs only)
    pub fn from_legacy_password(password: &str) -> Self {
        let hash = Sha256::digest(password.as_bytes());
        Self(Zeroizing::new(hash.into()))
    }

    /// Create from raw key bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Master key for record payload encryption
#[derive(Clone)]
pub struct MasterKey {
    key: Zeroizing<[u8; 32]>,
    algorithm: EncryptionAlgorithm,
}

impl MasterKey {
    /// Generate a new random master key
    pub fn generate(algorithm: EncryptionAlgorithm) -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self {
            key: Zeroizing::new(key),
            algorithm,
        }
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8], algorithm: EncryptionAlgorithm) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Encryption("Invalid key length".to_string()));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self {
            key: Zeroizing::new(key),
            algorithm,
        })
    }

    /// Encrypt a payload.
    ///
    /// Output framing: `[version(1)][algorithm(1)][nonce(12)][ciphertext]`
    /// so the algorithm can change without re-encrypting old rows.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let (tag, ciphertext) = match self.algorithm {
            EncryptionAlgorithm::AesGcm => {
                let cipher = Aes256Gcm::new(self.key.as_ref().into());
                let nonce = Nonce::from_slice(&nonce_bytes);
                (
                    0u8,
                    cipher
                        .encrypt(nonce, plaintext)
                        .map_err(|e| Error::Encryption(e.to_string()))?,
                )
            }
            EncryptionAlgorithm::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new(self.key.as_ref().into());
                let nonce = chacha20poly1305::Nonce::from_slice(&nonce_bytes);
                (
                    1u8,
                    cipher
                        .encrypt(nonce, plaintext)
                        .map_err(|e| Error::Encryption(e.to_string()))?,
                )
            }
        };

        let mut result = Vec::with_capacity(1 + 1 + 12 + ciphertext.len());
        result.push(1); // framing version
        result.push(tag);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt a payload produced by [`MasterKey::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < 14 {
            return Err(Error::Encryption("Invalid ciphertext length".to_string()));
        }

        let version = data[0];
        if version != 1 {
            return Err(Error::Encryption(format!(
                "Unsupported encryption version: {}",
                version
            )));
        }

        let algorithm = data[1];
        let nonce_bytes = &data[2..14];
        let ciphertext = &data[14..];

        match (algorithm, self.algorithm) {
            (0, EncryptionAlgorithm::AesGcm) => {
                let cipher = Aes256Gcm::new(self.key.as_ref().into());
                cipher
                    .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
                    .map_err(|e| Error::Encryption(e.to_string()))
            }
            (1, EncryptionAlgorithm::ChaCha20Poly1305) => {
                let cipher = ChaCha20Poly1305::new(self.key.as_ref().into());
                cipher
                    .decrypt(chacha20poly1305::Nonce::from_slice(nonce_bytes), ciphertext)
                    .map_err(|e| Error::Encryption(e.to_string()))
            }
            (tag, expected) => Err(Error::Encryption(format!(
                "Algorithm mismatch: ciphertext tagged {}, key configured for {:?}",
                tag, expected
            ))),
        }
    }
}
