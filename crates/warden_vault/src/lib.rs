//! Encrypted credential storage.
//!
//! Remote-access secrets are armored with AES-256-GCM under a key derived
//! once per process from a vault secret. The wire shape is
//! `base64(IV(16) || tag(16) || ciphertext)`: authenticated, so any
//! tampering fails loudly at decrypt time, and non-deterministic, because a
//! fresh random IV is drawn per call.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;

pub use error::{VaultError, VaultErrorKind, VaultResult};

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use argon2::Argon2;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use tracing::{debug, instrument};

/// AES-256-GCM with the 16-byte IV the stored blobs carry.
type Cipher = AesGcm<Aes256, U16>;

/// IV length in bytes.
const IV_LEN: usize = 16;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Fixed salt for key derivation. The secret itself is the only
/// confidential input; the salt just domain-separates the derived key.
const KEY_SALT: &[u8] = b"warden-credential-store";

/// Environment variable holding the vault secret.
pub const SECRET_ENV: &str = "WARDEN_VAULT_SECRET";

/// Credential vault holding the process-wide derived key.
///
/// The key is derived exactly once, in the constructor, via Argon2id; after
/// that it is read-only and safe to share across concurrent encrypt/decrypt
/// calls.
pub struct CredentialVault {
    key: [u8; 32],
}

impl CredentialVault {
    /// Derive the encryption key from a secret and build the vault.
    #[instrument(skip(secret))]
    pub fn new(secret: &str) -> VaultResult<Self> {
        if secret.is_empty() {
            return Err(VaultError::new(VaultErrorKind::KeyDerivation(
                "empty secret".to_string(),
            )));
        }
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(secret.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| VaultError::new(VaultErrorKind::KeyDerivation(e.to_string())))?;
        debug!("Vault key derived");
        Ok(Self { key })
    }

    /// Build the vault from the [`SECRET_ENV`] environment variable,
    /// loading `.env` first when present.
    pub fn from_env() -> VaultResult<Self> {
        dotenvy::dotenv().ok();
        let secret = std::env::var(SECRET_ENV)
            .map_err(|_| VaultError::new(VaultErrorKind::MissingSecret(SECRET_ENV.to_string())))?;
        Self::new(&secret)
    }

    /// Encrypt a credential. Empty input encrypts to nothing (`Ok(None)`).
    ///
    /// Each call draws a fresh random IV, so encrypting the same plaintext
    /// twice yields two different blobs that both decrypt to it.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<Option<String>> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let cipher = Cipher::new(GenericArray::from_slice(&self.key));
        let sealed = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| {
                VaultError::new(VaultErrorKind::KeyDerivation(
                    "encryption failure".to_string(),
                ))
            })?;

        // The aead crate appends the tag; the stored layout puts it between
        // the IV and the ciphertext.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        let mut blob = Vec::with_capacity(IV_LEN + TAG_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);

        Ok(Some(STANDARD.encode(blob)))
    }

    /// Decrypt a stored credential. Empty input decrypts to nothing
    /// (`Ok(None)`); any authentication failure is an error, never masked.
    pub fn decrypt(&self, value: &str) -> VaultResult<Option<String>> {
        if value.is_empty() {
            return Ok(None);
        }

        let blob = STANDARD
            .decode(value)
            .map_err(|e| VaultError::new(VaultErrorKind::InvalidFormat(e.to_string())))?;
        if blob.len() < IV_LEN + TAG_LEN {
            return Err(VaultError::new(VaultErrorKind::InvalidFormat(format!(
                "blob too short: {} bytes",
                blob.len()
            ))));
        }

        let (iv, rest) = blob.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let cipher = Cipher::new(GenericArray::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(iv), sealed.as_slice())
            .map_err(|_| VaultError::new(VaultErrorKind::DecryptionFailed))?;

        let plaintext = String::from_utf8(plaintext)
            .map_err(|e| VaultError::new(VaultErrorKind::InvalidFormat(e.to_string())))?;
        Ok(Some(plaintext))
    }

    /// Best-effort check for whether a value looks like an encrypted blob:
    /// valid base64 decoding to at least IV + tag length.
    ///
    /// This is a diagnostic hint only. A sufficiently long base64-looking
    /// plaintext false-positives, so it must never gate a security
    /// decision; `decrypt` relies solely on the authentication tag.
    pub fn is_encrypted(value: &str) -> bool {
        match STANDARD.decode(value) {
            Ok(blob) => blob.len() >= IV_LEN + TAG_LEN,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new("test-secret").unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let vault = vault();
        let blob = vault.encrypt("ssh-password-123").unwrap().unwrap();
        assert_ne!(blob, "ssh-password-123");
        let plaintext = vault.decrypt(&blob).unwrap().unwrap();
        assert_eq!(plaintext, "ssh-password-123");
    }

    #[test]
    fn test_empty_input_yields_none() {
        let vault = vault();
        assert!(vault.encrypt("").unwrap().is_none());
        assert!(vault.decrypt("").unwrap().is_none());
    }

    #[test]
    fn test_encryption_is_nondeterministic() {
        let vault = vault();
        let a = vault.encrypt("same input").unwrap().unwrap();
        let b = vault.encrypt("same input").unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(vault.decrypt(&a).unwrap().unwrap(), "same input");
        assert_eq!(vault.decrypt(&b).unwrap().unwrap(), "same input");
    }

    #[test]
    fn test_tampering_is_detected() {
        let vault = vault();
        let blob = vault.encrypt("secret").unwrap().unwrap();
        let mut bytes = STANDARD.decode(&blob).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = STANDARD.encode(bytes);

        let err = vault.decrypt(&tampered).unwrap_err();
        assert_eq!(err.kind, VaultErrorKind::DecryptionFailed);
    }

    #[test]
    fn test_wrong_key_fails() {
        let vault_a = CredentialVault::new("secret-a").unwrap();
        let vault_b = CredentialVault::new("secret-b").unwrap();
        let blob = vault_a.encrypt("credential").unwrap().unwrap();
        assert!(vault_b.decrypt(&blob).is_err());
    }

    #[test]
    fn test_garbage_input_is_invalid_format() {
        let vault = vault();
        let err = vault.decrypt("not base64 at all!!!").unwrap_err();
        assert!(matches!(err.kind, VaultErrorKind::InvalidFormat(_)));

        let short = STANDARD.encode(b"short");
        let err = vault.decrypt(&short).unwrap_err();
        assert!(matches!(err.kind, VaultErrorKind::InvalidFormat(_)));
    }

    #[test]
    fn test_is_encrypted_heuristic() {
        let vault = vault();
        let blob = vault.encrypt("credential").unwrap().unwrap();
        assert!(CredentialVault::is_encrypted(&blob));
        assert!(!CredentialVault::is_encrypted("plaintext password"));
        assert!(!CredentialVault::is_encrypted(&STANDARD.encode(b"tiny")));
        // Documented false positive: long base64 plaintext looks encrypted.
        assert!(CredentialVault::is_encrypted(&STANDARD.encode(
            b"a perfectly ordinary sentence over thirty-two bytes"
        )));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(CredentialVault::new("").is_err());
    }
}
