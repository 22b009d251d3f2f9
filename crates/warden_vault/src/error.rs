//! Vault error types.

/// Specific vault error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum VaultErrorKind {
    /// Ciphertext failed authentication (tampered or wrong key).
    /// Always surfaced loudly, never masked as empty output.
    #[display("Credential decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Stored value is not a well-formed encrypted blob
    #[display("Invalid encrypted value: {}", _0)]
    InvalidFormat(String),

    /// Key derivation failed
    #[display("Key derivation failed: {}", _0)]
    KeyDerivation(String),

    /// The vault secret is missing from the environment
    #[display("Vault secret unavailable: {}", _0)]
    MissingSecret(String),
}

/// Vault error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Vault Error: {} at line {} in {}", kind, line, file)]
pub struct VaultError {
    /// The specific error kind
    pub kind: VaultErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl VaultError {
    /// Create a new vault error with location tracking.
    #[track_caller]
    pub fn new(kind: VaultErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VaultErrorKind {
        &self.kind
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
