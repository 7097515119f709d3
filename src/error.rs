use thiserror::Error;

/// Every failure the library can report.
///
/// Messages never carry leaf plaintext or key material. Cipher failures
/// collapse to one message per layer so corruption and tampering look the same.
#[derive(Error, Debug)]
pub enum KeycloakError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Random source failure")]
    RandomSource,

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Authentication failed")]
    Authentication,

    #[error("Cannot open envelope: wrong private key or corrupted ciphertext")]
    EnvelopeOpen,

    #[error("age error: {0}")]
    Age(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid subtree: {0}")]
    InvalidSubtree(String),

    #[error("Cannot find MAC")]
    MissingMac,

    #[error("Invalid MAC")]
    InvalidMac,

    #[error("Integrity check failed: MAC does not match")]
    IntegrityMismatch,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Invalid identity")]
    InvalidIdentity,

    #[error("Invalid key format")]
    InvalidKeyFormat,

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KeycloakError>;
