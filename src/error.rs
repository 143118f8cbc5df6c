//! Error taxonomy for the ZIP engine.

use std::io;

/// Result type for ZIP operations.
pub type Result<T> = std::result::Result<T, ZipError>;

/// Error categories produced by the container codec, crypto filters,
/// compression filters, and write pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ZipError {
    /// Underlying I/O failure (read/write/seek).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Signature mismatch, truncated record, length disagreement, or a
    /// missing ZIP64 extra field where a 32-bit sentinel demanded one.
    #[error("invalid ZIP format: {0}")]
    InvalidFormat(String),

    /// Lookup of an entry by name failed.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Insertion of an entry whose name already exists, without `replace`.
    #[error("entry already exists: {0}")]
    EntryAlreadyExists(String),

    /// PKWARE check-byte mismatch, AES password-verification mismatch, or
    /// AES HMAC mismatch.
    #[error("zip authentication failed: {0}")]
    ZipAuthentication(String),

    /// Decoded plaintext CRC-32 disagrees with the stored CRC (skipped
    /// under AE-2 WinZip AES).
    #[error("CRC32 mismatch: {0}")]
    Crc32Mismatch(String),

    /// A requested feature isn't available in this build/platform
    /// (e.g. Strong Encryption, 32-bit hosts attempting PKWARE).
    #[error("feature unsupported: {0}")]
    FeatureUnsupported(String),

    /// Malformed caller input (bad password length, bad compression
    /// level, bad alignment value).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
