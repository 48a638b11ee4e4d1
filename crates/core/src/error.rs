//! Error types for the huffarc core.
//!
//! All operations return structured errors rather than panicking. The
//! variants fall into four families that callers treat differently:
//! - Cancellation: a cooperative abort requested by the caller, not a fault
//! - Corruption: bit I/O, codec and archive failures (truncated reads,
//!   impossible lengths, decode mismatches)
//! - Wrong password or corrupt ciphertext: anything the encryption layer rejects
//! - I/O: missing files, permission problems, surfaced as-is

use thiserror::Error;

/// Top-level error type for all operations in the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., reading past end of buffer)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Encoded stream does not match its codebook
    #[error("corrupt stream: {0}")]
    Codec(#[from] CodecError),

    /// Archive container is structurally invalid
    #[error("corrupt archive: {0}")]
    Archive(#[from] ArchiveError),

    /// Encryption layer rejected the input
    #[error("wrong password or corrupt encrypted archive: {0}")]
    Crypto(#[from] CryptoError),

    /// The caller canceled the operation
    #[error("operation canceled")]
    Canceled,

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller-supplied arguments
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for a cooperative cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    /// True for corrupt-stream and corrupt-archive failures.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::BitIo(_) | Error::Codec(_) | Error::Archive(_))
    }

    /// True when the encryption layer rejected the password or the ciphertext.
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Attempted to read past the end of the buffer
    #[error("unexpected end of bit stream at bit {position}")]
    UnexpectedEof { position: usize },
}

/// Codec errors: the payload cannot be reproduced from its codebook.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input byte has no code in the table
    #[error("byte {0:#04x} has no code in the table")]
    MissingSymbol(u8),

    /// Tree traversal hit a missing child
    #[error("invalid prefix-tree traversal at bit {position}")]
    InvalidTraversal { position: usize },

    /// Accumulated bits exceed every known code
    #[error("no code matches the bits ending at bit {position}")]
    UnknownCode { position: usize },

    /// Bitstream ran out before the declared size was reached
    #[error("decoded length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Bits left over after the last symbol are not padding
    #[error("{remaining} trailing bits after the last symbol are not zero padding")]
    TrailingData { remaining: usize },

    /// A codebook was required but the input has no symbols
    #[error("cannot build a codebook from an empty frequency table")]
    EmptyFrequencyTable,
}

/// Archive container errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A length or count field holds an impossible value
    #[error("invalid {field}: {value}")]
    InvalidLength { field: &'static str, value: i64 },

    /// A read would run past the end of the archive
    #[error("truncated archive: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Entry name is not valid UTF-8 or cannot name a file
    #[error("entry name is not valid UTF-8 or not a usable file name")]
    InvalidName,

    /// Shannon-Fano code string is malformed
    #[error("invalid code {code:?} for byte {symbol:#04x}")]
    InvalidCode { symbol: u8, code: String },

    /// Shannon-Fano code table is ambiguous
    #[error("code table is not prefix-free")]
    AmbiguousCodeTable,

    /// Symbol appears twice in a table
    #[error("duplicate table record for byte {0:#04x}")]
    DuplicateSymbol(u8),

    /// Huffman frequencies disagree with the declared size
    #[error("frequency total {actual} does not match original size {expected}")]
    FrequencyMismatch { expected: u64, actual: u64 },

    /// Decoded content fails the integrity trailer
    #[error("checksum mismatch for {name:?}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// Bytes after the last entry that are not a valid trailer
    #[error("{0} unexpected bytes after the last entry")]
    TrailingBytes(u64),

    /// Writer was given a different number of entries than announced
    #[error("entry count mismatch: header says {expected}, wrote {actual}")]
    EntryCountMismatch { expected: usize, actual: usize },

    /// A file too large for the 32-bit size fields
    #[error("{name:?} is {size} bytes, larger than the 2 GiB entry limit")]
    EntryTooLarge { name: String, size: u64 },
}

/// Encryption wrapper errors. All of them mean "wrong password or corrupt".
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Ciphertext is too short or not block-aligned
    #[error("encrypted data is truncated ({len} bytes)")]
    Truncated { len: usize },

    /// PKCS#7 padding check failed after decryption
    #[error("padding check failed")]
    BadPadding,

    /// Decryption succeeded but the plaintext is not an archive
    #[error("decrypted data is not a valid archive")]
    NotAnArchive,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
