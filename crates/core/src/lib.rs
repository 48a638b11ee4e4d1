//! huffarc-core: Huffman and Shannon-Fano file compression with a multi-file
//! archive container
//!
//! This library provides the core components for a file archiver that:
//! - Derives a per-file prefix code from byte frequencies (Huffman or
//!   Shannon-Fano)
//! - Bit-packs each encoded file into an entry of a seekable archive
//! - Lists, fully decompresses or extracts single entries from an archive
//! - Optionally wraps the finished archive in password-based encryption
//!
//! # Architecture
//!
//! Leaves first:
//! - `bitio`: Low-level bit reading/writing
//! - `codebook`: Frequency tables and prefix-code tables
//! - `huffman`: Tree-based codec, rebuilt from stored frequencies
//! - `shannon_fano`: Bisection codec, stored as a full code table
//! - `archive`: Archive container format
//! - `crypto`: Encryption envelope around a finished archive
//! - `control`: Cooperative pause/resume/cancel and partial-output cleanup
//! - `operation`: Compress, decompress, extract, list, encrypt, compare
//! - `metrics`: Operation results and formatting
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Bounded reads**: Every length field is checked against the data present
//! - **Deterministic**: Identical input yields an identical archive
//! - **Clean abort**: Cancellation and errors leave no partial output behind

pub mod archive;
pub mod bitio;
pub mod codebook;
pub mod control;
pub mod crypto;
pub mod error;
pub mod huffman;
pub mod metrics;
pub mod operation;
pub mod shannon_fano;

// Re-export commonly used types
pub use archive::Algorithm;
pub use control::OperationControl;
pub use error::{Error, Result};
pub use metrics::{AlgorithmComparison, CompressionInfo};
pub use operation::{
    compare_algorithms, compress_files, compress_folder, decompress_all, decrypt_archive,
    encrypt_archive, extract_one, list_entries, Options,
};
