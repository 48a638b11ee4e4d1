//! Statistics and prefix codes shared by both codecs.
//!
//! - [`FrequencyTable`]: per-file histogram of byte values
//! - [`Code`]: one variable-length codeword
//! - [`CodeTable`]: byte value to codeword, prefix-free by construction
//!
//! Encoding is identical for both algorithms (concatenate each byte's code in
//! input order), so it lives here; decoding differs and lives in each codec.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

/// Occurrence count of every byte value within one input.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; 256],
}

impl FrequencyTable {
    /// Count occurrences of each byte in `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut counts = [0u32; 256];
        for &byte in data {
            counts[byte as usize] += 1;
        }
        Self { counts }
    }

    /// Build a table from `(symbol, count)` pairs, e.g. when reading an archive.
    ///
    /// Later pairs for the same symbol replace earlier ones.
    pub fn from_counts(pairs: impl IntoIterator<Item = (u8, u32)>) -> Self {
        let mut counts = [0u32; 256];
        for (symbol, count) in pairs {
            counts[symbol as usize] = count;
        }
        Self { counts }
    }

    pub fn get(&self, symbol: u8) -> u32 {
        self.counts[symbol as usize]
    }

    /// Symbols with a non-zero count, in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }

    /// Number of distinct byte values present.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 0).count()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&count| count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct() == 0
    }
}

/// A single codeword, stored as its bits in transmission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Code {
    bits: Vec<bool>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// This code followed by one more bit.
    pub fn child(&self, bit: bool) -> Self {
        let mut bits = Vec::with_capacity(self.bits.len() + 1);
        bits.extend_from_slice(&self.bits);
        bits.push(bit);
        Self { bits }
    }

    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn starts_with(&self, prefix: &Code) -> bool {
        self.bits.starts_with(&prefix.bits)
    }
}

impl From<Vec<bool>> for Code {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

/// Renders as the ASCII string of `0` and `1` characters stored in archives.
impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Error returned when a code string holds anything but `0` and `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCodeError;

impl fmt::Display for ParseCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("code strings may only contain '0' and '1'")
    }
}

impl std::error::Error for ParseCodeError {}

impl FromStr for Code {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(ParseCodeError),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Code::from)
    }
}

/// Mapping from byte value to its prefix code.
///
/// Iteration is in ascending byte order, so serialized tables are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeTable {
    codes: BTreeMap<u8, Code>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: u8, code: Code) -> Option<Code> {
        self.codes.insert(symbol, code)
    }

    pub fn get(&self, symbol: u8) -> Option<&Code> {
        self.codes.get(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Code)> + '_ {
        self.codes.iter().map(|(&symbol, code)| (symbol, code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Length of the longest code, 0 for an empty table.
    pub fn max_code_len(&self) -> usize {
        self.codes.values().map(Code::len).max().unwrap_or(0)
    }

    /// True when no code is a prefix of another and none is empty.
    ///
    /// In lexicographic order a code that prefixes any other code also
    /// prefixes its immediate successor, so adjacent pairs suffice.
    pub fn is_prefix_free(&self) -> bool {
        let mut sorted: Vec<&Code> = self.codes.values().collect();
        if sorted.iter().any(|code| code.is_empty()) {
            return false;
        }
        sorted.sort();
        sorted.windows(2).all(|pair| !pair[1].starts_with(pair[0]))
    }

    /// Total number of bits needed to encode data with these statistics.
    pub fn encoded_bits(&self, frequencies: &FrequencyTable) -> u64 {
        frequencies
            .iter()
            .map(|(symbol, count)| {
                let len = self.get(symbol).map_or(0, Code::len);
                len as u64 * count as u64
            })
            .sum()
    }
}

impl FromIterator<(u8, Code)> for CodeTable {
    fn from_iter<I: IntoIterator<Item = (u8, Code)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

/// Encode `data` by concatenating each byte's code, packed MSB-first.
///
/// # Errors
/// `CodecError::MissingSymbol` if a byte has no code in `table`.
pub fn encode(data: &[u8], table: &CodeTable) -> Result<Vec<u8>> {
    let mut writer = BitWriter::new();
    for &byte in data {
        let code = table.get(byte).ok_or(CodecError::MissingSymbol(byte))?;
        writer.write_code(code);
    }
    Ok(writer.finish())
}

/// Verify that what is left after the last decoded symbol is only padding.
///
/// A well-formed payload holds fewer than 8 leftover bits, all zero.
pub(crate) fn check_padding(reader: &BitReader<'_>) -> Result<()> {
    let remaining = reader.bits_remaining();
    if remaining >= 8 || !reader.rest_is_zero() {
        return Err(CodecError::TrailingData { remaining }.into());
    }
    Ok(())
}
