//! Archive container: one or many compressed file entries in a single file.
//!
//! # Archive Format
//!
//! All integers are little-endian; every length precedes its payload.
//!
//! ```text
//! +----------------------+
//! | entry_count (4)      |  i32
//! +----------------------+
//! | Entry 0              |
//! | ...                  |
//! | Entry N-1            |
//! +----------------------+
//! | crc32 (4) x N        |  optional integrity trailer,
//! | entry_count (4)      |  u32
//! | magic (4)            |  "HACK"
//! +----------------------+
//!
//! Entry:
//! +----------------------+
//! | name_len (4)         |  i32, > 0
//! | name                 |  UTF-8, name_len bytes
//! | original_size (4)    |  i32
//! | table_size (4)       |  i32, 0..=256
//! | table records        |  table_size records
//! | payload_len (4)      |  i32
//! | payload              |  packed code bits
//! +----------------------+
//!
//! Huffman record:      symbol (1) | frequency (4, i32)
//! Shannon-Fano record: symbol (1) | code_len (7-bit varint) | code ("0"/"1" ASCII)
//! ```
//!
//! The algorithm is not recorded in the file; callers know it from the file
//! extension (see [`Algorithm::detect`]).
//!
//! # Integrity Trailer
//!
//! The CRC32 of each entry's original bytes is appended after the last entry.
//! Parsers that stop after `entry_count` entries never see it. This reader
//! verifies decoded entries against it when present, accepts archives
//! without it, and rejects any other bytes after the last entry.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::codebook::{Code, CodeTable, FrequencyTable};
use crate::error::{ArchiveError, CodecError, Error, Result};
use crate::{huffman, shannon_fano};

/// Magic number closing the integrity trailer
pub const TRAILER_MAGIC: [u8; 4] = *b"HACK";

/// Size of the fixed part of the trailer (entry_count + magic)
const TRAILER_FIXED_SIZE: u64 = 8;

/// At most one record per byte value
const MAX_TABLE_SIZE: i32 = 256;

/// Shannon-Fano codes on 256 symbols never exceed 255 bits
const MAX_CODE_LEN: usize = 256;

/// Suffix appended to the extension of encrypted archives
pub const ENCRYPTED_SUFFIX: &str = ".secure";

/// Statistical method used for every entry of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Huffman,
    ShannonFano,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Huffman, Algorithm::ShannonFano];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Huffman => "huffman",
            Algorithm::ShannonFano => "shannon-fano",
        }
    }

    /// Archive file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Huffman => "huff",
            Algorithm::ShannonFano => "sfan",
        }
    }

    /// Conventional archive file name for `stem`.
    pub fn archive_file_name(self, stem: &str, encrypted: bool) -> String {
        let suffix = if encrypted { ENCRYPTED_SUFFIX } else { "" };
        format!("{stem}.{}{suffix}", self.extension())
    }

    /// Recognize `name.huff`, `name.sfan` and their `.secure` variants.
    ///
    /// Returns the algorithm and whether the file is encrypted.
    pub fn detect(path: &Path) -> Option<(Algorithm, bool)> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        let (name, encrypted) = match name.strip_suffix(ENCRYPTED_SUFFIX) {
            Some(inner) => (inner.to_string(), true),
            None => (name, false),
        };
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| {
                name.strip_suffix(algorithm.extension())
                    .is_some_and(|stem| stem.ends_with('.'))
            })
            .map(|algorithm| (algorithm, encrypted))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "huffman" | "huff" => Ok(Algorithm::Huffman),
            "shannon-fano" | "shannonfano" | "shannon_fano" | "sf" | "sfan" => {
                Ok(Algorithm::ShannonFano)
            }
            other => Err(Error::Config(format!("unknown algorithm: {other}"))),
        }
    }
}

/// Data needed to rebuild an entry's decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codebook {
    /// Huffman: the tree is rebuilt from the frequencies
    Frequencies(FrequencyTable),
    /// Shannon-Fano: the table itself is the decodable artifact
    Codes(CodeTable),
}

impl Codebook {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Codebook::Frequencies(_) => Algorithm::Huffman,
            Codebook::Codes(_) => Algorithm::ShannonFano,
        }
    }

    /// Number of table records.
    pub fn len(&self) -> usize {
        match self {
            Codebook::Frequencies(frequencies) => frequencies.distinct(),
            Codebook::Codes(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn empty(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Huffman => Codebook::Frequencies(FrequencyTable::from_bytes(&[])),
            Algorithm::ShannonFano => Codebook::Codes(CodeTable::new()),
        }
    }
}

/// Name and size of an entry, available without touching its table or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    pub original_size: u32,
}

/// One compressed file.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Bare file name or path relative to a compressed folder, `/`-separated
    pub name: String,

    /// Uncompressed length in bytes
    pub original_size: u32,

    /// Codebook reconstruction data
    pub codebook: Codebook,

    /// Packed code bits
    pub payload: Vec<u8>,

    /// CRC32 of the original bytes, when known
    pub checksum: Option<u32>,
}

impl ArchiveEntry {
    /// Compress `data` into a new entry named `name`.
    ///
    /// # Errors
    /// - `ArchiveError::EntryTooLarge` if `data` does not fit the i32 size field
    /// - `Error::Config` if `name` is empty
    pub fn compress(name: impl Into<String>, data: &[u8], algorithm: Algorithm) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("entry name must not be empty".to_string()));
        }
        let original_size = i32::try_from(data.len()).map_err(|_| ArchiveError::EntryTooLarge {
            name: name.clone(),
            size: data.len() as u64,
        })? as u32;

        let (codebook, payload) = if data.is_empty() {
            (Codebook::empty(algorithm), Vec::new())
        } else {
            match algorithm {
                Algorithm::Huffman => {
                    let (frequencies, table) = huffman::build_codebook(data)?;
                    let payload = huffman::encode(data, &table)?;
                    (Codebook::Frequencies(frequencies), payload)
                }
                Algorithm::ShannonFano => {
                    let table = shannon_fano::build_code_table(data);
                    let payload = shannon_fano::encode(data, &table)?;
                    (Codebook::Codes(table), payload)
                }
            }
        };

        Ok(Self {
            name,
            original_size,
            codebook,
            payload,
            checksum: Some(crc32fast::hash(data)),
        })
    }

    /// Decode the payload and verify it against the stored checksum.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let expected = self.original_size as usize;
        let data = match &self.codebook {
            Codebook::Frequencies(frequencies) if frequencies.is_empty() && expected == 0 => {
                if !self.payload.is_empty() {
                    return Err(CodecError::TrailingData {
                        remaining: self.payload.len() * 8,
                    }
                    .into());
                }
                Vec::new()
            }
            Codebook::Frequencies(frequencies) => {
                let tree = huffman::build_tree(frequencies)?;
                huffman::decode(&self.payload, &tree, expected)?
            }
            Codebook::Codes(codes) => shannon_fano::decode(&self.payload, codes, expected)?,
        };

        if let Some(expected) = self.checksum {
            let actual = crc32fast::hash(&data);
            if actual != expected {
                return Err(ArchiveError::ChecksumMismatch {
                    name: self.name.clone(),
                    expected,
                    actual,
                }
                .into());
            }
        }
        Ok(data)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.codebook.algorithm()
    }

    /// File name with any directory components removed.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Last component of a stored name, splitting on both `/` and `\`.
pub fn base_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name)
}

/// Case-insensitive comparison of the base names of `entry_name` and `target`.
pub fn names_match(entry_name: &str, target: &str) -> bool {
    base_name(entry_name).to_lowercase() == base_name(target).to_lowercase()
}

fn to_i32(value: usize, field: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        ArchiveError::InvalidLength {
            field,
            value: value as i64,
        }
        .into()
    })
}

/// Streams entries into an archive.
///
/// The entry count is written up front, so the caller must announce it.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    algorithm: Algorithm,
    expected: usize,
    checksums: Vec<Option<u32>>,
}

impl<W: Write> ArchiveWriter<W> {
    /// Write the archive header for `entry_count` entries.
    pub fn new(inner: W, algorithm: Algorithm, entry_count: usize) -> Result<Self> {
        let mut writer = Self {
            inner,
            algorithm,
            expected: entry_count,
            checksums: Vec::with_capacity(entry_count),
        };
        let count = to_i32(entry_count, "entry count")?;
        writer.put(&count.to_le_bytes())?;
        Ok(writer)
    }

    /// Append one entry.
    ///
    /// # Errors
    /// `Error::Config` if the entry was compressed with another algorithm or
    /// more entries are written than announced.
    pub fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<()> {
        if entry.algorithm() != self.algorithm {
            return Err(Error::Config(format!(
                "cannot store a {} entry in a {} archive",
                entry.algorithm(),
                self.algorithm
            )));
        }
        if self.checksums.len() == self.expected {
            return Err(ArchiveError::EntryCountMismatch {
                expected: self.expected,
                actual: self.expected + 1,
            }
            .into());
        }

        let name = entry.name.as_bytes();
        self.put(&to_i32(name.len(), "name length")?.to_le_bytes())?;
        self.put(name)?;
        self.put(&to_i32(entry.original_size as usize, "original size")?.to_le_bytes())?;
        self.put(&to_i32(entry.codebook.len(), "table size")?.to_le_bytes())?;

        match &entry.codebook {
            Codebook::Frequencies(frequencies) => {
                for (symbol, count) in frequencies.iter() {
                    self.put(&[symbol])?;
                    self.put(&to_i32(count as usize, "frequency")?.to_le_bytes())?;
                }
            }
            Codebook::Codes(codes) => {
                for (symbol, code) in codes.iter() {
                    let text = code.to_string();
                    self.put(&[symbol])?;
                    self.put(&encode_7bit(text.len()))?;
                    self.put(text.as_bytes())?;
                }
            }
        }

        self.put(&to_i32(entry.payload.len(), "payload length")?.to_le_bytes())?;
        self.put(&entry.payload)?;
        self.checksums.push(entry.checksum);

        debug!(
            "wrote entry {:?}: {} -> {} bytes",
            entry.name,
            entry.original_size,
            entry.payload.len()
        );
        Ok(())
    }

    /// Write the integrity trailer and return the underlying writer.
    ///
    /// The trailer is omitted when any entry lacks a checksum.
    pub fn finish(mut self) -> Result<W> {
        if self.checksums.len() != self.expected {
            return Err(ArchiveError::EntryCountMismatch {
                expected: self.expected,
                actual: self.checksums.len(),
            }
            .into());
        }

        let checksums: Option<Vec<u32>> = self.checksums.iter().copied().collect();
        if let Some(checksums) = checksums {
            for crc in &checksums {
                self.put(&crc.to_le_bytes())?;
            }
            self.put(&(checksums.len() as u32).to_le_bytes())?;
            self.put(&TRAILER_MAGIC)?;
        }

        self.inner.flush()?;
        Ok(self.inner)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }
}

/// Serialize `entries` in order into `inner`.
pub fn write<W: Write>(inner: W, algorithm: Algorithm, entries: &[ArchiveEntry]) -> Result<W> {
    let mut writer = ArchiveWriter::new(inner, algorithm, entries.len())?;
    for entry in entries {
        writer.write_entry(entry)?;
    }
    writer.finish()
}

/// C#-style 7-bit variable-length integer used as the code string prefix.
fn encode_7bit(mut value: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Reads entries sequentially, with bounds checks on every length field.
pub struct ArchiveReader<R: Read + Seek> {
    inner: R,
    algorithm: Algorithm,
    entry_count: usize,
    next_index: usize,
    /// Current offset from the start of the archive
    pos: u64,
    /// Offset where entry data ends (start of the trailer, if any)
    end: u64,
    checksums: Option<Vec<u32>>,
    pending_body: bool,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Read the archive header and locate the integrity trailer.
    ///
    /// # Errors
    /// `ArchiveError::Truncated` or `ArchiveError::InvalidLength` if the entry
    /// count cannot be read or is negative.
    pub fn new(mut inner: R, algorithm: Algorithm) -> Result<Self> {
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let mut reader = Self {
            inner,
            algorithm,
            entry_count: 0,
            next_index: 0,
            pos: 0,
            end,
            checksums: None,
            pending_body: false,
        };

        let count = reader.read_i32()?;
        if count < 0 {
            return Err(ArchiveError::InvalidLength {
                field: "entry count",
                value: count as i64,
            }
            .into());
        }
        reader.entry_count = count as usize;
        reader.locate_trailer()?;

        Ok(reader)
    }

    fn locate_trailer(&mut self) -> Result<()> {
        let tail = 4 * self.entry_count as u64 + TRAILER_FIXED_SIZE;
        if self.end < self.pos + tail {
            return Ok(());
        }

        self.inner
            .seek(SeekFrom::Start(self.end - TRAILER_FIXED_SIZE))?;
        let mut fixed = [0u8; TRAILER_FIXED_SIZE as usize];
        self.inner.read_exact(&mut fixed)?;
        let count = u32::from_le_bytes([fixed[0], fixed[1], fixed[2], fixed[3]]);

        if fixed[4..] == TRAILER_MAGIC && count as usize == self.entry_count {
            let start = self.end - tail;
            self.inner.seek(SeekFrom::Start(start))?;
            let mut raw = vec![0u8; 4 * self.entry_count];
            self.inner.read_exact(&mut raw)?;
            self.checksums = Some(
                raw.chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            );
            self.end = start;
        }

        self.inner.seek(SeekFrom::Start(self.pos))?;
        Ok(())
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// True when the archive carries the integrity trailer.
    pub fn has_checksums(&self) -> bool {
        self.checksums.is_some()
    }

    /// Read the next entry's name and size.
    ///
    /// Skips the previous entry's body if the caller did not consume it.
    /// Returns `None` after the last entry.
    pub fn next_header(&mut self) -> Result<Option<EntryHeader>> {
        if self.pending_body {
            self.skip_body()?;
        }
        if self.next_index == self.entry_count {
            return Ok(None);
        }

        let name_len = self.read_i32()?;
        if name_len <= 0 {
            return Err(ArchiveError::InvalidLength {
                field: "name length",
                value: name_len as i64,
            }
            .into());
        }
        let name =
            String::from_utf8(self.take(name_len as u64)?).map_err(|_| ArchiveError::InvalidName)?;

        let original_size = self.read_i32()?;
        if original_size < 0 {
            return Err(ArchiveError::InvalidLength {
                field: "original size",
                value: original_size as i64,
            }
            .into());
        }

        self.pending_body = true;
        Ok(Some(EntryHeader {
            name,
            original_size: original_size as u32,
        }))
    }

    /// Read the table and payload belonging to `header`.
    pub fn read_body(&mut self, header: EntryHeader) -> Result<ArchiveEntry> {
        if !self.pending_body {
            return Err(Error::Config("no entry header pending".to_string()));
        }

        let table_size = self.read_table_size()?;
        let codebook = match self.algorithm {
            Algorithm::Huffman => {
                let frequencies = self.read_frequencies(table_size)?;
                let total = frequencies.total();
                if total != header.original_size as u64 {
                    return Err(ArchiveError::FrequencyMismatch {
                        expected: header.original_size as u64,
                        actual: total,
                    }
                    .into());
                }
                Codebook::Frequencies(frequencies)
            }
            Algorithm::ShannonFano => Codebook::Codes(self.read_codes(table_size)?),
        };

        let payload_len = self.read_payload_len()?;
        let payload = self.take(payload_len)?;

        let checksum = self
            .checksums
            .as_ref()
            .map(|checksums| checksums[self.next_index]);
        self.next_index += 1;
        self.pending_body = false;

        Ok(ArchiveEntry {
            name: header.name,
            original_size: header.original_size,
            codebook,
            payload,
            checksum,
        })
    }

    /// Skip the table and payload of the current entry without decoding.
    pub fn skip_body(&mut self) -> Result<()> {
        if !self.pending_body {
            return Err(Error::Config("no entry header pending".to_string()));
        }

        let table_size = self.read_table_size()?;
        match self.algorithm {
            Algorithm::Huffman => self.skip(5 * table_size as u64)?,
            Algorithm::ShannonFano => {
                for _ in 0..table_size {
                    self.skip(1)?;
                    let len = self.read_code_len()?;
                    self.skip(len as u64)?;
                }
            }
        }
        let payload_len = self.read_payload_len()?;
        self.skip(payload_len)?;

        self.next_index += 1;
        self.pending_body = false;
        Ok(())
    }

    /// Read the next complete entry.
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        match self.next_header()? {
            Some(header) => self.read_body(header).map(Some),
            None => Ok(None),
        }
    }

    /// Skip any remaining entries and verify nothing but the trailer follows.
    pub fn finish(mut self) -> Result<()> {
        while self.next_header()?.is_some() {}
        if self.pos != self.end {
            return Err(ArchiveError::TrailingBytes(self.end - self.pos).into());
        }
        Ok(())
    }

    fn read_table_size(&mut self) -> Result<usize> {
        let table_size = self.read_i32()?;
        if !(0..=MAX_TABLE_SIZE).contains(&table_size) {
            return Err(ArchiveError::InvalidLength {
                field: "table size",
                value: table_size as i64,
            }
            .into());
        }
        Ok(table_size as usize)
    }

    fn read_payload_len(&mut self) -> Result<u64> {
        let payload_len = self.read_i32()?;
        if payload_len < 0 {
            return Err(ArchiveError::InvalidLength {
                field: "payload length",
                value: payload_len as i64,
            }
            .into());
        }
        Ok(payload_len as u64)
    }

    fn read_frequencies(&mut self, table_size: usize) -> Result<FrequencyTable> {
        let mut seen = [false; 256];
        let mut pairs = Vec::with_capacity(table_size);
        for _ in 0..table_size {
            let symbol = self.read_u8()?;
            let count = self.read_i32()?;
            if count <= 0 {
                return Err(ArchiveError::InvalidLength {
                    field: "frequency",
                    value: count as i64,
                }
                .into());
            }
            if std::mem::replace(&mut seen[symbol as usize], true) {
                return Err(ArchiveError::DuplicateSymbol(symbol).into());
            }
            pairs.push((symbol, count as u32));
        }
        Ok(FrequencyTable::from_counts(pairs))
    }

    fn read_codes(&mut self, table_size: usize) -> Result<CodeTable> {
        let mut table = CodeTable::new();
        for _ in 0..table_size {
            let symbol = self.read_u8()?;
            let len = self.read_code_len()?;
            let raw = self.take(len as u64)?;
            let text = String::from_utf8_lossy(&raw);
            let code: Code = text.parse().map_err(|_| ArchiveError::InvalidCode {
                symbol,
                code: text.to_string(),
            })?;
            if table.insert(symbol, code).is_some() {
                return Err(ArchiveError::DuplicateSymbol(symbol).into());
            }
        }
        if !table.is_prefix_free() {
            return Err(ArchiveError::AmbiguousCodeTable.into());
        }
        Ok(table)
    }

    /// 7-bit varint length of a code string, 1..=MAX_CODE_LEN.
    fn read_code_len(&mut self) -> Result<usize> {
        let mut value = 0usize;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(ArchiveError::InvalidLength {
                    field: "code length",
                    value: value as i64,
                }
                .into());
            }
        }
        if value == 0 || value > MAX_CODE_LEN {
            return Err(ArchiveError::InvalidLength {
                field: "code length",
                value: value as i64,
            }
            .into());
        }
        Ok(value)
    }

    fn check_available(&self, needed: u64) -> Result<()> {
        let available = self.end.saturating_sub(self.pos);
        if needed > available {
            return Err(ArchiveError::Truncated {
                offset: self.pos,
                needed,
                available,
            }
            .into());
        }
        Ok(())
    }

    fn take(&mut self, len: u64) -> Result<Vec<u8>> {
        self.check_available(len)?;
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::Archive(ArchiveError::Truncated {
                offset: self.pos,
                needed: len,
                available: 0,
            }),
            _ => Error::Io(err),
        })?;
        self.pos += len;
        Ok(buf)
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        self.check_available(len)?;
        self.pos = self.inner.seek(SeekFrom::Start(self.pos + len))?;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Enumerate entry names in archive order without decoding any payload.
///
/// Fails as a whole on any structural error; no partial listing is returned.
pub fn list<R: Read + Seek>(inner: R, algorithm: Algorithm) -> Result<Vec<String>> {
    let mut reader = ArchiveReader::new(inner, algorithm)?;
    let mut names = Vec::new();
    while let Some(header) = reader.next_header()? {
        names.push(header.name);
    }
    reader.finish()?;
    Ok(names)
}

/// Read every entry (tables and payloads, still encoded).
pub fn read_all<R: Read + Seek>(inner: R, algorithm: Algorithm) -> Result<Vec<ArchiveEntry>> {
    let mut reader = ArchiveReader::new(inner, algorithm)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry()? {
        entries.push(entry);
    }
    reader.finish()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build(algorithm: Algorithm, files: &[(&str, &[u8])]) -> Vec<u8> {
        let entries: Vec<ArchiveEntry> = files
            .iter()
            .map(|(name, data)| ArchiveEntry::compress(*name, data, algorithm).unwrap())
            .collect();
        write(Vec::new(), algorithm, &entries).unwrap()
    }

    #[test]
    fn test_write_read_round_trip() {
        for algorithm in Algorithm::ALL {
            let bytes = build(
                algorithm,
                &[("a.txt", b"hello hello hello"), ("b.bin", &[0, 1, 2, 3, 255])],
            );
            let entries = read_all(Cursor::new(bytes), algorithm).unwrap();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "a.txt");
            assert_eq!(entries[0].decompress().unwrap(), b"hello hello hello");
            assert_eq!(entries[1].decompress().unwrap(), vec![0, 1, 2, 3, 255]);
            assert!(entries[1].checksum.is_some());
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = build(Algorithm::Huffman, &[("x", b"aab")]);
        // entry_count
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        // name_len, name, original_size, table_size
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(bytes[8], b'x');
        assert_eq!(&bytes[9..13], &3i32.to_le_bytes());
        assert_eq!(&bytes[13..17], &2i32.to_le_bytes());
        // records in ascending byte order: 'a' x2, 'b' x1
        assert_eq!(bytes[17], b'a');
        assert_eq!(&bytes[18..22], &2i32.to_le_bytes());
        assert_eq!(bytes[22], b'b');
        assert_eq!(&bytes[23..27], &1i32.to_le_bytes());
        // payload_len, then one payload byte
        assert_eq!(&bytes[27..31], &1i32.to_le_bytes());
        // trailer
        assert_eq!(&bytes[bytes.len() - 4..], &TRAILER_MAGIC);
        assert_eq!(bytes.len(), 32 + 4 + 8);
    }

    #[test]
    fn test_shannon_fano_record_layout() {
        let bytes = build(Algorithm::ShannonFano, &[("x", b"aaab")]);
        // after entry_count(4) name_len(4) name(1) original_size(4) table_size(4)
        let records = &bytes[17..];
        assert_eq!(records[0], b'a');
        assert_eq!(records[1], 1); // 7-bit length
        assert_eq!(records[2], b'0');
        assert_eq!(records[3], b'b');
        assert_eq!(records[4], 1);
        assert_eq!(records[5], b'1');
    }

    #[test]
    fn test_encode_7bit() {
        assert_eq!(encode_7bit(1), vec![1]);
        assert_eq!(encode_7bit(127), vec![0x7F]);
        assert_eq!(encode_7bit(128), vec![0x80, 0x01]);
        assert_eq!(encode_7bit(255), vec![0xFF, 0x01]);
    }

    #[test]
    fn test_list_in_write_order() {
        let bytes = build(
            Algorithm::ShannonFano,
            &[("z", b"zzz"), ("a", b"aaa"), ("m/n.txt", b"mn")],
        );
        let names = list(Cursor::new(bytes), Algorithm::ShannonFano).unwrap();
        assert_eq!(names, vec!["z", "a", "m/n.txt"]);
    }

    #[test]
    fn test_list_skips_corrupt_payload() {
        let mut bytes = build(Algorithm::Huffman, &[("one", b"some data here")]);
        // Payload corruption is invisible to listing.
        let payload_byte = bytes.len() - 12 - 1;
        bytes[payload_byte] ^= 0xFF;
        assert_eq!(
            list(Cursor::new(bytes), Algorithm::Huffman).unwrap(),
            vec!["one"]
        );
    }

    #[test]
    fn test_legacy_archive_without_trailer() {
        let bytes = build(Algorithm::Huffman, &[("f", b"legacy layout")]);
        let legacy = bytes[..bytes.len() - 12].to_vec();

        let mut reader = ArchiveReader::new(Cursor::new(legacy), Algorithm::Huffman).unwrap();
        assert!(!reader.has_checksums());
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.checksum, None);
        assert_eq!(entry.decompress().unwrap(), b"legacy layout");
        reader.finish().unwrap();
    }

    #[test]
    fn test_negative_entry_count() {
        let bytes = (-1i32).to_le_bytes().to_vec();
        let err = list(Cursor::new(bytes), Algorithm::Huffman).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::InvalidLength {
                field: "entry count",
                value: -1
            })
        ));
    }

    #[test]
    fn test_negative_name_length() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(-5i32).to_le_bytes());
        let err = list(Cursor::new(bytes), Algorithm::ShannonFano).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_truncated_archive() {
        let bytes = build(Algorithm::Huffman, &[("a", b"abcdefgh"), ("b", b"12345678")]);
        for cut in [1, 13, bytes.len() / 2, bytes.len() - 4] {
            let truncated = bytes[..bytes.len() - cut].to_vec();
            let result = read_all(Cursor::new(truncated.clone()), Algorithm::Huffman);
            assert!(result.unwrap_err().is_corrupt(), "cut {cut}");
            assert!(list(Cursor::new(truncated), Algorithm::Huffman).is_err());
        }
    }

    #[test]
    fn test_huge_payload_length_is_bounded() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.push(b'a');
        bytes.extend_from_slice(&0i32.to_le_bytes()); // original_size
        bytes.extend_from_slice(&0i32.to_le_bytes()); // table_size
        bytes.extend_from_slice(&i32::MAX.to_le_bytes()); // payload_len
        let err = read_all(Cursor::new(bytes), Algorithm::Huffman).unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::Truncated { .. })));
    }

    #[test]
    fn test_forged_original_size() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.push(b'x');
        bytes.extend_from_slice(&i32::MAX.to_le_bytes()); // original_size
        bytes.extend_from_slice(&1i32.to_le_bytes()); // table_size
        bytes.extend_from_slice(&[b'a', 1, b'0']);
        bytes.extend_from_slice(&1i32.to_le_bytes()); // payload_len
        bytes.push(0);
        assert_eq!(bytes.len(), 25);

        let entries = read_all(Cursor::new(bytes), Algorithm::ShannonFano).unwrap();
        let err = entries[0].decompress().unwrap_err();
        assert!(err.is_corrupt());
        assert!(matches!(
            err,
            Error::Codec(CodecError::LengthMismatch { actual: 8, .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let mut bytes = build(Algorithm::Huffman, &[("a", b"abc")]);
        bytes.extend_from_slice(b"junk");
        let err = read_all(Cursor::new(bytes), Algorithm::Huffman).unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::TrailingBytes(_))));
    }

    #[test]
    fn test_frequency_mismatch() {
        let mut bytes = build(Algorithm::Huffman, &[("x", b"aab")]);
        // bump original_size from 3 to 4
        bytes[9..13].copy_from_slice(&4i32.to_le_bytes());
        let err = read_all(Cursor::new(bytes), Algorithm::Huffman).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::FrequencyMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_ambiguous_code_table() {
        let mut bytes = build(Algorithm::ShannonFano, &[("x", b"aaab")]);
        // make b's code "0" as well
        bytes[17 + 5] = b'0';
        let err = read_all(Cursor::new(bytes), Algorithm::ShannonFano).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::AmbiguousCodeTable)
        ));
    }

    #[test]
    fn test_checksum_detects_payload_tamper() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for algorithm in Algorithm::ALL {
            let mut bytes = build(algorithm, &[("fox", data)]);
            let last_payload_byte = bytes.len() - 12 - 1;
            bytes[last_payload_byte - 2] ^= 0b0000_0100;

            let outcome = read_all(Cursor::new(bytes), algorithm)
                .and_then(|entries| entries[0].decompress());
            assert!(outcome.unwrap_err().is_corrupt(), "{algorithm}");
        }
    }

    #[test]
    fn test_empty_entry() {
        for algorithm in Algorithm::ALL {
            let bytes = build(algorithm, &[("empty", b"")]);
            let entries = read_all(Cursor::new(bytes), algorithm).unwrap();
            assert!(entries[0].codebook.is_empty());
            assert!(entries[0].decompress().unwrap().is_empty());
        }
    }

    #[test]
    fn test_empty_archive() {
        let bytes = write(Vec::new(), Algorithm::Huffman, &[]).unwrap();
        assert!(list(Cursor::new(bytes), Algorithm::Huffman)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_writer_rejects_mixed_algorithms() {
        let entry = ArchiveEntry::compress("a", b"abc", Algorithm::ShannonFano).unwrap();
        let mut writer = ArchiveWriter::new(Vec::new(), Algorithm::Huffman, 1).unwrap();
        assert!(writer.write_entry(&entry).is_err());
    }

    #[test]
    fn test_writer_count_mismatch() {
        let writer = ArchiveWriter::new(Vec::new(), Algorithm::Huffman, 2).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(Error::Archive(ArchiveError::EntryCountMismatch {
                expected: 2,
                actual: 0
            }))
        ));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("dir/sub/file.txt"), "file.txt");
        assert_eq!(base_name(r"dir\file.txt"), "file.txt");
        assert_eq!(base_name("plain"), "plain");
        assert!(names_match("docs/README.md", "readme.MD"));
        assert!(!names_match("docs/README.md", "README.txt"));
    }

    #[test]
    fn test_algorithm_detect() {
        assert_eq!(
            Algorithm::detect(Path::new("out/a.huff")),
            Some((Algorithm::Huffman, false))
        );
        assert_eq!(
            Algorithm::detect(Path::new("a.SFAN.secure")),
            Some((Algorithm::ShannonFano, true))
        );
        assert_eq!(Algorithm::detect(Path::new("a.zip")), None);
        assert_eq!(Algorithm::detect(Path::new("huff")), None);
        assert_eq!(
            Algorithm::ShannonFano.archive_file_name("backup", true),
            "backup.sfan.secure"
        );
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("Huffman".parse::<Algorithm>().unwrap(), Algorithm::Huffman);
        assert_eq!("sf".parse::<Algorithm>().unwrap(), Algorithm::ShannonFano);
        assert!("lzw".parse::<Algorithm>().is_err());
    }
}
