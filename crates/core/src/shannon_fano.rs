//! Shannon-Fano codec.
//!
//! Codes come from recursive bisection of the symbols sorted by descending
//! frequency. Unlike Huffman the assignment is not re-derived at decode time:
//! the full [`CodeTable`] is the persisted artifact, and decoding is a
//! growing-buffer prefix match against its inverse.

use std::collections::HashMap;

use crate::bitio::BitReader;
use crate::codebook::{check_padding, Code, CodeTable, FrequencyTable};
use crate::error::{CodecError, Result};

/// Build the code table for `data`.
///
/// Symbols are sorted by descending frequency (ties by ascending byte value)
/// and split recursively at the first index where the running sum reaches
/// half the segment total. The left part gets `0`, the right part `1`.
/// A single distinct byte gets the code `0`; empty input yields an empty
/// table.
pub fn build_code_table(data: &[u8]) -> CodeTable {
    let frequencies = FrequencyTable::from_bytes(data);
    let mut symbols: Vec<(u8, u64)> = frequencies
        .iter()
        .map(|(symbol, count)| (symbol, count as u64))
        .collect();
    symbols.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut codes = vec![Code::new(); symbols.len()];
    if symbols.len() == 1 {
        codes[0].push(false);
    } else {
        bisect(&symbols, &mut codes);
    }

    symbols
        .iter()
        .map(|&(symbol, _)| symbol)
        .zip(codes)
        .collect()
}

/// Assign one more bit to every symbol in the segment, then recurse.
fn bisect(symbols: &[(u8, u64)], codes: &mut [Code]) {
    if symbols.len() <= 1 {
        return;
    }

    let total: u64 = symbols.iter().map(|&(_, count)| count).sum();
    let half = total / 2;
    let mut running = 0;
    let mut split = 0;
    for (i, &(_, count)) in symbols.iter().enumerate() {
        running += count;
        if running >= half {
            split = i;
            break;
        }
    }

    // Descending order keeps the right partition non-empty.
    let split = split.min(symbols.len() - 2) + 1;
    let (left_codes, right_codes) = codes.split_at_mut(split);
    left_codes.iter_mut().for_each(|code| code.push(false));
    right_codes.iter_mut().for_each(|code| code.push(true));

    bisect(&symbols[..split], left_codes);
    bisect(&symbols[split..], right_codes);
}

/// Encode `data` with `table`, packed MSB-first.
pub fn encode(data: &[u8], table: &CodeTable) -> Result<Vec<u8>> {
    crate::codebook::encode(data, table)
}

/// Decode exactly `expected_count` bytes from `payload` using `table`.
///
/// Bits accumulate in a buffer until it equals a known code; the mapped byte
/// is emitted and the buffer reset.
///
/// # Errors
/// - `CodecError::UnknownCode` if the buffer outgrows the longest code
/// - `CodecError::LengthMismatch` if the payload ends early
/// - `CodecError::TrailingData` if more than padding follows the last symbol
pub fn decode(payload: &[u8], table: &CodeTable, expected_count: usize) -> Result<Vec<u8>> {
    let inverse: HashMap<&[bool], u8> = table
        .iter()
        .map(|(symbol, code)| (code.bits(), symbol))
        .collect();
    let max_len = table.max_code_len();

    // every symbol costs at least one bit
    let mut output = Vec::with_capacity(expected_count.min(payload.len().saturating_mul(8)));
    let mut reader = BitReader::new(payload);
    let mut buffer: Vec<bool> = Vec::with_capacity(max_len);

    while output.len() < expected_count {
        let Ok(bit) = reader.read_bit() else {
            break;
        };
        buffer.push(bit);

        if let Some(&symbol) = inverse.get(buffer.as_slice()) {
            output.push(symbol);
            buffer.clear();
        } else if buffer.len() >= max_len {
            return Err(CodecError::UnknownCode {
                position: reader.position() - 1,
            }
            .into());
        }
    }

    if output.len() != expected_count {
        return Err(CodecError::LengthMismatch {
            expected: expected_count,
            actual: output.len(),
        }
        .into());
    }
    check_padding(&reader)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn round_trip(data: &[u8]) -> Vec<u8> {
        let table = build_code_table(data);
        let payload = encode(data, &table).unwrap();
        decode(&payload, &table, data.len()).unwrap()
    }

    #[test]
    fn test_round_trip_text() {
        let data = b"she sells sea shells by the sea shore";
        assert_eq!(round_trip(data), data);
    }

    #[test]
    fn test_round_trip_all_symbols() {
        let data: Vec<u8> = (0..=255).rev().collect();
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for len in [1usize, 2, 5, 333, 5000] {
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            assert_eq!(round_trip(&data), data, "len {len}");
        }
    }

    #[test]
    fn test_skewed_frequencies() {
        // Steeply decreasing counts make the longest codes.
        let mut data = Vec::new();
        for (i, symbol) in (b'a'..=b'p').enumerate() {
            data.extend(std::iter::repeat(symbol).take(1 << (15 - i)));
        }
        let table = build_code_table(&data);
        assert!(table.is_prefix_free());
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn test_degenerate_single_symbol() {
        let data = vec![0u8; 64];
        let table = build_code_table(&data);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().to_string(), "0");
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn test_known_codes() {
        // a:4 b:2 c:1 d:1, total 8, half 4 -> split after 'a'
        let table = build_code_table(b"aaaabbcd");
        assert_eq!(table.get(b'a').unwrap().to_string(), "0");
        assert_eq!(table.get(b'b').unwrap().to_string(), "10");
        assert_eq!(table.get(b'c').unwrap().to_string(), "110");
        assert_eq!(table.get(b'd').unwrap().to_string(), "111");
    }

    #[test]
    fn test_empty_input() {
        let table = build_code_table(b"");
        assert!(table.is_empty());
        assert!(decode(&[], &table, 0).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload() {
        let data = b"aaaabbcd";
        let table = build_code_table(data);
        let result = decode(&[], &table, data.len());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::LengthMismatch {
                expected: 8,
                actual: 0
            }))
        ));
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let table: CodeTable = [(b'a', "0".parse().unwrap())].into_iter().collect();
        let result = decode(&[0], &table, i32::MAX as usize);
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::LengthMismatch {
                expected,
                actual: 8
            })) if expected == i32::MAX as usize
        ));
    }

    #[test]
    fn test_unknown_code() {
        let table: CodeTable = [(b'a', "00".parse().unwrap()), (b'b', "01".parse().unwrap())]
            .into_iter()
            .collect();
        let result = decode(&[0b1100_0000], &table, 2);
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::UnknownCode { position: 1 }))
        ));
    }
}
