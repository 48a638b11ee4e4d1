//! Huffman codec.
//!
//! Codes come from a binary prefix tree built bottom-up from a
//! [`FrequencyTable`]. Only the frequency table is ever persisted; the decoder
//! rebuilds the identical tree from it, so the merge rule must be fully
//! deterministic.
//!
//! # Merge Rule
//!
//! A min-heap is keyed by `(frequency, creation order)`. Leaves are created in
//! ascending byte order, merged nodes get the next order number as they are
//! created. The two smallest entries are popped; the first becomes the left
//! child (`0`), the second the right child (`1`).
//!
//! # Degenerate Input
//!
//! A single distinct byte yields a one-leaf tree. Its code is the one bit `0`
//! and each `0` bit in the payload decodes to that byte.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::bitio::BitReader;
use crate::codebook::{check_padding, Code, CodeTable, FrequencyTable};
use crate::error::{CodecError, Result};

/// Binary prefix tree. Leaves own one byte value; internal nodes own exactly
/// two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixTree {
    Leaf {
        symbol: u8,
        frequency: u64,
    },
    Internal {
        frequency: u64,
        left: Box<PrefixTree>,
        right: Box<PrefixTree>,
    },
}

impl PrefixTree {
    pub fn frequency(&self) -> u64 {
        match self {
            PrefixTree::Leaf { frequency, .. } | PrefixTree::Internal { frequency, .. } => {
                *frequency
            }
        }
    }

    /// Child reached by following `bit`, or `None` on a leaf.
    fn child(&self, bit: bool) -> Option<&PrefixTree> {
        match self {
            PrefixTree::Leaf { .. } => None,
            PrefixTree::Internal { left, right, .. } => Some(if bit { right } else { left }),
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            PrefixTree::Leaf { .. } => 0,
            PrefixTree::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Heap entry ordered by frequency, then creation order.
struct HeapNode {
    frequency: u64,
    order: usize,
    tree: PrefixTree,
}

impl HeapNode {
    fn key(&self) -> (u64, usize) {
        (self.frequency, self.order)
    }
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Count occurrences of each byte in `data`.
pub fn build_frequency_table(data: &[u8]) -> FrequencyTable {
    FrequencyTable::from_bytes(data)
}

/// Build the prefix tree for `frequencies`.
///
/// # Errors
/// `CodecError::EmptyFrequencyTable` if no symbol has a non-zero count.
pub fn build_tree(frequencies: &FrequencyTable) -> Result<PrefixTree> {
    let mut heap: BinaryHeap<Reverse<HeapNode>> = frequencies
        .iter()
        .enumerate()
        .map(|(order, (symbol, count))| {
            let frequency = count as u64;
            Reverse(HeapNode {
                frequency,
                order,
                tree: PrefixTree::Leaf { symbol, frequency },
            })
        })
        .collect();
    let mut next_order = heap.len();

    loop {
        let Reverse(first) = heap.pop().ok_or(CodecError::EmptyFrequencyTable)?;
        let Some(Reverse(second)) = heap.pop() else {
            return Ok(first.tree);
        };

        let frequency = first.frequency + second.frequency;
        heap.push(Reverse(HeapNode {
            frequency,
            order: next_order,
            tree: PrefixTree::Internal {
                frequency,
                left: Box::new(first.tree),
                right: Box::new(second.tree),
            },
        }));
        next_order += 1;
    }
}

/// Assign codes by depth-first traversal: `0` on left descent, `1` on right.
pub fn build_code_table(tree: &PrefixTree) -> CodeTable {
    let mut table = CodeTable::new();
    match tree {
        PrefixTree::Leaf { symbol, .. } => {
            table.insert(*symbol, Code::from(vec![false]));
        }
        PrefixTree::Internal { .. } => assign_codes(tree, Code::new(), &mut table),
    }
    table
}

fn assign_codes(node: &PrefixTree, prefix: Code, table: &mut CodeTable) {
    match node {
        PrefixTree::Leaf { symbol, .. } => {
            table.insert(*symbol, prefix);
        }
        PrefixTree::Internal { left, right, .. } => {
            assign_codes(left, prefix.child(false), table);
            assign_codes(right, prefix.child(true), table);
        }
    }
}

/// Build the code table for `data` in one step.
///
/// Returns the frequency table (the persisted artifact) alongside the codes.
pub fn build_codebook(data: &[u8]) -> Result<(FrequencyTable, CodeTable)> {
    let frequencies = build_frequency_table(data);
    let tree = build_tree(&frequencies)?;
    Ok((frequencies, build_code_table(&tree)))
}

/// Encode `data` with `table`, packed MSB-first.
pub fn encode(data: &[u8], table: &CodeTable) -> Result<Vec<u8>> {
    crate::codebook::encode(data, table)
}

/// Decode exactly `expected_count` bytes by walking `tree` bit by bit.
///
/// # Errors
/// - `CodecError::InvalidTraversal` if a bit leads nowhere (only possible on
///   a one-leaf tree, where the only valid bit is `0`)
/// - `CodecError::LengthMismatch` if the payload ends early
/// - `CodecError::TrailingData` if more than padding follows the last symbol
pub fn decode(payload: &[u8], tree: &PrefixTree, expected_count: usize) -> Result<Vec<u8>> {
    // every symbol costs at least one bit
    let mut output = Vec::with_capacity(expected_count.min(payload.len().saturating_mul(8)));
    let mut reader = BitReader::new(payload);

    if let PrefixTree::Leaf { symbol, .. } = tree {
        while output.len() < expected_count {
            let position = reader.position();
            match reader.read_bit() {
                Ok(false) => output.push(*symbol),
                Ok(true) => return Err(CodecError::InvalidTraversal { position }.into()),
                Err(_) => break,
            }
        }
    } else {
        let mut node = tree;
        while output.len() < expected_count {
            let position = reader.position();
            let Ok(bit) = reader.read_bit() else {
                break;
            };
            node = node
                .child(bit)
                .ok_or(CodecError::InvalidTraversal { position })?;

            if let PrefixTree::Leaf { symbol, .. } = node {
                output.push(*symbol);
                node = tree;
            }
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
        let (frequencies, table) = build_codebook(data).unwrap();
        let payload = encode(data, &table).unwrap();
        // Decoder only sees the persisted frequencies
        let tree = build_tree(&frequencies).unwrap();
        decode(&payload, &tree, data.len()).unwrap()
    }

    #[test]
    fn test_round_trip_text() {
        let data = b"hello world! this is a test of huffman coding.";
        assert_eq!(round_trip(data), data);
    }

    #[test]
    fn test_round_trip_all_symbols() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(round_trip(&data), data);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for len in [1usize, 2, 3, 100, 4096] {
            let data: Vec<u8> = (0..len).map(|_| rng.gen_range(0..40)).collect();
            assert_eq!(round_trip(&data), data, "len {len}");
        }
    }

    #[test]
    fn test_degenerate_single_symbol() {
        let data = vec![0u8; 1000];
        let (frequencies, table) = build_codebook(&data).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().to_string(), "0");

        let payload = encode(&data, &table).unwrap();
        assert_eq!(payload.len(), 125);

        let tree = build_tree(&frequencies).unwrap();
        assert_eq!(decode(&payload, &tree, data.len()).unwrap(), data);
    }

    #[test]
    fn test_degenerate_rejects_one_bits() {
        let tree = build_tree(&FrequencyTable::from_bytes(b"aaa")).unwrap();
        let result = decode(&[0b0010_0000], &tree, 3);
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::InvalidTraversal { position: 2 }))
        ));
    }

    #[test]
    fn test_code_table_is_prefix_free() {
        let frequencies = FrequencyTable::from_bytes(b"aaaaabbbbccdeeeeeeeeffffffg");
        let table = build_code_table(&build_tree(&frequencies).unwrap());
        assert_eq!(table.len(), frequencies.distinct());
        assert!(table.is_prefix_free());
    }

    #[test]
    fn test_frequent_symbols_get_short_codes() {
        let mut data = vec![b'a'; 100];
        data.extend_from_slice(b"bcd");
        let (_, table) = build_codebook(&data).unwrap();
        let a_len = table.get(b'a').unwrap().len();
        for symbol in [b'b', b'c', b'd'] {
            assert!(table.get(symbol).unwrap().len() >= a_len);
        }
    }

    #[test]
    fn test_tree_is_deterministic() {
        // Every frequency ties; the merge order must still be reproducible.
        let frequencies = FrequencyTable::from_counts((0..=255u8).map(|s| (s, 3)));
        let first = build_tree(&frequencies).unwrap();
        let second = build_tree(&frequencies).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.frequency(), 256 * 3);
        assert_eq!(first.depth(), 8);
    }

    #[test]
    fn test_empty_table() {
        let result = build_tree(&FrequencyTable::from_bytes(b""));
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::EmptyFrequencyTable))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let data = b"abcabcabcabcabc";
        let (frequencies, table) = build_codebook(data).unwrap();
        let payload = encode(data, &table).unwrap();
        let tree = build_tree(&frequencies).unwrap();

        let result = decode(&payload[..payload.len() - 1], &tree, data.len());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::LengthMismatch { expected: 15, .. }))
        ));
    }

    #[test]
    fn test_extra_payload_rejected() {
        let data = b"abcabc";
        let (frequencies, table) = build_codebook(data).unwrap();
        let mut payload = encode(data, &table).unwrap();
        payload.push(0);
        let tree = build_tree(&frequencies).unwrap();

        let result = decode(&payload, &tree, data.len());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::TrailingData { .. }))
        ));
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let frequencies = FrequencyTable::from_counts([(b'a', i32::MAX as u32)]);
        let tree = build_tree(&frequencies).unwrap();
        let result = decode(&[0], &tree, i32::MAX as usize);
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::LengthMismatch { actual: 8, .. }))
        ));
    }

    #[test]
    fn test_zero_expected() {
        let tree = build_tree(&FrequencyTable::from_bytes(b"ab")).unwrap();
        assert!(decode(&[], &tree, 0).unwrap().is_empty());
    }
}
