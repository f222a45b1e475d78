//! Packed binary trie database.
//!
//! The database is a flat array of fixed-size nodes. Each node holds two
//! 24-bit little-endian values: the child to follow when the current address
//! bit is 0 (`left`) and when it is 1 (`right`). Values at or above
//! [`COUNTRY_BEGIN`] are leaves carrying a country index.
//!
//! - `reader`: traversal over any [`NodeSource`]
//! - `builder`: produces database files in the same format

mod builder;
mod reader;

use std::io;

use crate::config::{COUNTRY_BEGIN, NODE_SIZE};
use crate::error_handling::LookupError;

// Re-export public API
pub use builder::TrieBuilder;
pub use reader::seek_country;

/// One decoded trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Value followed when the address bit is 0
    pub left: u32,
    /// Value followed when the address bit is 1
    pub right: u32,
}

impl Node {
    /// Decodes a node from its on-disk record.
    pub fn from_record(record: &[u8; NODE_SIZE]) -> Self {
        Node {
            left: read_u24_le(&record[0..3]),
            right: read_u24_le(&record[3..6]),
        }
    }

    /// Encodes the node into its on-disk record.
    pub fn to_record(&self) -> [u8; NODE_SIZE] {
        let mut record = [0u8; NODE_SIZE];
        write_u24_le(&mut record[0..3], self.left);
        write_u24_le(&mut record[3..6], self.right);
        record
    }
}

/// Returns the country index if `value` is a leaf.
pub fn terminal_index(value: u32) -> Option<usize> {
    value
        .checked_sub(COUNTRY_BEGIN)
        .map(|index| index as usize)
}

fn read_u24_le(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16
}

fn write_u24_le(out: &mut [u8], value: u32) {
    out[0] = (value & 0xFF) as u8;
    out[1] = ((value >> 8) & 0xFF) as u8;
    out[2] = ((value >> 16) & 0xFF) as u8;
}

/// Anything nodes can be read from by record number.
///
/// Implementations must return each record as one consistent unit: a node
/// must never combine bytes from two different database versions.
pub trait NodeSource {
    /// Reads node `node` (record offset, not byte offset).
    fn read_node(&self, node: u32) -> Result<Node, LookupError>;
}

impl NodeSource for [u8] {
    fn read_node(&self, node: u32) -> Result<Node, LookupError> {
        let start = node as usize * NODE_SIZE;
        let record = self
            .get(start..start + NODE_SIZE)
            .and_then(|slice| <&[u8; NODE_SIZE]>::try_from(slice).ok())
            .ok_or_else(|| LookupError::Corrupt {
                node,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("record ends past {} bytes of data", self.len()),
                ),
            })?;
        Ok(Node::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_little_endian() {
        let node = Node::from_record(&[0x01, 0x02, 0x03, 0x0A, 0x0B, 0x0C]);
        assert_eq!(node.left, 0x030201);
        assert_eq!(node.right, 0x0C0B0A);
    }

    #[test]
    fn test_decode_high_bytes_without_sign_extension() {
        // Bytes >= 0x80 must be read as unsigned
        let node = Node::from_record(&[0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF]);
        assert_eq!(node.left, 0xFFFFFF);
        assert_eq!(node.right, 0xFFFF00);
        assert_eq!(terminal_index(node.left), Some(255));
        assert_eq!(terminal_index(node.right), Some(0));
    }

    #[test]
    fn test_encode_matches_decode() {
        let node = Node {
            left: 17,
            right: COUNTRY_BEGIN + 225,
        };
        assert_eq!(Node::from_record(&node.to_record()), node);
    }

    #[test]
    fn test_terminal_index() {
        assert_eq!(terminal_index(0), None);
        assert_eq!(terminal_index(COUNTRY_BEGIN - 1), None);
        assert_eq!(terminal_index(COUNTRY_BEGIN), Some(0));
        assert_eq!(terminal_index(COUNTRY_BEGIN + 16), Some(16));
    }

    #[test]
    fn test_slice_source_short_read_is_corrupt() {
        let data = [0u8; NODE_SIZE + 3];
        assert!(data.as_slice().read_node(0).is_ok());
        let err = data.as_slice().read_node(1).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_slice_source_empty() {
        let data: &[u8] = &[];
        assert!(matches!(
            data.read_node(0),
            Err(LookupError::Corrupt { node: 0, .. })
        ));
    }
}
