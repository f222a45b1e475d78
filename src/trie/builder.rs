//! Database builder.
//!
//! Builds a packed trie from IPv4 networks. Used to produce fixture
//! databases and by the CLI `build` command.

use std::net::Ipv4Addr;

use crate::config::{COUNTRY_BEGIN, IPV4_DEPTH, NODE_SIZE};
use crate::countries::COUNTRY_COUNT;
use crate::error_handling::BuildError;

use super::Node;

/// In-memory trie that serializes to the on-disk format.
///
/// Starts as a single root whose both sides are "unknown". Overlapping
/// inserts follow last-write-wins for the range the later insert covers.
#[derive(Debug, Clone)]
pub struct TrieBuilder {
    nodes: Vec<Node>,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    /// Creates a builder whose every address maps to index 0 (unknown).
    pub fn new() -> Self {
        TrieBuilder {
            nodes: vec![Node {
                left: COUNTRY_BEGIN,
                right: COUNTRY_BEGIN,
            }],
        }
    }

    /// Maps `network/prefix_len` to `country`.
    ///
    /// Host bits past the prefix are ignored. A prefix length of 0 covers the
    /// whole address space.
    ///
    /// # Arguments
    /// * `network` - Network address
    /// * `prefix_len` - Network prefix length (0-32)
    /// * `country` - Country index (0 for unknown, up to `COUNTRY_COUNT`)
    pub fn insert(
        &mut self,
        network: Ipv4Addr,
        prefix_len: u8,
        country: usize,
    ) -> Result<(), BuildError> {
        if u32::from(prefix_len) > IPV4_DEPTH {
            return Err(BuildError::InvalidPrefix(prefix_len));
        }
        if country > COUNTRY_COUNT {
            return Err(BuildError::InvalidCountry(country));
        }

        let leaf = COUNTRY_BEGIN + country as u32;
        if prefix_len == 0 {
            self.nodes[0] = Node {
                left: leaf,
                right: leaf,
            };
            return Ok(());
        }

        let key = u32::from(network);
        let mut node = 0usize;
        for level in 0..u32::from(prefix_len) {
            let go_right = key & (1 << (IPV4_DEPTH - 1 - level)) != 0;

            if level + 1 == u32::from(prefix_len) {
                self.set_side(node, go_right, leaf);
                break;
            }

            let next = self.side(node, go_right);
            node = if next >= COUNTRY_BEGIN {
                // Split the leaf: both halves keep its country until overwritten
                let child = self.allocate(next)?;
                self.set_side(node, go_right, child as u32);
                child
            } else {
                next as usize
            };
        }

        Ok(())
    }

    /// Number of nodes the built database will contain.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serializes the trie into database bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.nodes.len() * NODE_SIZE);
        for node in &self.nodes {
            out.extend_from_slice(&node.to_record());
        }
        out
    }

    fn side(&self, node: usize, right: bool) -> u32 {
        if right {
            self.nodes[node].right
        } else {
            self.nodes[node].left
        }
    }

    fn set_side(&mut self, node: usize, right: bool, value: u32) {
        if right {
            self.nodes[node].right = value;
        } else {
            self.nodes[node].left = value;
        }
    }

    fn allocate(&mut self, fill: u32) -> Result<usize, BuildError> {
        let id = self.nodes.len();
        if id as u64 >= u64::from(COUNTRY_BEGIN) {
            return Err(BuildError::TooManyNodes(COUNTRY_BEGIN));
        }
        self.nodes.push(Node {
            left: fill,
            right: fill,
        });
        Ok(id)
    }
}
