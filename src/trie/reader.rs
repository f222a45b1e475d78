//! Trie traversal.

use crate::config::{COUNTRY_BEGIN, IPV4_DEPTH};
use crate::countries::COUNTRY_COUNT;
use crate::error_handling::LookupError;

use super::NodeSource;

/// Resolves a 32-bit IPv4 key to a country index.
///
/// Walks at most one node per address bit, most significant bit first, so a
/// malformed file with cycles still terminates. Returns 0 when the walk runs
/// out of bits or lands on an index past the country table.
///
/// # Errors
///
/// Propagates the source's read error (`NotReady` or `Corrupt`); a short
/// read is never reported as "not found".
pub fn seek_country<S>(source: &S, key: u32) -> Result<usize, LookupError>
where
    S: NodeSource + ?Sized,
{
    let mut node = 0u32;

    for depth in (0..IPV4_DEPTH).rev() {
        let record = source.read_node(node)?;
        let next = if key & (1 << depth) != 0 {
            record.right
        } else {
            record.left
        };

        if next >= COUNTRY_BEGIN {
            let index = (next - COUNTRY_BEGIN) as usize;
            if index > COUNTRY_COUNT {
                log::debug!(
                    "Node {} points at country index {} past the table, treating as unknown",
                    node,
                    index
                );
                return Ok(0);
            }
            return Ok(index);
        }
        node = next;
    }

    Ok(0)
}
