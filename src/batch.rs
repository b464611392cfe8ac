//! Query batching and structure-of-arrays packing for the vectorized kernels.
//!
//! Queries are sorted by length, descending, so the lanes of one batch carry
//! similar work and the longest batches are scheduled first. Each batch holds
//! `V::LANES` queries padded to the batch's longest length rounded up to a
//! multiple of [`BLOCK_HEIGHT`], using a filler character that matches no DNA
//! base. The characters are then repacked row-major over (batch-row, lane) so
//! that one aligned load yields the same row of all lanes.

use crate::simd::{ScoreElem, SimdVec};

/// Ring size of the nearby-column cache; must be a power of two.
pub const BLOCK_WIDTH: usize = 8;

/// Number of consecutive query rows computed per sweep over the graph;
/// must be a power of two.
pub const BLOCK_HEIGHT: usize = 16;

/// Padding character. `B` is not a DNA base, so padded lanes can never score
/// a match against the reference.
pub const FILLER: u8 = b'B';

/// Queries repacked for lane-parallel processing.
pub struct PackedQueries<V: SimdVec> {
    /// Character lanes, row-major over (row, lane) within each batch.
    soa: Vec<V::Elem>,
    /// Start offset of each batch in `soa`, plus one trailing entry.
    prefix: Vec<usize>,
    /// Sorted position -> original query index.
    sorted_order: Vec<usize>,
    /// Query lengths in sorted order.
    sorted_lens: Vec<usize>,
    num_queries: usize,
}

impl<V: SimdVec> PackedQueries<V> {
    pub fn new(queries: &[&str]) -> Self {
        let num_queries = queries.len();

        // Load balancing: longest queries first, index ascending among equals.
        let mut sorted_order: Vec<usize> = (0..num_queries).collect();
        sorted_order.sort_by_key(|&i| (std::cmp::Reverse(queries[i].len()), i));
        let sorted_lens: Vec<usize> = sorted_order.iter().map(|&i| queries[i].len()).collect();

        let mut soa = Vec::new();
        let mut prefix = vec![0usize];

        for chunk in sorted_order.chunks(V::LANES) {
            let rows = padded_rows(queries[chunk[0]].len());
            for row in 0..rows {
                for lane in 0..V::LANES {
                    let byte = chunk
                        .get(lane)
                        .and_then(|&q| queries[q].as_bytes().get(row).copied())
                        .unwrap_or(FILLER);
                    soa.push(V::Elem::from_byte(byte));
                }
            }
            prefix.push(soa.len());
        }

        PackedQueries {
            soa,
            prefix,
            sorted_order,
            sorted_lens,
            num_queries,
        }
    }

    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    pub fn num_batches(&self) -> usize {
        self.prefix.len() - 1
    }

    /// Padded row count of batch `b` (a multiple of `BLOCK_HEIGHT`).
    pub fn batch_rows(&self, b: usize) -> usize {
        (self.prefix[b + 1] - self.prefix[b]) / V::LANES
    }

    /// Character lanes of `BLOCK_HEIGHT` consecutive rows starting at
    /// `row_block` within batch `b`.
    #[inline]
    pub fn row_block(&self, b: usize, row_block: usize) -> &[V::Elem] {
        let start = self.prefix[b] + row_block * V::LANES;
        &self.soa[start..start + BLOCK_HEIGHT * V::LANES]
    }

    /// Original query index held by `lane` of batch `b`, if any.
    pub fn original_index(&self, b: usize, lane: usize) -> Option<usize> {
        self.sorted_order.get(b * V::LANES + lane).copied()
    }

    /// Length of the query held by `lane` of batch `b` (0 for padded lanes).
    pub fn lane_len(&self, b: usize, lane: usize) -> usize {
        self.sorted_lens.get(b * V::LANES + lane).copied().unwrap_or(0)
    }
}

/// Round a query length up to a multiple of `BLOCK_HEIGHT`.
fn padded_rows(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        len + BLOCK_HEIGHT - 1 - (len - 1) % BLOCK_HEIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::S32x8;

    #[test]
    fn rows_round_up_to_block_height() {
        assert_eq!(padded_rows(1), 16);
        assert_eq!(padded_rows(16), 16);
        assert_eq!(padded_rows(17), 32);
    }

    #[test]
    fn soa_interleaves_lanes() {
        let queries = ["ACGT", "GG"];
        let packed = PackedQueries::<S32x8>::new(&queries);
        assert_eq!(packed.num_batches(), 1);
        assert_eq!(packed.batch_rows(0), 16);

        let block = packed.row_block(0, 0);
        // Row 0: lane 0 = 'A', lane 1 = 'G', remaining lanes filler.
        assert_eq!(block[0].to_i32(), b'A' as i32);
        assert_eq!(block[1].to_i32(), b'G' as i32);
        assert_eq!(block[2].to_i32(), FILLER as i32);
        // Row 2: lane 1 is past its query, so filler.
        assert_eq!(block[2 * 8].to_i32(), b'G' as i32);
        assert_eq!(block[2 * 8 + 1].to_i32(), FILLER as i32);
    }

    #[test]
    fn longest_query_leads_the_sorted_order() {
        let queries = ["AC", "ACGTACGT", "ACGT"];
        let packed = PackedQueries::<S32x8>::new(&queries);
        assert_eq!(packed.original_index(0, 0), Some(1));
        assert_eq!(packed.original_index(0, 1), Some(2));
        assert_eq!(packed.original_index(0, 2), Some(0));
        assert_eq!(packed.lane_len(0, 0), 8);
    }
}
