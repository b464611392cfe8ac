//! Lane-parallel Phase 1 kernels.
//!
//! One register lane carries one query; the graph's in-neighbor structure is
//! consulted column by column in topological order. Scores live in three
//! tiers of buffers:
//!
//! - `nearby`: a ring of the last [`BLOCK_WIDTH`] columns, indexed by
//!   `col & (BLOCK_WIDTH - 1)`, holding all [`BLOCK_HEIGHT`] rows of the
//!   current sweep;
//! - `farther`: the same rows for columns feeding an edge longer than the
//!   ring, precomputed per graph;
//! - `prev_sweep`/`cur_sweep`: the final sweep row of every column,
//!   double-buffered across consecutive sweeps. Both buffers start zeroed,
//!   so the first sweep deliberately reads an all-zero "row above".
//!
//! End locations are tracked lane-masked with last-update-wins semantics, so
//! ties resolve to the highest (row, column) visited. End columns are kept
//! as 4-byte values whatever the score lane width.

use crate::batch::{PackedQueries, BLOCK_HEIGHT, BLOCK_WIDTH};
use crate::graph::Graph;
use crate::scoring::Scoring;
use crate::simd::{ScoreElem, SimdVec};

/// Best score and end (or start) location of one lane.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneBest {
    pub score: i32,
    pub row: i32,
    pub col: i32,
}

/// Columns whose scores must outlive the nearby-column ring, mapped to slots
/// of the `farther` buffer.
pub struct LongHops {
    slot: Vec<u32>,
    count: usize,
}

const NO_SLOT: u32 = u32::MAX;

impl LongHops {
    /// Slots for the forward sweep: the *source* column of every in-edge
    /// whose span reaches past the ring.
    pub fn forward(graph: &Graph) -> Self {
        let width = graph.total_ref_length();
        let mut flagged = vec![false; width];
        for c in 0..width {
            for &p in graph.preds(c) {
                if c - p as usize >= BLOCK_WIDTH {
                    flagged[p as usize] = true;
                }
            }
        }
        Self::from_flags(&flagged)
    }

    /// Slots for the reverse sweep: the *target* column of every such edge,
    /// which the reverse traversal visits first.
    pub fn reverse(graph: &Graph) -> Self {
        let width = graph.total_ref_length();
        let mut flagged = vec![false; width];
        for c in 0..width {
            for &p in graph.preds(c) {
                if c - p as usize >= BLOCK_WIDTH {
                    flagged[c] = true;
                }
            }
        }
        Self::from_flags(&flagged)
    }

    fn from_flags(flagged: &[bool]) -> Self {
        let mut slot = vec![NO_SLOT; flagged.len()];
        let mut count = 0;
        for (col, &is_long) in flagged.iter().enumerate() {
            if is_long {
                slot[col] = count as u32;
                count += 1;
            }
        }
        LongHops { slot, count }
    }

    #[inline(always)]
    fn slot_of(&self, col: usize) -> u32 {
        self.slot[col]
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Per-thread DP buffers, reused across batches.
pub struct Workspace<V: SimdVec> {
    /// Final row of the previous sweep, one vector per column. Swapped with
    /// `cur_sweep` after every sweep; together they are the double-buffered
    /// "last batch row".
    prev_sweep: Vec<V>,
    /// Final row of the sweep being computed.
    cur_sweep: Vec<V>,
    /// Nearby-column ring, `BLOCK_WIDTH * BLOCK_HEIGHT` vectors, flat with
    /// computed offsets `(col & (BLOCK_WIDTH-1)) * BLOCK_HEIGHT + row`.
    nearby: Vec<V>,
    /// Long-hop columns, `count * BLOCK_HEIGHT` vectors.
    farther: Vec<V>,
}

impl<V: SimdVec> Workspace<V> {
    pub fn new(graph: &Graph, long_hops: &LongHops) -> Self {
        let width = graph.total_ref_length();
        Workspace {
            prev_sweep: vec![V::zero(); width],
            cur_sweep: vec![V::zero(); width],
            nearby: vec![V::zero(); BLOCK_WIDTH * BLOCK_HEIGHT],
            farther: vec![V::zero(); long_hops.count * BLOCK_HEIGHT],
        }
    }
}

/// Forward Phase 1 over one query batch: best score and end location per
/// lane, ties resolved last-update-wins.
pub fn phase1_forward_batch<V: SimdVec>(
    graph: &Graph,
    packed: &PackedQueries<V>,
    scoring: &Scoring,
    long_hops: &LongHops,
    batch: usize,
    ws: &mut Workspace<V>,
) -> Vec<LaneBest> {
    let width = graph.total_ref_length();
    let rows = packed.batch_rows(batch);

    let match_v = V::splat(V::Elem::from_i32(scoring.match_score));
    let mismatch_v = V::splat(V::Elem::from_i32(-scoring.mismatch_penalty));
    let del_v = V::splat(V::Elem::from_i32(-scoring.gap_del));
    let ins_v = V::splat(V::Elem::from_i32(-scoring.gap_ins));

    let mut best_scores = V::zero();
    let mut best_rows = V::zero();
    let mut best_cols = [0i32; 64];

    // Zero both sweep buffers: the first sweep reads one of them as its
    // "row above".
    ws.prev_sweep.fill(V::zero());
    ws.cur_sweep.fill(V::zero());
    let Workspace {
        prev_sweep,
        cur_sweep,
        nearby,
        farther,
    } = ws;

    let mut j = 0;
    while j < rows {
        let chars = packed.row_block(batch, j);
        let (prev_row, cur_row) = (&*prev_sweep, &mut *cur_sweep);

        for k in 0..width {
            let graph_char = V::splat(V::Elem::from_byte(graph.label(k)));
            let preds = graph.preds(k);
            let mut current = V::zero();

            for l in 0..BLOCK_HEIGHT {
                let read_chars = V::load(&chars[l * V::LANES..]);
                let eq = read_chars.cmpeq(graph_char);
                let sub = V::blend(eq, mismatch_v, match_v);

                // Local alignment can start with a match at this character.
                current = V::zero().max(sub);

                if l == 0 {
                    for &p in preds {
                        let p = p as usize;
                        current = current.max(prev_row[p].add(sub));

                        let del_src = if k - p < BLOCK_WIDTH {
                            nearby[(p & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l]
                        } else {
                            farther[long_hops.slot_of(p) as usize * BLOCK_HEIGHT + l]
                        };
                        current = current.max(del_src.add(del_v));
                    }
                    current = current.max(prev_row[k].add(ins_v));
                } else {
                    for &p in preds {
                        let p = p as usize;
                        let (subst_src, del_src) = if k - p < BLOCK_WIDTH {
                            let base = (p & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT;
                            (nearby[base + l - 1], nearby[base + l])
                        } else {
                            let base = long_hops.slot_of(p) as usize * BLOCK_HEIGHT;
                            (farther[base + l - 1], farther[base + l])
                        };
                        current = current.max(subst_src.add(sub)).max(del_src.add(del_v));
                    }
                    current = current
                        .max(nearby[(k & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l - 1].add(ins_v));
                }

                // Last-update-wins end tracking: lanes that merely tie the
                // running best still refresh their end location.
                best_scores = current.max(best_scores);
                let updated = current.cmpeq(best_scores);
                best_rows = best_rows.mask_splat(updated, V::Elem::from_i32((j + l) as i32));
                set_masked_cols(&mut best_cols, V::LANES, updated, k as i32);

                nearby[(k & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l] = current;
                if long_hops.slot_of(k) != NO_SLOT {
                    farther[long_hops.slot_of(k) as usize * BLOCK_HEIGHT + l] = current;
                }
            }

            cur_row[k] = current;
        }

        std::mem::swap(prev_sweep, cur_sweep);
        j += BLOCK_HEIGHT;
    }

    extract_lanes::<V>(best_scores, best_rows, &best_cols)
}

/// Reverse Phase 1 over one query batch, fed the chosen-strand queries
/// *reversed* and the forward end location of each lane (row already in
/// reverse coordinates, `-1` for padded lanes). Reports the best reverse
/// score (forward + 1 by construction) and the alignment start in reverse
/// coordinates.
#[allow(clippy::too_many_arguments)]
pub fn phase1_reverse_batch<V: SimdVec>(
    graph: &Graph,
    packed: &PackedQueries<V>,
    scoring: &Scoring,
    long_hops: &LongHops,
    batch: usize,
    fwd_rows: &[i32],
    fwd_cols: &[i32],
    ws: &mut Workspace<V>,
) -> Vec<LaneBest> {
    let width = graph.total_ref_length();
    let rows = packed.batch_rows(batch);

    let match_v = V::splat(V::Elem::from_i32(scoring.match_score));
    let mismatch_v = V::splat(V::Elem::from_i32(-scoring.mismatch_penalty));
    let del_v = V::splat(V::Elem::from_i32(-scoring.gap_del));
    let ins_v = V::splat(V::Elem::from_i32(-scoring.gap_ins));
    let nudge = V::Elem::from_i32(scoring.match_score + 1);

    let mut fwd_rows_v = V::zero();
    for (lane, &row) in fwd_rows.iter().enumerate().take(V::LANES) {
        fwd_rows_v = fwd_rows_v.mask_splat(1 << lane, V::Elem::from_i32(row));
    }

    let mut best_scores = V::zero();
    let mut best_rows = V::zero();
    let mut best_cols = [0i32; 64];

    ws.prev_sweep.fill(V::zero());
    ws.cur_sweep.fill(V::zero());
    let Workspace {
        prev_sweep,
        cur_sweep,
        nearby,
        farther,
    } = ws;

    let mut j = 0;
    while j < rows {
        let chars = packed.row_block(batch, j);
        let (prev_row, cur_row) = (&*prev_sweep, &mut *cur_sweep);

        for k in (0..width).rev() {
            let graph_char = V::splat(V::Elem::from_byte(graph.label(k)));
            let succs = graph.succs(k);
            let mut current = V::zero();

            // Lanes whose forward end column is this column.
            let mut col_mask = 0u64;
            for (lane, &col) in fwd_cols.iter().enumerate().take(V::LANES) {
                if col == k as i32 {
                    col_mask |= 1 << lane;
                }
            }

            for l in 0..BLOCK_HEIGHT {
                let read_chars = V::load(&chars[l * V::LANES..]);
                let eq = read_chars.cmpeq(graph_char);
                let sub = V::blend(eq, mismatch_v, match_v);

                current = V::zero().max(sub);

                if l == 0 {
                    for &s in succs {
                        let s = s as usize;
                        current = current.max(prev_row[s].add(sub));

                        let del_src = if s - k < BLOCK_WIDTH {
                            nearby[(s & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l]
                        } else {
                            farther[long_hops.slot_of(s) as usize * BLOCK_HEIGHT + l]
                        };
                        current = current.max(del_src.add(del_v));
                    }
                    current = current.max(prev_row[k].add(ins_v));
                } else {
                    for &s in succs {
                        let s = s as usize;
                        let (subst_src, del_src) = if s - k < BLOCK_WIDTH {
                            let base = (s & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT;
                            (nearby[base + l - 1], nearby[base + l])
                        } else {
                            let base = long_hops.slot_of(s) as usize * BLOCK_HEIGHT;
                            (farther[base + l - 1], farther[base + l])
                        };
                        current = current.max(subst_src.add(sub)).max(del_src.add(del_v));
                    }
                    current = current
                        .max(nearby[(k & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l - 1].add(ins_v));
                }

                // Pin the reported start to the forward DP's alignment: at
                // the forward end cell, overwrite the lane score with
                // match + 1 so every extension of that exact alignment
                // outscores any tie by one. Must precede this cell's own
                // best-score update so a single-character alignment still
                // reports forward + 1.
                let row_eq = fwd_rows_v.cmpeq(V::splat(V::Elem::from_i32((j + l) as i32)));
                let cell_mask = row_eq & col_mask;
                if cell_mask != 0 {
                    current = current.mask_splat(cell_mask, nudge);
                }

                best_scores = current.max(best_scores);
                let updated = current.cmpeq(best_scores);
                best_rows = best_rows.mask_splat(updated, V::Elem::from_i32((j + l) as i32));
                set_masked_cols(&mut best_cols, V::LANES, updated, k as i32);

                nearby[(k & (BLOCK_WIDTH - 1)) * BLOCK_HEIGHT + l] = current;
                if long_hops.slot_of(k) != NO_SLOT {
                    farther[long_hops.slot_of(k) as usize * BLOCK_HEIGHT + l] = current;
                }
            }

            cur_row[k] = current;
        }

        std::mem::swap(prev_sweep, cur_sweep);
        j += BLOCK_HEIGHT;
    }

    extract_lanes::<V>(best_scores, best_rows, &best_cols)
}

#[inline(always)]
fn set_masked_cols(cols: &mut [i32; 64], lanes: usize, mask: u64, value: i32) {
    for (lane, col) in cols.iter_mut().enumerate().take(lanes) {
        if mask & (1 << lane) != 0 {
            *col = value;
        }
    }
}

fn extract_lanes<V: SimdVec>(scores: V, rows: V, cols: &[i32; 64]) -> Vec<LaneBest> {
    (0..V::LANES)
        .map(|lane| LaneBest {
            score: scores.extract(lane).to_i32(),
            row: rows.extract(lane).to_i32(),
            col: cols[lane],
        })
        .collect()
}
