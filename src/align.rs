//! Alignment orchestration: the four-phase driver, strand selection, lane
//! dispatch and parallel scheduling.
//!
//! Two drivers share the scalar Phase 3/4 machinery. The scalar driver runs
//! every phase per query; the vectorized driver batches Phase 1 (forward and
//! reverse) across lanes, then finishes each query with the scalar windowed
//! recompute and traceback. Queries are dispatched over rayon's work-stealing
//! pool; the length-descending batch order keeps the stragglers early.

use std::fmt;
use std::time::Instant;

use rayon::prelude::*;

use crate::batch::PackedQueries;
use crate::cigar::Cigar;
use crate::graph::Graph;
use crate::scalar;
use crate::scoring::{Precision, Scoring, SimdWidth};
use crate::seq;
use crate::simd::{S16x16, S16x32, S32x16, S32x8, S8x32, S8x64, SimdVec};
use crate::vectorized::{self, LaneBest, LongHops, Workspace};

/// Strand of the reported alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Wall-clock seconds spent in each phase, summed over all queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub phase1: f64,
    pub phase2: f64,
    pub phase3: f64,
    pub phase4: f64,
}

impl PhaseTimings {
    fn add(&mut self, other: &PhaseTimings) {
        self.phase1 += other.phase1;
        self.phase2 += other.phase2;
        self.phase3 += other.phase3;
        self.phase4 += other.phase4;
    }
}

/// Alignment of one query against the graph.
///
/// Rows are 0-based positions in the *aligned* sequence: for a reverse-strand
/// hit they refer to the reverse complement of the input query. Columns are
/// global reference columns.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub query: usize,
    pub score: i32,
    pub strand: Strand,
    pub vid_end: usize,
    pub end_row: usize,
    pub end_col: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub cigar: Cigar,
}

/// Results plus the per-phase timing record.
#[derive(Debug)]
pub struct AlignOutput {
    pub results: Vec<AlignmentResult>,
    pub timings: PhaseTimings,
}

#[derive(Debug)]
pub enum AlignError {
    /// A score parameter is zero or negative.
    InvalidScoring,
    /// The requested lane type cannot hold the score bound of the longest
    /// query.
    PrecisionOverflow { required: i64, precision: Precision },
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::InvalidScoring => {
                write!(
                    f,
                    "score parameters must be positive and small enough for \
                     byte-wide traceback deltas"
                )
            }
            AlignError::PrecisionOverflow { required, precision } => write!(
                f,
                "score bound {required} does not fit a {precision}-byte lane; \
                 raise --precision or shorten the queries"
            ),
        }
    }
}

impl std::error::Error for AlignError {}

/// Alignment configuration.
#[derive(Debug, Clone, Copy)]
pub struct AlignParams {
    pub scoring: Scoring,
    pub simd: SimdWidth,
    /// `None` selects the narrowest lane that fits the score bound.
    pub precision: Option<Precision>,
}

impl Default for AlignParams {
    fn default() -> Self {
        AlignParams {
            scoring: Scoring::default(),
            simd: SimdWidth::Bits512,
            precision: None,
        }
    }
}

/// Align every query locally against the graph.
pub fn align_local(
    graph: &Graph,
    queries: &[String],
    params: &AlignParams,
) -> Result<AlignOutput, AlignError> {
    if !params.scoring.is_valid() {
        return Err(AlignError::InvalidScoring);
    }

    match params.simd {
        SimdWidth::None => Ok(align_local_scalar(graph, queries, &params.scoring)),
        SimdWidth::Bits512 | SimdWidth::Bits256 => {
            let longest = queries.iter().map(|q| q.len()).max().unwrap_or(0);
            // The reverse kernel stores match + 1 at the forward end cell.
            let required = params.scoring.max_alignment_score(longest) + 1;

            let precision = match params.precision {
                Some(p) => {
                    if !p.admits(required) {
                        return Err(AlignError::PrecisionOverflow {
                            required,
                            precision: p,
                        });
                    }
                    p
                }
                None => Precision::select(required),
            };
            log::debug!(
                "vectorized phase 1: simd width {}, {}-byte lanes, score bound {}",
                params.simd,
                precision,
                required
            );

            let out = match (params.simd, precision) {
                (SimdWidth::Bits512, Precision::Byte1) => {
                    align_local_simd::<S8x64>(graph, queries, &params.scoring)
                }
                (SimdWidth::Bits512, Precision::Byte2) => {
                    align_local_simd::<S16x32>(graph, queries, &params.scoring)
                }
                (SimdWidth::Bits512, Precision::Byte4) => {
                    align_local_simd::<S32x16>(graph, queries, &params.scoring)
                }
                (SimdWidth::Bits256, Precision::Byte1) => {
                    align_local_simd::<S8x32>(graph, queries, &params.scoring)
                }
                (SimdWidth::Bits256, Precision::Byte2) => {
                    align_local_simd::<S16x16>(graph, queries, &params.scoring)
                }
                (SimdWidth::Bits256, Precision::Byte4) => {
                    align_local_simd::<S32x8>(graph, queries, &params.scoring)
                }
                (SimdWidth::None, _) => unreachable!(),
            };
            Ok(out)
        }
    }
}

/// Scalar driver: all four phases per query, queries in parallel.
fn align_local_scalar(graph: &Graph, queries: &[String], scoring: &Scoring) -> AlignOutput {
    let results: Vec<(AlignmentResult, PhaseTimings)> = queries
        .par_iter()
        .enumerate()
        .map(|(idx, query)| align_one_scalar(graph, idx, query, scoring))
        .collect();

    let mut timings = PhaseTimings::default();
    let results = results
        .into_iter()
        .map(|(result, t)| {
            timings.add(&t);
            result
        })
        .collect();

    AlignOutput { results, timings }
}

fn align_one_scalar(
    graph: &Graph,
    idx: usize,
    query: &str,
    scoring: &Scoring,
) -> (AlignmentResult, PhaseTimings) {
    let mut timings = PhaseTimings::default();

    if query.is_empty() {
        return (empty_result(idx), timings);
    }

    // Phase 1: forward DP on both strands.
    let tick = Instant::now();
    let rev_comp = seq::reverse_complement(query);
    let best_fwd = scalar::phase1_score(query.as_bytes(), graph, scoring);
    let best_rev = scalar::phase1_score(rev_comp.as_bytes(), graph, scoring);
    timings.phase1 = tick.elapsed().as_secs_f64();

    // The reverse complement wins ties.
    let (strand, best, read) = if best_fwd.score > best_rev.score {
        (Strand::Forward, best_fwd, query.as_bytes())
    } else {
        (Strand::Reverse, best_rev, rev_comp.as_bytes())
    };

    if best.score == 0 {
        return (empty_result(idx), timings);
    }

    // Phase 2: bound the recompute window by backward reachability.
    let tick = Instant::now();
    let max_distance = scoring.max_ref_span(read.len());
    let left_col = graph.left_most_reachable_col(best.col, max_distance);
    timings.phase2 = tick.elapsed().as_secs_f64();

    // Phase 3: windowed recompute with the traceback delta log.
    let tick = Instant::now();
    let log = scalar::phase3_recompute(read, graph, scoring, left_col, &best);
    timings.phase3 = tick.elapsed().as_secs_f64();

    // Phase 4: CIGAR reconstruction.
    let tick = Instant::now();
    let trace = scalar::phase4_traceback(read, graph, scoring, &best, &log);
    timings.phase4 = tick.elapsed().as_secs_f64();

    log::debug!(
        "query #{idx}: score {}, strand {strand}, end vertex {}, row {}, col {}, cigar {}",
        best.score,
        best.vertex,
        best.row,
        best.col,
        trace.cigar
    );

    let result = AlignmentResult {
        query: idx,
        score: best.score,
        strand,
        vid_end: best.vertex,
        end_row: best.row,
        end_col: best.col,
        start_row: trace.start_row,
        start_col: trace.start_col,
        cigar: trace.cigar,
    };
    (result, timings)
}

/// Per-query outcome of the batched forward sweeps.
#[derive(Clone, Default)]
struct Phase1Outcome {
    score: i32,
    end_row: i32,
    end_col: i32,
}

/// Vectorized driver: batched Phase 1 forward on both strands, strand
/// choice, batched Phase 1 reverse for starts, scalar Phase 3/4 per query.
fn align_local_simd<V: SimdVec>(
    graph: &Graph,
    queries: &[String],
    scoring: &Scoring,
) -> AlignOutput {
    let mut timings = PhaseTimings::default();

    // Phase 1 forward, both strands.
    let tick = Instant::now();
    let long_fwd = LongHops::forward(graph);

    let fwd_strings: Vec<&str> = queries.iter().map(|q| q.as_str()).collect();
    let rev_comps: Vec<String> = queries.iter().map(|q| seq::reverse_complement(q)).collect();
    let rev_strings: Vec<&str> = rev_comps.iter().map(|q| q.as_str()).collect();

    let ends_fwd = run_forward::<V>(graph, &fwd_strings, scoring, &long_fwd);
    let ends_rev = run_forward::<V>(graph, &rev_strings, scoring, &long_fwd);
    timings.phase1 = tick.elapsed().as_secs_f64();

    // Strand choice; the reverse complement wins ties.
    let chosen: Vec<(Strand, Phase1Outcome)> = ends_fwd
        .into_iter()
        .zip(ends_rev)
        .map(|(f, r)| {
            if f.score > r.score {
                (Strand::Forward, f)
            } else {
                (Strand::Reverse, r)
            }
        })
        .collect();

    let chosen_reads: Vec<&str> = chosen
        .iter()
        .enumerate()
        .map(|(i, (strand, _))| match strand {
            Strand::Forward => fwd_strings[i],
            Strand::Reverse => rev_strings[i],
        })
        .collect();

    // Phase 1 reverse on the chosen strand finds the start locations.
    let tick = Instant::now();
    let starts = run_reverse::<V>(graph, &chosen_reads, scoring, &chosen);
    timings.phase1 += tick.elapsed().as_secs_f64();

    // Phases 3 and 4 per query, windowed to [start_col .. end_col]. The
    // reverse DP start replaces the scalar driver's reachability bound, so
    // phase 2 stays empty here.
    let with_times: Vec<(AlignmentResult, f64, f64)> = chosen
        .par_iter()
        .enumerate()
        .map(|(idx, (strand, end))| {
            let read = chosen_reads[idx].as_bytes();
            if end.score == 0 || read.is_empty() {
                return (empty_result(idx), 0.0, 0.0);
            }
            let (start_row, start_col) = starts[idx];

            let best = scalar::BestScore {
                score: end.score,
                row: end.end_row as usize,
                col: end.end_col as usize,
                vertex: graph.vertex_of_col(end.end_col as usize),
            };

            let tick = Instant::now();
            let log = scalar::phase3_recompute(read, graph, scoring, start_col, &best);
            let t3 = tick.elapsed().as_secs_f64();

            let tick = Instant::now();
            let trace = scalar::phase4_traceback(read, graph, scoring, &best, &log);
            let t4 = tick.elapsed().as_secs_f64();

            let result = AlignmentResult {
                query: idx,
                score: best.score,
                strand: *strand,
                vid_end: best.vertex,
                end_row: best.row,
                end_col: best.col,
                start_row,
                start_col,
                cigar: trace.cigar,
            };
            (result, t3, t4)
        })
        .collect();

    let mut results = Vec::with_capacity(with_times.len());
    for (result, t3, t4) in with_times {
        timings.phase3 += t3;
        timings.phase4 += t4;
        results.push(result);
    }

    AlignOutput { results, timings }
}

/// Run the forward kernel over every batch in parallel and scatter lane
/// results back to query order.
fn run_forward<V: SimdVec>(
    graph: &Graph,
    reads: &[&str],
    scoring: &Scoring,
    long_hops: &LongHops,
) -> Vec<Phase1Outcome> {
    let packed = PackedQueries::<V>::new(reads);

    let per_batch: Vec<Vec<LaneBest>> = (0..packed.num_batches())
        .into_par_iter()
        .map_init(
            || Workspace::<V>::new(graph, long_hops),
            |ws, b| vectorized::phase1_forward_batch(graph, &packed, scoring, long_hops, b, ws),
        )
        .collect();

    let mut out = vec![Phase1Outcome::default(); reads.len()];
    for (b, lanes) in per_batch.iter().enumerate() {
        for (lane, best) in lanes.iter().enumerate() {
            if let Some(idx) = packed.original_index(b, lane) {
                out[idx] = Phase1Outcome {
                    score: best.score,
                    end_row: best.row,
                    end_col: best.col,
                };
            }
        }
    }
    out
}

/// Run the reverse kernel over the chosen-strand reads (reversed) and map
/// lane starts back to forward coordinates.
fn run_reverse<V: SimdVec>(
    graph: &Graph,
    chosen_reads: &[&str],
    scoring: &Scoring,
    chosen: &[(Strand, Phase1Outcome)],
) -> Vec<(usize, usize)> {
    let long_rev = LongHops::reverse(graph);

    let reversed: Vec<String> = chosen_reads
        .iter()
        .map(|r| r.chars().rev().collect())
        .collect();
    let reversed_refs: Vec<&str> = reversed.iter().map(|r| r.as_str()).collect();
    let packed = PackedQueries::<V>::new(&reversed_refs);

    let per_batch: Vec<Vec<LaneBest>> = (0..packed.num_batches())
        .into_par_iter()
        .map_init(
            || Workspace::<V>::new(graph, &long_rev),
            |ws, b| {
                // Forward end locations in reverse-DP coordinates; padded or
                // unaligned lanes get sentinels no cell can match.
                let mut fwd_rows = vec![-1i32; V::LANES];
                let mut fwd_cols = vec![-1i32; V::LANES];
                for lane in 0..V::LANES {
                    if let Some(idx) = packed.original_index(b, lane) {
                        let (_, end) = &chosen[idx];
                        if end.score > 0 {
                            let len = packed.lane_len(b, lane) as i32;
                            fwd_rows[lane] = len - 1 - end.end_row;
                            fwd_cols[lane] = end.end_col;
                        }
                    }
                }
                vectorized::phase1_reverse_batch(
                    graph, &packed, scoring, &long_rev, b, &fwd_rows, &fwd_cols, ws,
                )
            },
        )
        .collect();

    let mut out = vec![(0usize, 0usize); chosen_reads.len()];
    for (b, lanes) in per_batch.iter().enumerate() {
        for (lane, start) in lanes.iter().enumerate() {
            if let Some(idx) = packed.original_index(b, lane) {
                let (_, end) = &chosen[idx];
                if end.score == 0 {
                    continue;
                }
                // The nudge makes the reverse optimum exactly one more than
                // the forward optimum; anything else is a kernel bug.
                assert_eq!(
                    start.score,
                    end.score + 1,
                    "reverse kernel score diverged from forward kernel (query {idx})"
                );
                let len = chosen_reads[idx].len();
                out[idx] = (len - 1 - start.row as usize, start.col as usize);
            }
        }
    }
    out
}

fn empty_result(idx: usize) -> AlignmentResult {
    AlignmentResult {
        query: idx,
        score: 0,
        strand: Strand::Forward,
        vid_end: 0,
        end_row: 0,
        end_col: 0,
        start_row: 0,
        start_col: 0,
        cigar: Cigar::new(),
    }
}
