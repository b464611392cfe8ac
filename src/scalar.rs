//! Scalar DP kernels: the Phase 1 reference recurrence, the Phase 3 windowed
//! recompute, and the Phase 4 traceback.
//!
//! The recurrence is local Smith-Waterman with linear gaps, generalized to a
//! DAG: the diagonal (match/mismatch) and horizontal (deletion) terms range
//! over all predecessor columns of the current column. Only two score rows
//! are live at a time; Phase 3 additionally logs one signed byte per cell,
//! the vertical score difference, which is all the traceback needs.

use crate::cigar::Cigar;
use crate::graph::Graph;
use crate::graph_iter::{GraphIterFwd, GraphIterRev};
use crate::scoring::Scoring;

/// Value and location of the best local alignment score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestScore {
    pub score: i32,
    /// Query row of the last aligned character.
    pub row: usize,
    /// Global column of the last aligned character.
    pub col: usize,
    /// Vertex owning `col`.
    pub vertex: usize,
}

/// Phase 1: compute the full-width DP and report the best score with its end
/// location. First maximum wins on ties.
pub fn phase1_score(read: &[u8], graph: &Graph, scoring: &Scoring) -> BestScore {
    let width = graph.total_ref_length();
    let mut rows = [vec![0i32; width], vec![0i32; width]];
    let mut preds: Vec<usize> = Vec::new();

    let mut best = BestScore::default();

    for i in 0..read.len() {
        let (above, current) = split_rows(&mut rows, i);

        let mut g = GraphIterFwd::new(graph);
        while !g.at_end() {
            let j = g.global_offset();
            let sub = scoring.substitution(read[i], g.cur_char());

            g.neighbor_offsets(&mut preds);

            // Local alignment can also start with a match at this character.
            let mut from_match = sub;
            for &k in &preds {
                from_match = from_match.max(above[k] + sub);
            }

            let mut from_deletion = -1;
            for &k in &preds {
                from_deletion = from_deletion.max(current[k] - scoring.gap_del);
            }

            let from_insertion = above[j] - scoring.gap_ins;

            current[j] = from_insertion.max(from_match).max(from_deletion).max(0);

            if best.score < current[j] {
                best.score = current[j];
                best.row = i;
                best.col = j;
                best.vertex = g.current_vertex();
            }

            g.next();
        }
    }

    best
}

/// Phase 3 output: the last computed score row plus the per-cell vertical
/// score deltas of the recompute window.
pub struct RecomputeLog {
    /// Leftmost column of the window.
    pub j0: usize,
    /// Window width in columns.
    pub width: usize,
    /// Scores of row `end.row` across the window.
    pub final_row: Vec<i32>,
    /// `H[i][j] - H[i-1][j]`, row-major, `(end.row + 1) * width` entries.
    /// Bounded by the largest score parameter, so one byte per cell.
    pub deltas: Vec<i8>,
}

/// Phase 3: rerun the DP over `[left_col ..= end.col] x [0 ..= end.row]`,
/// logging vertical score deltas for the traceback.
///
/// Panics if the recomputed maximum disagrees with Phase 1; that would mean
/// a kernel bug, not bad input.
pub fn phase3_recompute(
    read: &[u8],
    graph: &Graph,
    scoring: &Scoring,
    left_col: usize,
    end: &BestScore,
) -> RecomputeLog {
    let j0 = left_col;
    let width = graph.ref_window_len(left_col, end.col);
    let height = end.row + 1;

    let mut rows = [vec![0i32; width], vec![0i32; width]];
    let mut deltas = vec![0i8; height * width];
    let mut final_row = vec![0i32; width];
    let mut preds: Vec<usize> = Vec::new();

    for i in 0..height {
        let (above, current) = split_rows(&mut rows, i);

        let mut g = GraphIterFwd::from_col(graph, left_col);
        for jj in 0..width {
            let sub = scoring.substitution(read[i], g.cur_char());

            g.neighbor_offsets(&mut preds);

            let mut from_match = sub;
            let mut from_deletion = -1;
            for &k in &preds {
                // Dependencies left of the window belong to alignments that
                // cannot reach the best cell; drop them.
                if k >= j0 {
                    from_match = from_match.max(above[k - j0] + sub);
                    from_deletion = from_deletion.max(current[k - j0] - scoring.gap_del);
                }
            }

            let from_insertion = above[jj] - scoring.gap_ins;

            current[jj] = from_insertion.max(from_match).max(from_deletion).max(0);
            deltas[i * width + jj] = (current[jj] - above[jj]) as i8;

            g.next();
        }

        if i == height - 1 {
            final_row.copy_from_slice(current);
        }
    }

    let recomputed = *final_row.iter().max().expect("empty recompute window");
    assert_eq!(
        recomputed, end.score,
        "recomputed best score diverged from Phase 1"
    );
    assert_eq!(
        final_row[end.col - j0], end.score,
        "recomputed best score not at the Phase 1 end column"
    );

    RecomputeLog {
        j0,
        width,
        final_row,
        deltas,
    }
}

/// Phase 4 output.
pub struct Traceback {
    pub cigar: Cigar,
    pub start_row: usize,
    pub start_col: usize,
}

/// Phase 4: walk from the best cell up and left through the delta log,
/// emitting edit symbols. Tie-break order is match, then deletion, then
/// insertion. Panics if the finished CIGAR does not re-score to the best
/// score.
pub fn phase4_traceback(
    read: &[u8],
    graph: &Graph,
    scoring: &Scoring,
    end: &BestScore,
    log: &RecomputeLog,
) -> Traceback {
    let j0 = log.j0;
    let width = log.width;

    let mut current = log.final_row.clone();
    let mut above = vec![0i32; width];

    let mut g = GraphIterRev::from_col(graph, end.col);
    let mut preds: Vec<usize> = Vec::new();
    let mut symbols: Vec<u8> = Vec::new();

    let mut row = end.row as i64;
    let mut start_row = end.row;
    let mut start_col = end.col;

    loop {
        let col = g.global_offset() - j0;
        if row < 0 || current[col] <= 0 {
            break;
        }

        // Rebuild the row above from the vertical deltas.
        for jj in 0..width {
            above[jj] = current[jj] - log.deltas[row as usize * width + jj] as i32;
        }

        let cur_char = g.cur_char();
        let sub = scoring.substitution(read[row as usize], cur_char);

        g.neighbor_offsets(&mut preds);

        let mut from_match = sub;
        let mut from_match_pos = g.global_offset();
        for &k in &preds {
            if k >= j0 && from_match < above[k - j0] + sub {
                from_match = above[k - j0] + sub;
                from_match_pos = k;
            }
        }

        let mut from_deletion = -1;
        let mut from_deletion_pos = 0;
        for &k in &preds {
            if k >= j0 && from_deletion < current[k - j0] - scoring.gap_del {
                from_deletion = current[k - j0] - scoring.gap_del;
                from_deletion_pos = k;
            }
        }

        let from_insertion = above[col] - scoring.gap_ins;

        start_row = row as usize;
        start_col = g.global_offset();

        if current[col] == from_match {
            symbols.push(if cur_char == read[row as usize] { b'=' } else { b'X' });

            // The alignment starts at this cell.
            if from_match_pos == g.global_offset() {
                break;
            }

            g.jump(from_match_pos);
            row -= 1;
            std::mem::swap(&mut current, &mut above);
        } else if current[col] == from_deletion {
            symbols.push(b'D');
            g.jump(from_deletion_pos);
        } else {
            debug_assert_eq!(current[col], from_insertion);
            symbols.push(b'I');
            row -= 1;
            std::mem::swap(&mut current, &mut above);
        }
    }

    symbols.reverse();
    let cigar = Cigar::from_symbols(&symbols);

    assert_eq!(
        cigar.score(scoring),
        end.score as i64,
        "CIGAR does not re-score to the best alignment score"
    );

    Traceback {
        cigar,
        start_row,
        start_col,
    }
}

/// Borrow the row above and the current row out of the two-row ring.
fn split_rows(rows: &mut [Vec<i32>; 2], i: usize) -> (&mut Vec<i32>, &mut Vec<i32>) {
    let (first, second) = rows.split_at_mut(1);
    if i % 2 == 0 {
        (&mut second[0], &mut first[0])
    } else {
        (&mut first[0], &mut second[0])
    }
}
