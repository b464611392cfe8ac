// End-to-end alignment scenarios on small graphs, exercised through the
// scalar driver (exact locations and CIGARs are asserted against hand-computed
// DP matrices) and cross-checked against both vector widths for score parity.

use dag_align::align::{self, AlignError, AlignParams, AlignmentResult, Strand};
use dag_align::graph::Graph;
use dag_align::scoring::{Precision, Scoring, SimdWidth};

fn labels(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
}

fn queries(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
}

fn scalar_params() -> AlignParams {
    AlignParams {
        scoring: Scoring::default(),
        simd: SimdWidth::None,
        precision: None,
    }
}

/// Align through the scalar driver, asserting score parity against both
/// vector widths on the way.
fn align_all_paths(graph: &Graph, qs: &[String]) -> Vec<AlignmentResult> {
    let scalar = align::align_local(graph, qs, &scalar_params()).unwrap();

    for simd in [SimdWidth::Bits256, SimdWidth::Bits512] {
        let params = AlignParams {
            scoring: Scoring::default(),
            simd,
            precision: None,
        };
        let vector = align::align_local(graph, qs, &params).unwrap();
        for (s, v) in scalar.results.iter().zip(&vector.results) {
            assert_eq!(
                s.score, v.score,
                "scalar/vector score mismatch at width {simd} for query {}",
                s.query
            );
            assert_eq!(
                v.cigar.score(&Scoring::default()),
                v.score as i64,
                "vector-path CIGAR does not re-score at width {simd}"
            );
        }
    }

    scalar.results
}

#[test]
fn exact_match_on_linear_graph() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&["ACGT"]));

    let r = &results[0];
    assert_eq!(r.score, 4);
    assert_eq!((r.start_row, r.start_col), (0, 0));
    assert_eq!((r.end_row, r.end_col), (3, 3));
    assert_eq!(r.cigar.to_string(), "4=");
}

#[test]
fn branch_match_takes_the_right_arm() {
    // A -> {C, G}; the query follows the A -> G arm.
    let graph = Graph::new(labels(&["A", "C", "G"]), &[(0, 1), (0, 2)]).unwrap();
    let results = align_all_paths(&graph, &queries(&["AG"]));

    let r = &results[0];
    assert_eq!(r.score, 2);
    assert_eq!(r.strand, Strand::Forward);
    assert_eq!(r.end_col, 2, "alignment must end on the G vertex's column");
    assert_eq!(r.vid_end, 2);
    assert_eq!(r.cigar.to_string(), "2=");
}

#[test]
fn single_mismatch_is_tolerated() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&["ACCT"]));

    // Both strands score 2 (ACCT's "AC" prefix, AGGT's "GT" suffix), so the
    // reverse complement wins the tie and the scalar driver keeps its first
    // maximum, the "GT" match ending the read.
    let r = &results[0];
    assert_eq!(r.score, 2);
    assert_eq!(r.strand, Strand::Reverse);
    assert_eq!((r.end_row, r.end_col), (3, 3));
    assert_eq!((r.start_row, r.start_col), (2, 2));
    assert_eq!(r.cigar.to_string(), "2=");
}

#[test]
fn shortcut_edge_beats_deletion() {
    // A -> {T, G} with a direct edge to G: the walk A,G matches exactly.
    let graph = Graph::new(labels(&["A", "T", "G"]), &[(0, 1), (0, 2)]).unwrap();
    let results = align_all_paths(&graph, &queries(&["AG"]));

    let r = &results[0];
    assert_eq!(r.score, 2);
    assert_eq!((r.end_row, r.end_col), (1, 2));
    assert_eq!(r.cigar.to_string(), "2=");
}

#[test]
fn chain_without_shortcut_pays_for_the_deletion() {
    // A -> T -> G and query AG: deleting T scores 1, which ties a bare
    // single-character match; the restart wins the traceback tie-break.
    let graph = Graph::new(labels(&["A", "T", "G"]), &[(0, 1), (1, 2)]).unwrap();
    let results = align_all_paths(&graph, &queries(&["AG"]));

    let r = &results[0];
    assert_eq!(r.score, 1);
    assert_eq!(r.cigar.to_string(), "1=");
    assert_eq!(r.cigar.score(&Scoring::default()), 1);
}

#[test]
fn foreign_character_forces_an_insertion() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&["ACXGT"]));

    let r = &results[0];
    assert_eq!(r.score, 3);
    assert_eq!(r.cigar.to_string(), "2=1I2=");
    assert_eq!((r.start_row, r.start_col), (0, 0));
    assert_eq!((r.end_row, r.end_col), (4, 3));
}

#[test]
fn reverse_complement_strand_wins() {
    // ACGA forward scores 3 (ACG); its reverse complement TCGT also scores 3
    // (CGT); the reverse strand wins ties.
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&["ACGA"]));

    let r = &results[0];
    assert_eq!(r.score, 3);
    assert_eq!(r.strand, Strand::Reverse);
    assert_eq!(r.cigar.to_string(), "3=");
    assert_eq!(r.cigar.score(&Scoring::default()), 3);
}

#[test]
fn strand_results_mirror_under_reverse_complement() {
    // On the branch graph the walk AC exists but its reverse complement GT
    // does not, so the strand choice is forced either way.
    let graph = Graph::new(labels(&["A", "C", "G"]), &[(0, 1), (0, 2)]).unwrap();
    let results = align_all_paths(&graph, &queries(&["AC", "GT"]));

    let fwd = &results[0];
    let rev = &results[1];
    assert_eq!(fwd.score, 2);
    assert_eq!(rev.score, 2);
    assert_eq!(fwd.strand, Strand::Forward);
    assert_eq!(rev.strand, Strand::Reverse);
    // Same alignment of the same effective sequence.
    assert_eq!((fwd.start_row, fwd.start_col), (rev.start_row, rev.start_col));
    assert_eq!((fwd.end_row, fwd.end_col), (rev.end_row, rev.end_col));
    assert_eq!(fwd.cigar, rev.cigar);
}

#[test]
fn unalignable_query_reports_zero() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&["BBBB"]));

    let r = &results[0];
    assert_eq!(r.score, 0);
    assert!(r.cigar.is_empty());
    assert_eq!(r.cigar.to_string(), "*");
}

#[test]
fn empty_query_reports_zero() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let results = align_all_paths(&graph, &queries(&[""]));
    assert_eq!(results[0].score, 0);
}

#[test]
fn alignment_is_deterministic() {
    let graph = Graph::new(
        labels(&["ACG", "T", "GG", "CA"]),
        &[(0, 1), (0, 2), (1, 3), (2, 3)],
    )
    .unwrap();
    let qs = queries(&["ACGTCA", "GGCA", "TTTT", "ACGGGCA"]);

    let a = align::align_local(&graph, &qs, &scalar_params()).unwrap();
    let b = align::align_local(&graph, &qs, &scalar_params()).unwrap();

    for (x, y) in a.results.iter().zip(&b.results) {
        assert_eq!(x.score, y.score);
        assert_eq!(x.strand, y.strand);
        assert_eq!((x.start_row, x.start_col), (y.start_row, y.start_col));
        assert_eq!((x.end_row, x.end_col), (y.end_row, y.end_col));
        assert_eq!(x.cigar, y.cigar);
    }
}

#[test]
fn alignment_span_respects_the_reference_budget() {
    let scoring = Scoring::default();
    let graph = Graph::new(labels(&["ACGTACGTACGTACGT"]), &[]).unwrap();
    let qs = queries(&["ACGT", "ACGTACG", "TACG", "CGTACGTA"]);
    let results = align_all_paths(&graph, &qs);

    for (q, r) in qs.iter().zip(&results) {
        if r.score > 0 {
            assert!(
                r.end_col - r.start_col + 1 <= scoring.max_ref_span(q.len()),
                "span of query {} exceeds the reference budget",
                r.query
            );
            // On a linear graph the walk covers every column it spans.
            assert_eq!(r.cigar.ref_span(), r.end_col - r.start_col + 1);
        }
    }
}

#[test]
fn zero_penalties_are_rejected() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let params = AlignParams {
        scoring: Scoring::new(1, 0, 1, 1),
        simd: SimdWidth::None,
        precision: None,
    };
    let err = align::align_local(&graph, &queries(&["ACGT"]), &params).unwrap_err();
    assert!(matches!(err, AlignError::InvalidScoring));
}

#[test]
fn forced_narrow_precision_is_rejected_for_long_queries() {
    let graph = Graph::new(labels(&["ACGT"]), &[]).unwrap();
    let long_query: String = "ACGT".repeat(64); // 256 characters
    let params = AlignParams {
        scoring: Scoring::default(),
        simd: SimdWidth::Bits512,
        precision: Some(Precision::Byte1),
    };
    let err = align::align_local(&graph, &[long_query], &params).unwrap_err();
    assert!(matches!(err, AlignError::PrecisionOverflow { .. }));
}
