// Parity of the vectorized Phase 1 kernels against the scalar reference on
// randomized graphs and queries. All three lane precisions and both register
// widths must report the same best scores as the scalar DP, and the full
// four-phase pipeline must hold its inter-phase assertions on every input
// (the phase 3 recompute check, the CIGAR re-score check and the reverse
// kernel's forward + 1 invariant all run inside the driver).

use rand::{rngs::StdRng, Rng, SeedableRng};

use dag_align::align::{self, AlignParams};
use dag_align::graph::Graph;
use dag_align::scoring::{Precision, Scoring, SimdWidth};

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Random DAG with shuffled vertex ids, multi-character labels and a mix of
/// short and long (ring-escaping) edges.
fn random_graph(rng: &mut StdRng, num_vertices: usize) -> Graph {
    let mut labels = Vec::with_capacity(num_vertices);
    for _ in 0..num_vertices {
        let len = rng.gen_range(1..=4);
        let label: String = (0..len)
            .map(|_| BASES[rng.gen_range(0..4)] as char)
            .collect();
        labels.push(label);
    }

    let mut edges = Vec::new();
    for v in 1..num_vertices {
        // A near predecessor keeps the graph connected; an occasional far
        // predecessor creates hops longer than the nearby-column ring.
        let near = v - 1 - rng.gen_range(0..v.min(3));
        edges.push((near, v));
        if v > 6 && rng.gen_bool(0.3) {
            edges.push((rng.gen_range(0..v - 6), v));
        }
    }

    // Shuffle vertex ids so construction has to re-sort.
    let mut perm: Vec<usize> = (0..num_vertices).collect();
    for i in (1..num_vertices).rev() {
        perm.swap(i, rng.gen_range(0..=i));
    }
    let mut shuffled_labels = vec![String::new(); num_vertices];
    for (v, label) in labels.into_iter().enumerate() {
        shuffled_labels[perm[v]] = label;
    }
    let shuffled_edges: Vec<(usize, usize)> =
        edges.iter().map(|&(u, v)| (perm[u], perm[v])).collect();

    Graph::new(shuffled_labels, &shuffled_edges).unwrap()
}

/// Sample a read along a random walk and corrupt it with point errors.
fn sample_read(rng: &mut StdRng, graph: &Graph, max_len: usize) -> String {
    let width = graph.total_ref_length();
    let mut col = rng.gen_range(0..width);
    let mut read = vec![graph.label(col)];

    while read.len() < max_len {
        let succs = graph.succs(col);
        if succs.is_empty() {
            break;
        }
        col = succs[rng.gen_range(0..succs.len())] as usize;
        read.push(graph.label(col));
    }

    // Substitutions, insertions, deletions at low rates.
    let mut corrupted = Vec::with_capacity(read.len() + 4);
    for &base in &read {
        match rng.gen_range(0..20) {
            0 => corrupted.push(BASES[rng.gen_range(0..4)]),
            1 => {
                corrupted.push(base);
                corrupted.push(BASES[rng.gen_range(0..4)]);
            }
            2 => {} // drop the base
            _ => corrupted.push(base),
        }
    }
    if corrupted.is_empty() {
        corrupted.push(b'A');
    }
    String::from_utf8(corrupted).unwrap()
}

fn random_queries(rng: &mut StdRng, graph: &Graph, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            if i % 4 == 3 {
                // Unrelated sequence; usually aligns poorly.
                let len = rng.gen_range(3..30);
                (0..len).map(|_| BASES[rng.gen_range(0..4)] as char).collect()
            } else {
                let len = rng.gen_range(4..36);
                sample_read(rng, graph, len)
            }
        })
        .collect()
}

fn check_parity(graph: &Graph, queries: &[String], scoring: Scoring) {
    let scalar = align::align_local(
        graph,
        queries,
        &AlignParams {
            scoring,
            simd: SimdWidth::None,
            precision: None,
        },
    )
    .unwrap();

    // Every precision admitted by the score bound must agree, on both
    // register widths.
    let longest = queries.iter().map(|q| q.len()).max().unwrap_or(0);
    let required = scoring.max_alignment_score(longest) + 1;

    for simd in [SimdWidth::Bits256, SimdWidth::Bits512] {
        for precision in [Precision::Byte1, Precision::Byte2, Precision::Byte4] {
            if !precision.admits(required) {
                continue;
            }
            let vector = align::align_local(
                graph,
                queries,
                &AlignParams {
                    scoring,
                    simd,
                    precision: Some(precision),
                },
            )
            .unwrap();

            for (s, v) in scalar.results.iter().zip(&vector.results) {
                assert_eq!(
                    s.score, v.score,
                    "score parity failure: width {simd}, {precision}-byte lanes, query {}",
                    s.query
                );
                assert_eq!(s.strand, v.strand, "strand choice diverged for query {}", s.query);
                assert_eq!(
                    v.cigar.score(&scoring),
                    v.score as i64,
                    "vector-path CIGAR re-score failure for query {}",
                    s.query
                );
            }
        }
    }
}

#[test]
fn parity_on_random_graphs_unit_scores() {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEFCAFEBABE);
    for round in 0..6 {
        let graph = random_graph(&mut rng, 10 + round * 8);
        let queries = random_queries(&mut rng, &graph, 24);
        check_parity(&graph, &queries, Scoring::default());
    }
}

#[test]
fn parity_with_asymmetric_scores() {
    let mut rng = StdRng::seed_from_u64(0xA5A5_5A5A_0000_0001);
    let scoring = Scoring::new(2, 3, 2, 1);
    for _ in 0..4 {
        let graph = random_graph(&mut rng, 24);
        let queries = random_queries(&mut rng, &graph, 16);
        check_parity(&graph, &queries, scoring);
    }
}

#[test]
fn parity_on_a_dense_branching_graph() {
    // Single-character vertices with fan-out, the shape that stresses the
    // first-column/edge-step distinction.
    let mut rng = StdRng::seed_from_u64(42);
    let labels: Vec<String> = (0..40)
        .map(|_| (BASES[rng.gen_range(0..4)] as char).to_string())
        .collect();
    let mut edges = Vec::new();
    for v in 1..40usize {
        edges.push((v - 1, v));
        if v >= 2 && rng.gen_bool(0.4) {
            edges.push((v - 2, v));
        }
        if v >= 12 && rng.gen_bool(0.25) {
            edges.push((v - 12, v));
        }
    }
    let graph = Graph::new(labels, &edges).unwrap();

    let queries = random_queries(&mut rng, &graph, 32);
    check_parity(&graph, &queries, Scoring::default());
}

#[test]
fn parity_with_wide_lanes_on_long_queries() {
    // Queries past the 1-byte score bound force the 2-byte lanes in auto
    // selection; the 4-byte lanes must agree as well.
    let mut rng = StdRng::seed_from_u64(7);
    let graph = random_graph(&mut rng, 60);
    let queries: Vec<String> = (0..8).map(|_| sample_read(&mut rng, &graph, 160)).collect();

    check_parity(&graph, &queries, Scoring::default());
}

#[test]
fn repeated_runs_are_identical() {
    let mut rng = StdRng::seed_from_u64(99);
    let graph = random_graph(&mut rng, 30);
    let queries = random_queries(&mut rng, &graph, 12);

    let params = AlignParams {
        scoring: Scoring::default(),
        simd: SimdWidth::Bits512,
        precision: None,
    };
    let a = align::align_local(&graph, &queries, &params).unwrap();
    let b = align::align_local(&graph, &queries, &params).unwrap();

    for (x, y) in a.results.iter().zip(&b.results) {
        assert_eq!(x.score, y.score);
        assert_eq!((x.start_row, x.start_col), (y.start_row, y.start_col));
        assert_eq!((x.end_row, x.end_col), (y.end_row, y.end_col));
        assert_eq!(x.cigar, y.cigar);
    }
}
