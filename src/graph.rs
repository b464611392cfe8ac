//! Reference graph in compressed sparse row form.
//!
//! The graph is a vertex-labelled DAG. After construction the vertices are
//! renumbered by a topological sort so every edge points forward, and the
//! vertex labels are flattened into one character array. DP code indexes the
//! graph by *global column* (a character position in that flattened array);
//! the CSR adjacency is kept at column granularity in both directions so the
//! forward and reverse kernels can stream predecessor and successor columns
//! without touching vertex records.

use std::fmt;

use crate::seq;

/// Invariant violations detected while building a graph.
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    /// The edge set contains a cycle; no topological order exists.
    Cycle,
    /// An edge joins a vertex to itself.
    SelfLoop { vertex: usize },
    /// A vertex label is empty.
    EmptyLabel { vertex: usize },
    /// A vertex label contains a character outside `{A,C,G,T,N}`.
    InvalidLabel { vertex: usize },
    /// An edge endpoint does not name a vertex.
    VertexOutOfRange { vertex: usize, count: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Cycle => write!(f, "graph contains a cycle"),
            GraphError::SelfLoop { vertex } => write!(f, "self-loop at vertex {vertex}"),
            GraphError::EmptyLabel { vertex } => write!(f, "empty label at vertex {vertex}"),
            GraphError::InvalidLabel { vertex } => {
                write!(f, "label at vertex {vertex} is not uppercase DNA")
            }
            GraphError::VertexOutOfRange { vertex, count } => {
                write!(f, "edge endpoint {vertex} out of range (graph has {count} vertices)")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Topologically sorted, character-granular CSR graph.
#[derive(Debug)]
pub struct Graph {
    num_vertices: usize,
    num_edges: usize,
    /// Vertex labels in sorted order (kept for reporting).
    vertex_labels: Vec<String>,
    /// First column of each vertex; one extra entry holding the total length.
    vertex_start: Vec<u32>,
    /// Owning vertex of each column.
    vertex_of_col: Vec<u32>,
    /// Flattened reference characters, one per column.
    labels: Vec<u8>,
    offsets_in: Vec<u32>,
    adjcny_in: Vec<u32>,
    offsets_out: Vec<u32>,
    adjcny_out: Vec<u32>,
}

impl Graph {
    /// Build a graph from per-vertex labels and a directed edge list.
    ///
    /// Edges are deduplicated. Fails on self-loops, cycles, dangling edge
    /// endpoints and labels that are empty or not uppercase DNA.
    pub fn new(vertex_labels: Vec<String>, edges: &[(usize, usize)]) -> Result<Graph, GraphError> {
        let n = vertex_labels.len();

        for (v, label) in vertex_labels.iter().enumerate() {
            if label.is_empty() {
                return Err(GraphError::EmptyLabel { vertex: v });
            }
            if !seq::is_dna(label) {
                return Err(GraphError::InvalidLabel { vertex: v });
            }
        }

        let mut edge_list: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
        for &(u, v) in edges {
            if u >= n {
                return Err(GraphError::VertexOutOfRange { vertex: u, count: n });
            }
            if v >= n {
                return Err(GraphError::VertexOutOfRange { vertex: v, count: n });
            }
            if u == v {
                return Err(GraphError::SelfLoop { vertex: u });
            }
            edge_list.push((u, v));
        }
        edge_list.sort_unstable();
        edge_list.dedup();

        let order = topological_order(n, &edge_list)?;

        // rank[old id] = new id
        let mut rank = vec![0usize; n];
        for (new_id, &old_id) in order.iter().enumerate() {
            rank[old_id] = new_id;
        }

        let mut sorted_labels = vec![String::new(); n];
        for (old_id, label) in vertex_labels.into_iter().enumerate() {
            sorted_labels[rank[old_id]] = label;
        }

        let mut sorted_edges: Vec<(usize, usize)> = edge_list
            .iter()
            .map(|&(u, v)| (rank[u], rank[v]))
            .collect();
        sorted_edges.sort_unstable();

        let mut graph = Graph::assemble(sorted_labels, &sorted_edges);
        graph.num_edges = sorted_edges.len();
        debug_assert!(graph.verify());
        Ok(graph)
    }

    /// Lay out columns and both CSR directions for an already-sorted graph.
    fn assemble(vertex_labels: Vec<String>, edges: &[(usize, usize)]) -> Graph {
        let n = vertex_labels.len();

        let mut vertex_start = Vec::with_capacity(n + 1);
        let mut labels = Vec::new();
        let mut vertex_of_col = Vec::new();
        for (v, label) in vertex_labels.iter().enumerate() {
            vertex_start.push(labels.len() as u32);
            labels.extend_from_slice(label.as_bytes());
            vertex_of_col.resize(labels.len(), v as u32);
        }
        let width = labels.len();
        vertex_start.push(width as u32);

        // In-neighbours per vertex, used only for the first column of each
        // vertex; interior columns depend on column - 1 alone.
        let mut vertex_in: Vec<Vec<u32>> = vec![Vec::new(); n];
        let mut vertex_out: Vec<Vec<u32>> = vec![Vec::new(); n];
        for &(u, v) in edges {
            // Predecessor column of v's first character is u's last character.
            vertex_in[v].push(vertex_start[u + 1] - 1);
            vertex_out[u].push(vertex_start[v]);
        }
        for list in vertex_in.iter_mut().chain(vertex_out.iter_mut()) {
            list.sort_unstable();
        }

        let mut offsets_in = Vec::with_capacity(width + 1);
        let mut adjcny_in = Vec::new();
        let mut offsets_out = Vec::with_capacity(width + 1);
        let mut adjcny_out = Vec::new();

        for j in 0..width {
            offsets_in.push(adjcny_in.len() as u32);
            let v = vertex_of_col[j] as usize;
            if j as u32 == vertex_start[v] {
                adjcny_in.extend_from_slice(&vertex_in[v]);
            } else {
                adjcny_in.push(j as u32 - 1);
            }
        }
        offsets_in.push(adjcny_in.len() as u32);

        for j in 0..width {
            offsets_out.push(adjcny_out.len() as u32);
            let v = vertex_of_col[j] as usize;
            if j as u32 == vertex_start[v + 1] - 1 {
                adjcny_out.extend_from_slice(&vertex_out[v]);
            } else {
                adjcny_out.push(j as u32 + 1);
            }
        }
        offsets_out.push(adjcny_out.len() as u32);

        Graph {
            num_vertices: n,
            num_edges: 0,
            vertex_labels,
            vertex_start,
            vertex_of_col,
            labels,
            offsets_in,
            adjcny_in,
            offsets_out,
            adjcny_out,
        }
    }

    /// Check the CSR ordering contract: every predecessor column is strictly
    /// smaller than its successor, in both directions.
    pub fn verify(&self) -> bool {
        let width = self.labels.len();
        for j in 0..width {
            if self.preds(j).iter().any(|&k| k as usize >= j) {
                return false;
            }
            if self.succs(j).iter().any(|&k| k as usize <= j) {
                return false;
            }
        }
        true
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Total length of the flattened reference (the DP width W).
    #[inline]
    pub fn total_ref_length(&self) -> usize {
        self.labels.len()
    }

    /// Width of the DP window spanning `[left_col, right_col]`.
    #[inline]
    pub fn ref_window_len(&self, left_col: usize, right_col: usize) -> usize {
        debug_assert!(left_col <= right_col);
        right_col - left_col + 1
    }

    #[inline(always)]
    pub fn label(&self, col: usize) -> u8 {
        self.labels[col]
    }

    #[inline(always)]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Predecessor columns of `col` in the DP dependency order.
    #[inline(always)]
    pub fn preds(&self, col: usize) -> &[u32] {
        &self.adjcny_in[self.offsets_in[col] as usize..self.offsets_in[col + 1] as usize]
    }

    /// Successor columns of `col`.
    #[inline(always)]
    pub fn succs(&self, col: usize) -> &[u32] {
        &self.adjcny_out[self.offsets_out[col] as usize..self.offsets_out[col + 1] as usize]
    }

    #[inline(always)]
    pub fn vertex_of_col(&self, col: usize) -> usize {
        self.vertex_of_col[col] as usize
    }

    #[inline(always)]
    pub fn first_col_of(&self, vertex: usize) -> usize {
        self.vertex_start[vertex] as usize
    }

    #[inline(always)]
    pub fn last_col_of(&self, vertex: usize) -> usize {
        self.vertex_start[vertex + 1] as usize - 1
    }

    pub fn vertex_label(&self, vertex: usize) -> &str {
        &self.vertex_labels[vertex]
    }

    /// Smallest column reachable by a backward walk from `end_col` touching
    /// at most `max_distance` reference characters (both endpoints counted).
    /// Bounds the Phase 3 recompute window.
    pub fn left_most_reachable_col(&self, end_col: usize, max_distance: usize) -> usize {
        let mut dist = vec![u32::MAX; end_col + 1];
        dist[end_col] = 1;
        let mut leftmost = end_col;

        for c in (0..=end_col).rev() {
            let d = dist[c];
            if d == u32::MAX || d as usize > max_distance {
                continue;
            }
            if c < leftmost {
                leftmost = c;
            }
            if (d as usize) < max_distance {
                for &p in self.preds(c) {
                    let p = p as usize;
                    if dist[p] > d + 1 {
                        dist[p] = d + 1;
                    }
                }
            }
        }
        leftmost
    }
}

/// Kahn's algorithm over the vertex-level edge list. The candidate queue is
/// kept sorted so equal inputs always produce the same order.
fn topological_order(n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, GraphError> {
    let mut in_degree = vec![0usize; n];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(u, v) in edges {
        in_degree[v] += 1;
        out[u].push(v);
    }

    let mut ready: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    ready.sort_unstable_by(|a, b| b.cmp(a));

    let mut order = Vec::with_capacity(n);
    while let Some(v) = ready.pop() {
        order.push(v);
        for &w in &out[v] {
            in_degree[w] -= 1;
            if in_degree[w] == 0 {
                // Insert keeping the stack sorted descending, so the
                // smallest candidate pops first.
                let pos = ready.partition_point(|&x| x > w);
                ready.insert(pos, w);
            }
        }
    }

    if order.len() != n {
        return Err(GraphError::Cycle);
    }
    Ok(order)
}
