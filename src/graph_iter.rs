//! Cursors over the flattened reference.
//!
//! The iterators hide the difference between an intra-vertex step (column
//! minus/plus one) and an edge step (multiple neighbor columns): callers see
//! one character per position and a uniform neighbor-offset list.

use crate::graph::Graph;

/// Forward walk over global columns.
pub struct GraphIterFwd<'a> {
    graph: &'a Graph,
    col: usize,
}

impl<'a> GraphIterFwd<'a> {
    /// Cursor at column 0.
    pub fn new(graph: &'a Graph) -> Self {
        GraphIterFwd { graph, col: 0 }
    }

    /// Cursor at the first column of `vertex`.
    pub fn from_vertex(graph: &'a Graph, vertex: usize) -> Self {
        GraphIterFwd {
            graph,
            col: graph.first_col_of(vertex),
        }
    }

    /// Cursor at an arbitrary column.
    pub fn from_col(graph: &'a Graph, col: usize) -> Self {
        GraphIterFwd { graph, col }
    }

    #[inline(always)]
    pub fn cur_char(&self) -> u8 {
        self.graph.label(self.col)
    }

    #[inline(always)]
    pub fn global_offset(&self) -> usize {
        self.col
    }

    #[inline(always)]
    pub fn current_vertex(&self) -> usize {
        self.graph.vertex_of_col(self.col)
    }

    /// Predecessor columns of the current position.
    #[inline]
    pub fn neighbor_offsets(&self, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.graph.preds(self.col).iter().map(|&k| k as usize));
    }

    #[inline(always)]
    pub fn next(&mut self) {
        self.col += 1;
    }

    #[inline(always)]
    pub fn jump(&mut self, col: usize) {
        self.col = col;
    }

    #[inline(always)]
    pub fn at_end(&self) -> bool {
        self.col >= self.graph.total_ref_length()
    }
}

/// Reverse walk over global columns, used by the traceback.
pub struct GraphIterRev<'a> {
    graph: &'a Graph,
    col: usize,
}

impl<'a> GraphIterRev<'a> {
    /// Cursor at an arbitrary column (typically the alignment end).
    pub fn from_col(graph: &'a Graph, col: usize) -> Self {
        GraphIterRev { graph, col }
    }

    #[inline(always)]
    pub fn cur_char(&self) -> u8 {
        self.graph.label(self.col)
    }

    #[inline(always)]
    pub fn global_offset(&self) -> usize {
        self.col
    }

    #[inline(always)]
    pub fn current_vertex(&self) -> usize {
        self.graph.vertex_of_col(self.col)
    }

    /// Predecessor columns of the current position (the cells the traceback
    /// may move to).
    #[inline]
    pub fn neighbor_offsets(&self, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.graph.preds(self.col).iter().map(|&k| k as usize));
    }

    /// Move to a specific predecessor column.
    #[inline(always)]
    pub fn jump(&mut self, col: usize) {
        self.col = col;
    }
}
