//! Plain-text graph loader.
//!
//! Format: the first line holds the vertex count; each following line
//! describes one vertex as whitespace-separated out-neighbor ids followed by
//! the vertex label. Vertex ids refer to line order (0-based).
//!
//! ```text
//! 3
//! 1 2 ACGT
//! T
//! GGA
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::graph::{Graph, GraphError};
use crate::seq;

#[derive(Debug)]
pub enum LoadError {
    /// Graph file missing or unreadable.
    Io(io::Error),
    /// Malformed line in the text format.
    Parse { line: usize, msg: String },
    /// The described graph violates a structural invariant.
    Graph(GraphError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "I/O error: {err}"),
            LoadError::Parse { line, msg } => write!(f, "parse error at line {line}: {msg}"),
            LoadError::Graph(err) => write!(f, "invalid graph: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Graph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl From<GraphError> for LoadError {
    fn from(err: GraphError) -> Self {
        LoadError::Graph(err)
    }
}

/// Load and topologically sort a graph from the text format.
pub fn load_txt(path: &Path) -> Result<Graph, LoadError> {
    let file = File::open(path)?;
    load_txt_from(BufReader::new(file))
}

/// Same as [`load_txt`] over any buffered reader (used by tests).
pub fn load_txt_from<R: BufRead>(reader: R) -> Result<Graph, LoadError> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(LoadError::Parse {
                line: 1,
                msg: "empty file".to_string(),
            })
        }
    };
    let total_vertices: usize = header.trim().parse().map_err(|_| LoadError::Parse {
        line: 1,
        msg: format!("expected vertex count, got '{}'", header.trim()),
    })?;

    let mut labels = Vec::with_capacity(total_vertices);
    let mut edges = Vec::new();
    let mut line_no = 1usize;

    for line in lines {
        let line = line?;
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let vertex = labels.len();
        if vertex >= total_vertices {
            return Err(LoadError::Parse {
                line: line_no,
                msg: format!("more vertex lines than the declared count {total_vertices}"),
            });
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        // Last token is the label, everything before it an out-neighbor id.
        let (label, neighbors) = tokens.split_last().ok_or_else(|| LoadError::Parse {
            line: line_no,
            msg: "missing vertex label".to_string(),
        })?;

        for tok in neighbors {
            let to: usize = tok.parse().map_err(|_| LoadError::Parse {
                line: line_no,
                msg: format!("invalid out-neighbor id '{tok}'"),
            })?;
            edges.push((vertex, to));
        }

        let mut label = label.to_string();
        seq::make_upper_case(&mut label);
        labels.push(label);
    }

    if labels.len() != total_vertices {
        return Err(LoadError::Parse {
            line: line_no,
            msg: format!(
                "declared {} vertices but found {}",
                total_vertices,
                labels.len()
            ),
        });
    }

    Ok(Graph::new(labels, &edges)?)
}
