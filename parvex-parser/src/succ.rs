use parvex_automaton::EdgeStream;
use parvex_data::{DataFile, VertexId};

use crate::graph::EdgeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Successor {
    pub vertex: VertexId,
    pub kind: EdgeKind,
}

/// Successors of `vertex` in the edge set at `offset`: null edges listed
/// before char edges, then stably sorted ascending by the target vertex's
/// sort key, so null successors still precede char successors on ties.
pub(crate) fn gather(
    data: &DataFile,
    stream: &EdgeStream,
    vertex: VertexId,
    offset: usize,
) -> Vec<Successor> {
    let mut successors = Vec::new();
    if offset >= stream.len() {
        return successors;
    }
    let edge_set = stream.get(offset);
    for &(from, to) in data.null_edges(edge_set) {
        if from == vertex {
            successors.push(Successor {
                vertex: to,
                kind: EdgeKind::Null,
            });
        }
    }
    for &(from, to) in data.char_edges(edge_set) {
        if from == vertex {
            successors.push(Successor {
                vertex: to,
                kind: EdgeKind::Char,
            });
        }
    }
    successors.sort_by_key(|successor| data.vertex(successor.vertex).sort_key());
    successors
}
