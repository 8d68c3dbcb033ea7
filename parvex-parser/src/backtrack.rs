use log::debug;
use parvex_automaton::EdgeStream;
use parvex_data::{DataFile, VertexId, VertexKind};

use crate::{
    graph::EdgeKind,
    succ::{self, Successor},
    tree::{fold_events, TreeEvent},
    ParseTree, ResolveError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    vertex: VertexId,
    offset: usize,
}

#[derive(Debug, Clone)]
struct Parser {
    offset: usize,
    vertex: VertexId,
    stack: Vec<Frame>,
    events: Vec<TreeEvent>,
}

impl Parser {
    fn apply(&mut self, successor: Successor) {
        self.vertex = successor.vertex;
        if successor.kind == EdgeKind::Char {
            self.offset += 1;
        }
    }
}

/// Depth-first, priority-ordered search for one well-nested path through
/// the edge stream. Alternatives branch into cloned parsers on a LIFO work
/// list; the highest-priority successor is pursued first and better-ranked
/// alternatives are retried before worse ones after a discard.
pub struct BacktrackResolver<'a> {
    data: &'a DataFile,
    stream: &'a EdgeStream,
}

impl<'a> BacktrackResolver<'a> {
    pub fn new(data: &'a DataFile, stream: &'a EdgeStream) -> BacktrackResolver<'a> {
        BacktrackResolver { data, stream }
    }

    pub fn resolve(&self) -> Result<Vec<ParseTree>, ResolveError> {
        let mut work = vec![Parser {
            offset: 0,
            vertex: self.data.start_vertex(),
            stack: Vec::new(),
            events: Vec::new(),
        }];
        let mut spawned: usize = 0;
        let mut discarded: usize = 0;
        while let Some(mut parser) = work.pop() {
            loop {
                let vertex = parser.vertex;
                let info = self.data.vertex(vertex);
                match info.kind() {
                    Some(VertexKind::Start) | Some(VertexKind::If) => {
                        // An unpaired bracket can never be closed; no pairing
                        // is guessed.
                        if info.with().is_none() {
                            break;
                        }
                        if info.kind() == Some(VertexKind::Start) {
                            parser.events.push(TreeEvent::Open { vertex });
                        }
                        parser.stack.push(Frame {
                            vertex,
                            offset: parser.offset,
                        });
                    }
                    Some(VertexKind::Final) | Some(VertexKind::Fi) => {
                        let top = match parser.stack.last() {
                            Some(&frame)
                                if self.data.vertex(frame.vertex).with() == Some(vertex) =>
                            {
                                frame
                            }
                            _ => break,
                        };
                        parser.stack.pop();
                        if info.kind() == Some(VertexKind::Final) {
                            parser.events.push(TreeEvent::Close {
                                start: top.offset,
                                end: parser.offset,
                            });
                        }
                    }
                    None => {}
                }
                if vertex == self.data.final_vertex()
                    && parser.offset + 1 >= self.stream.len()
                    && parser.stack.is_empty()
                {
                    debug!(
                        "backtrack resolver accepted after {} spawns, {} discards",
                        spawned, discarded
                    );
                    return Ok(fold_events(self.data, &parser.events));
                }
                let successors = succ::gather(self.data, self.stream, vertex, parser.offset);
                let Some((&best, alternatives)) = successors.split_first() else {
                    break;
                };
                for &alternative in alternatives.iter().rev() {
                    let mut branch = parser.clone();
                    branch.apply(alternative);
                    work.push(branch);
                    spawned += 1;
                }
                parser.apply(best);
            }
            discarded += 1;
        }
        debug!(
            "backtrack resolver exhausted the frontier after {} spawns, {} discards",
            spawned, discarded
        );
        Err(ResolveError::NoParseTree)
    }
}
