use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, trace};
use parvex_automaton::EdgeStream;
use parvex_data::{DataFile, VertexId, VertexKind};
use petgraph::{graphmap::DiGraphMap, Direction::Incoming};

use crate::{
    graph::{EdgeKind, ParseGraph, ParseNode},
    succ::{self, Successor},
    tree::{fold_events, TreeEvent},
    ParseTree, ResolveError,
};

/// How vertices are keyed in the stack graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackMode {
    /// Stack-graph nodes are parse-graph nodes. Required for tree
    /// extraction.
    #[default]
    Exact,
    /// Nodes are projected through `stack_vertex`, collapsing vertices on
    /// non-recursive paths to one representative. Recognition only.
    Projected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub trees: Vec<ParseTree>,
    /// More than one witness path survived the stack-graph filter at some
    /// point of the walk. Informational; does not affect acceptance.
    pub ambiguous: bool,
}

/// An edge `u -> v` means "while processing `v`, a most recently pushed
/// value is `u`"; predecessors of a node are its possible tops of stack.
type StackGraph = DiGraphMap<ParseNode, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WalkFrame {
    vertex: VertexId,
    column: usize,
}

#[derive(Debug, Clone)]
struct Walker {
    column: usize,
    vertex: VertexId,
    stack: Vec<WalkFrame>,
    events: Vec<TreeEvent>,
    seen: HashSet<(usize, VertexId, usize)>,
}

impl Walker {
    fn step(&mut self, successor: Successor) {
        self.vertex = successor.vertex;
        if successor.kind == EdgeKind::Char {
            self.column += 1;
        }
    }
}

/// Non-deterministic pushdown simulation over the edge stream. All live
/// alternatives advance column by column; the set of possible stacks is
/// shared between them as a stack graph instead of being enumerated.
pub struct ParallelResolver<'a> {
    data: &'a DataFile,
    stream: &'a EdgeStream,
}

impl<'a> ParallelResolver<'a> {
    pub fn new(data: &'a DataFile, stream: &'a EdgeStream) -> ParallelResolver<'a> {
        ParallelResolver { data, stream }
    }

    /// Acceptance test: the input matches iff the stack graph relates the
    /// start vertex at column 0 to the final vertex at the last column and
    /// the parse graph connects the two.
    pub fn recognize(&self, mode: StackMode) -> bool {
        let graph = ParseGraph::build(self.data, self.stream);
        if !graph.connects() {
            debug!("parallel resolver: parse graph does not connect");
            return false;
        }
        let stacks = self.simulate(mode);
        let accepted = stacks.contains_edge(
            self.project(mode, graph.root()),
            self.project(mode, graph.target()),
        );
        debug!(
            "parallel resolver: accepted={}, {} stack edges",
            accepted,
            stacks.edge_count()
        );
        accepted
    }

    /// Extracts one witness tree from an accepted input by walking the
    /// parse graph filtered through the stack graph.
    pub fn resolve(&self) -> Result<Resolution, ResolveError> {
        let graph = ParseGraph::build(self.data, self.stream);
        if !graph.connects() {
            return Err(ResolveError::NoParseTree);
        }
        let stacks = self.simulate(StackMode::Exact);
        if !stacks.contains_edge(graph.root(), graph.target()) {
            return Err(ResolveError::NoParseTree);
        }
        self.extract(&stacks)
    }

    fn project(&self, mode: StackMode, node: ParseNode) -> ParseNode {
        match mode {
            StackMode::Exact => node,
            StackMode::Projected => (
                node.0,
                self.data.vertex(node.1).stack_vertex().unwrap_or(node.1),
            ),
        }
    }

    /// One pass over all columns. Within a column, vertices are processed
    /// from the heads through the local null subgraph; a vertex is
    /// revisited whenever a new stack edge reaches one of its successors,
    /// which handles both null cycles and right recursion.
    fn simulate(&self, mode: StackMode) -> StackGraph {
        let data = self.data;
        let mut stacks = StackGraph::new();
        let mut heads: HashSet<ParseNode> = HashSet::new();
        heads.insert((0, data.start_vertex()));
        for column in 0..self.stream.len() {
            let edge_set = self.stream.get(column);
            let mut null_out: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
            let mut char_out: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
            for &(from, to) in data.null_edges(edge_set) {
                null_out.entry(from).or_default().push(to);
            }
            for &(from, to) in data.char_edges(edge_set) {
                char_out.entry(from).or_default().push(to);
            }
            let mut queue: VecDeque<VertexId> = heads
                .iter()
                .filter(|&&(c, _)| c == column)
                .map(|&(_, vertex)| vertex)
                .collect();
            let mut queued: HashSet<VertexId> = queue.iter().copied().collect();
            let mut reached: HashSet<VertexId> = HashSet::new();
            while let Some(vertex) = queue.pop_front() {
                queued.remove(&vertex);
                reached.insert(vertex);
                let node = self.project(mode, (column, vertex));
                let mut successors: Vec<(VertexId, usize)> = Vec::new();
                if let Some(targets) = null_out.get(&vertex) {
                    successors.extend(targets.iter().map(|&to| (to, column)));
                }
                if let Some(targets) = char_out.get(&vertex) {
                    successors.extend(targets.iter().map(|&to| (to, column + 1)));
                }
                let mut changed: Vec<VertexId> = Vec::new();
                match data.vertex(vertex).kind() {
                    Some(VertexKind::Start) | Some(VertexKind::If) => {
                        // push: the vertex itself becomes the top of stack
                        // for every successor
                        for &(succ_vertex, succ_column) in &successors {
                            let succ_node = self.project(mode, (succ_column, succ_vertex));
                            if stacks.add_edge(node, succ_node, ()).is_none()
                                && succ_column == column
                            {
                                changed.push(succ_vertex);
                            }
                        }
                    }
                    Some(VertexKind::Final) | Some(VertexKind::Fi) => {
                        // pop: tops whose partner does not match are cut off,
                        // matching tops expose the stack below to the
                        // successors
                        let tops = incoming(&stacks, node);
                        for top in tops {
                            if data.vertex(top.1).with() != Some(vertex) {
                                stacks.remove_edge(top, node);
                                continue;
                            }
                            let below = incoming(&stacks, top);
                            for &(succ_vertex, succ_column) in &successors {
                                let succ_node = self.project(mode, (succ_column, succ_vertex));
                                for &under in &below {
                                    if stacks.add_edge(under, succ_node, ()).is_none()
                                        && succ_column == column
                                    {
                                        changed.push(succ_vertex);
                                    }
                                }
                            }
                        }
                    }
                    None => {
                        // plain vertex: every possible top of stack carries
                        // over to the successors
                        let tops = incoming(&stacks, node);
                        for &(succ_vertex, succ_column) in &successors {
                            let succ_node = self.project(mode, (succ_column, succ_vertex));
                            for &top in &tops {
                                if stacks.add_edge(top, succ_node, ()).is_none()
                                    && succ_column == column
                                {
                                    changed.push(succ_vertex);
                                }
                            }
                        }
                    }
                }
                for succ_vertex in changed {
                    if queued.insert(succ_vertex) {
                        queue.push_back(succ_vertex);
                    }
                }
            }
            let mut next_heads = HashSet::new();
            for vertex in &reached {
                if let Some(targets) = char_out.get(vertex) {
                    for &to in targets {
                        next_heads.insert((column + 1, to));
                    }
                }
            }
            trace!(
                "column {}: {} vertices reached, {} heads forward",
                column,
                reached.len(),
                next_heads.len()
            );
            heads = next_heads;
        }
        stacks
    }

    fn extract(&self, stacks: &StackGraph) -> Result<Resolution, ResolveError> {
        let mut ambiguous = false;
        let mut work = vec![Walker {
            column: 0,
            vertex: self.data.start_vertex(),
            stack: Vec::new(),
            events: Vec::new(),
            seen: HashSet::new(),
        }];
        while let Some(mut walker) = work.pop() {
            loop {
                let vertex = walker.vertex;
                let column = walker.column;
                if !walker.seen.insert((column, vertex, walker.stack.len())) {
                    // progress-free null cycle on this path
                    break;
                }
                let info = self.data.vertex(vertex);
                match info.kind() {
                    Some(VertexKind::Start) | Some(VertexKind::If) => {
                        if info.with().is_none() {
                            break;
                        }
                        if info.kind() == Some(VertexKind::Start) {
                            walker.events.push(TreeEvent::Open { vertex });
                        }
                        walker.stack.push(WalkFrame { vertex, column });
                    }
                    Some(VertexKind::Final) | Some(VertexKind::Fi) => {
                        let top = match walker.stack.last() {
                            Some(&frame)
                                if self.data.vertex(frame.vertex).with() == Some(vertex) =>
                            {
                                frame
                            }
                            _ => break,
                        };
                        walker.stack.pop();
                        if info.kind() == Some(VertexKind::Final) {
                            walker.events.push(TreeEvent::Close {
                                start: top.column,
                                end: column,
                            });
                        }
                    }
                    None => {}
                }
                if vertex == self.data.final_vertex()
                    && column + 1 >= self.stream.len()
                    && walker.stack.is_empty()
                {
                    let trees = fold_events(self.data, &walker.events);
                    return Ok(Resolution { trees, ambiguous });
                }
                let viable: Vec<Successor> =
                    succ::gather(self.data, self.stream, vertex, column)
                        .into_iter()
                        .filter(|successor| {
                            let succ_column = match successor.kind {
                                EdgeKind::Char => column + 1,
                                EdgeKind::Null => column,
                            };
                            match walker.stack.last() {
                                Some(frame) => stacks.contains_edge(
                                    (frame.column, frame.vertex),
                                    (succ_column, successor.vertex),
                                ),
                                None => true,
                            }
                        })
                        .collect();
                if viable.len() > 1 {
                    ambiguous = true;
                }
                let Some((&best, alternatives)) = viable.split_first() else {
                    break;
                };
                for &alternative in alternatives.iter().rev() {
                    let mut branch = walker.clone();
                    branch.step(alternative);
                    work.push(branch);
                }
                walker.step(best);
            }
        }
        // acceptance guarantees a witness path; reaching this point means
        // the stack graph over-approximated every candidate away
        Err(ResolveError::NoParseTree)
    }
}

fn incoming(stacks: &StackGraph, node: ParseNode) -> Vec<ParseNode> {
    if !stacks.contains_node(node) {
        return Vec::new();
    }
    stacks.neighbors_directed(node, Incoming).collect()
}
