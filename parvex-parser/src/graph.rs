use std::io;

use parvex_automaton::EdgeStream;
use parvex_data::{DataFile, VertexId};
use petgraph::{algo::has_path_connecting, graphmap::DiGraphMap, Direction::Outgoing};

/// A parse-graph vertex: the grammar vertex instantiated at an input column.
/// Identity is by value, never by object, so seen-sets and graph keys use
/// this pair directly.
pub type ParseNode = (usize, VertexId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    Null,
    Char,
}

/// The materialized parse graph: per-column edge sets glued left to right,
/// null edges staying in their column and char edges crossing to the next.
pub struct ParseGraph<'data> {
    data: &'data DataFile,
    graph: DiGraphMap<ParseNode, EdgeKind>,
    columns: usize,
}

impl<'data> ParseGraph<'data> {
    pub fn build(data: &'data DataFile, stream: &EdgeStream) -> ParseGraph<'data> {
        let mut graph = DiGraphMap::new();
        for (column, &edge_set) in stream.ids().iter().enumerate() {
            for &(from, to) in data.null_edges(edge_set) {
                graph.add_edge((column, from), (column, to), EdgeKind::Null);
            }
            for &(from, to) in data.char_edges(edge_set) {
                graph.add_edge((column, from), (column + 1, to), EdgeKind::Char);
            }
        }
        ParseGraph {
            data,
            graph,
            columns: stream.len(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn root(&self) -> ParseNode {
        (0, self.data.start_vertex())
    }

    pub fn target(&self) -> ParseNode {
        (self.columns.saturating_sub(1), self.data.final_vertex())
    }

    /// Whether the final vertex at the last column is reachable from the
    /// start vertex at column 0.
    pub fn connects(&self) -> bool {
        let root = self.root();
        let target = self.target();
        self.graph.contains_node(root)
            && self.graph.contains_node(target)
            && has_path_connecting(&self.graph, root, target, None)
    }

    pub fn contains(&self, node: ParseNode) -> bool {
        self.graph.contains_node(node)
    }

    pub fn successors(&self, node: ParseNode) -> Vec<ParseNode> {
        if !self.graph.contains_node(node) {
            return Vec::new();
        }
        self.graph.neighbors_directed(node, Outgoing).collect()
    }

    /// Dumps the graph as GraphViz text: one edge line per parse edge and
    /// one label line per vertex instance.
    pub fn write_dot<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "digraph {{")?;
        for (from, to, _) in self.graph.all_edges() {
            writeln!(out, "\"{},{}\" -> \"{},{}\";", from.0, from.1, to.0, to.1)?;
        }
        for node in self.graph.nodes() {
            writeln!(
                out,
                "\"{},{}\"[label=\"{}\"];",
                node.0,
                node.1,
                escape_label(&self.vertex_label(node.1))
            )?;
        }
        writeln!(out, "}}")
    }

    fn vertex_label(&self, vertex: VertexId) -> String {
        let info = self.data.vertex(vertex);
        let name = info
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| vertex.to_string());
        match info.kind() {
            Some(kind) => format!("{} {}", kind.as_str(), name),
            None => name,
        }
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use parvex_automaton::{run_backward, run_forward};

    use super::*;
    use crate::fixtures;

    fn stream_for(data: &DataFile, input: &str) -> EdgeStream {
        let symbols = data.alphabet().map_str(input);
        let trace = run_forward(data, &symbols);
        assert!(trace.accepted(), "fixture input {:?} must be DFA-accepted", input);
        run_backward(data, &trace)
    }

    #[test]
    fn builds_columns_from_edge_sets() {
        let data = fixtures::single();
        let stream = stream_for(&data, "a");
        let graph = ParseGraph::build(&data, &stream);
        assert_eq!(graph.columns(), 2);
        assert_eq!(graph.successors((0, 1)), vec![(1, 3)]);
        assert_eq!(graph.successors((1, 3)), vec![(1, 2)]);
        assert!(graph.connects());
    }

    #[test]
    fn disconnected_graph_does_not_connect() {
        let data = fixtures::parens();
        let stream = stream_for(&data, "(x");
        let graph = ParseGraph::build(&data, &stream);
        // The regular approximation accepts "(x" but the final vertex is
        // still reachable only through the parse edges present; here it is
        // reachable, the stack discipline is what fails later.
        assert!(graph.connects());
        let empty = EdgeStream::new(vec![0]);
        let graph = ParseGraph::build(&data, &empty);
        assert!(!graph.connects());
    }

    #[test]
    fn dot_output_lists_edges_and_labels() {
        let data = fixtures::single();
        let stream = stream_for(&data, "a");
        let graph = ParseGraph::build(&data, &stream);
        let mut out = Vec::new();
        graph.write_dot(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("digraph {\n"));
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"0,1\" -> \"1,3\";\n"));
        assert!(text.contains("\"1,3\" -> \"1,2\";\n"));
        assert!(text.contains("\"0,1\"[label=\"start S\"];\n"));
        assert!(text.contains("\"1,2\"[label=\"final S\"];\n"));
        assert!(text.contains("\"1,3\"[label=\"3\"];\n"));
    }

    #[test]
    fn dot_output_round_trips_to_the_same_edge_set() {
        let data = fixtures::parens();
        let stream = stream_for(&data, "(x)");
        let graph = ParseGraph::build(&data, &stream);
        let mut out = Vec::new();
        graph.write_dot(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let parse_node = |raw: &str| -> ParseNode {
            let raw = raw.trim_matches('"');
            let (column, vertex) = raw.split_once(',').unwrap();
            (column.parse().unwrap(), vertex.parse().unwrap())
        };
        let mut rendered: Vec<(ParseNode, ParseNode)> = text
            .lines()
            .filter(|line| line.contains(" -> "))
            .map(|line| {
                let line = line.trim_end_matches(';');
                let (from, to) = line.split_once(" -> ").unwrap();
                (parse_node(from), parse_node(to))
            })
            .collect();

        let mut expected: Vec<(ParseNode, ParseNode)> = Vec::new();
        for (column, &edge_set) in stream.ids().iter().enumerate() {
            for &(from, to) in data.null_edges(edge_set) {
                expected.push(((column, from), (column, to)));
            }
            for &(from, to) in data.char_edges(edge_set) {
                expected.push(((column, from), (column + 1, to)));
            }
        }
        rendered.sort();
        expected.sort();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn null_edges_stay_in_column_char_edges_cross() {
        let data = fixtures::parens();
        let stream = stream_for(&data, "(x)");
        let graph = ParseGraph::build(&data, &stream);
        // null edge at column 1: call into the nested nonterminal
        assert!(graph.successors((1, 3)).contains(&(1, 1)));
        // char edge out of column 1 consumes the 'x'
        assert!(graph.successors((1, 1)).contains(&(2, 6)));
    }
}
