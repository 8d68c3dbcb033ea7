//! Hand-compiled fixture data files. Each one is a complete, consistent
//! table set for a small grammar: the forward automaton is the regular
//! approximation of the grammar graph, the backward automaton's states
//! double as edge-set IDs, and the edge tables carry exactly the edges
//! viable for the corresponding left and right context.

use parvex_automaton::{run_backward, run_forward, EdgeStream};
use parvex_data::{DataFile, SymbolId};

/// Runs both passes over `input` and hands back the data file with the
/// resulting edge stream. Panics if the fixture's forward automaton
/// rejects, which would make the fixture itself inconsistent.
pub(crate) fn pipeline(data: DataFile, input: &str) -> (DataFile, EdgeStream) {
    let symbols = data.alphabet().map_str(input);
    let trace = run_forward(&data, &symbols);
    assert!(
        trace.accepted(),
        "fixture input {:?} must be accepted by the forward automaton",
        input
    );
    let stream = run_backward(&data, &trace);
    (data, stream)
}

fn alphabet_json(map: &[(char, SymbolId)]) -> String {
    let size = map.iter().map(|&(ch, _)| ch as usize).max().unwrap_or(0) + 1;
    let mut table = vec![0u32; size];
    for &(ch, symbol) in map {
        table[ch as usize] = symbol;
    }
    format!("{:?}", table)
}

fn load(document: String) -> DataFile {
    DataFile::from_json_slice(document.as_bytes()).unwrap()
}

/// `S ::= 'a'`.
///
/// Path for "a": start S (1) --a--> 3 --null--> final S (2).
pub(crate) fn single() -> DataFile {
    load(format!(
        r#"{{
            "input_to_symbol": {alphabet},
            "forwards": [{{}}, {{"transitions": {{"1": 2}}}}, {{"accepts": true}}],
            "backwards": [
                {{}},
                {{"transitions": {{"2": 2}}}},
                {{"transitions": {{"1": 3}}}},
                {{}}
            ],
            "vertices": [
                {{}},
                {{"type": "start", "text": "S", "with": 2}},
                {{"type": "final", "text": "S", "with": 1}},
                {{}}
            ],
            "null_edges": [[], [], [[3, 2]], []],
            "char_edges": [[], [], [], [[1, 3]]],
            "start_vertex": 1,
            "final_vertex": 2
        }}"#,
        alphabet = alphabet_json(&[('a', 1)])
    ))
}

/// `S ::= '(' S ')' | 'x'`.
///
/// Vertices: 1/2 bracket S; 3 after '(' (calls back into S), 4 after the
/// nested S, 5 after ')', 6 after 'x'. The regular approximation is
/// `'('* 'x' ')'*`, so the forward automaton also accepts unbalanced
/// inputs like "(x"; those die in the resolvers, not in the passes.
pub(crate) fn parens() -> DataFile {
    load(format!(
        r#"{{
            "input_to_symbol": {alphabet},
            "forwards": [
                {{}},
                {{"transitions": {{"1": 2, "3": 3}}}},
                {{"transitions": {{"1": 2, "3": 3}}}},
                {{"transitions": {{"2": 4}}, "accepts": true}},
                {{"transitions": {{"2": 4}}, "accepts": true}}
            ],
            "backwards": [
                {{}},
                {{"transitions": {{"3": 2, "4": 3}}}},
                {{"transitions": {{"1": 6, "2": 7}}}},
                {{"transitions": {{"3": 4, "4": 5}}}},
                {{"transitions": {{"2": 7}}}},
                {{"transitions": {{"3": 4, "4": 5}}}},
                {{}},
                {{"transitions": {{"1": 8, "2": 9}}}},
                {{}},
                {{"transitions": {{"1": 8, "2": 9}}}}
            ],
            "vertices": [
                {{}},
                {{"type": "start", "text": "S", "with": 2}},
                {{"type": "final", "text": "S", "with": 1}},
                {{}},
                {{}},
                {{}},
                {{}}
            ],
            "null_edges": [
                [], [],
                [[6, 2]],
                [[5, 2]],
                [[6, 2], [2, 4]],
                [[5, 2], [2, 4]],
                [],
                [[3, 1]],
                [],
                [[3, 1]]
            ],
            "char_edges": [
                [], [], [], [],
                [[4, 5]],
                [[4, 5]],
                [[1, 6]],
                [[1, 6]],
                [[1, 3]],
                [[1, 3]]
            ],
            "start_vertex": 1,
            "final_vertex": 2
        }}"#,
        alphabet = alphabet_json(&[('(', 1), (')', 2), ('x', 3)])
    ))
}

/// `E ::= A | B; A ::= 'a'; B ::= 'a'`, ambiguous on "a". B's start vertex
/// carries the lower sort key so the B reading ranks first. Vertex 8
/// projects onto 7 through `stack_vertex`.
pub(crate) fn alternatives() -> DataFile {
    load(format!(
        r#"{{
            "input_to_symbol": {alphabet},
            "forwards": [{{}}, {{"transitions": {{"1": 2}}}}, {{"accepts": true}}],
            "backwards": [
                {{}},
                {{"transitions": {{"2": 2}}}},
                {{"transitions": {{"1": 3}}}},
                {{}}
            ],
            "vertices": [
                {{}},
                {{"type": "start", "text": "E", "with": 2}},
                {{"type": "final", "text": "E", "with": 1}},
                {{"type": "start", "text": "A", "with": 4, "sort_key": 2}},
                {{"type": "final", "text": "A", "with": 3}},
                {{"type": "start", "text": "B", "with": 6, "sort_key": 1}},
                {{"type": "final", "text": "B", "with": 5}},
                {{}},
                {{"stack_vertex": 7}}
            ],
            "null_edges": [
                [], [],
                [[7, 4], [4, 2], [8, 6], [6, 2]],
                [[1, 3], [1, 5]]
            ],
            "char_edges": [[], [], [], [[3, 7], [5, 8]]],
            "start_vertex": 1,
            "final_vertex": 2
        }}"#,
        alphabet = alphabet_json(&[('a', 1)])
    ))
}

/// Two `if` brackets over the same input, both routed into the `fi` that
/// partners only the first. The path through vertex 5 reaches a `fi` whose
/// partner differs, which is how a compiled "and-not" guard rejects its
/// "not" branch. The bad branch carries the lower sort key so it is tried
/// first.
pub(crate) fn guard() -> DataFile {
    load(format!(
        r#"{{
            "input_to_symbol": {alphabet},
            "forwards": [{{}}, {{"transitions": {{"1": 2}}}}, {{"accepts": true}}],
            "backwards": [
                {{}},
                {{"transitions": {{"2": 2}}}},
                {{"transitions": {{"1": 3}}}},
                {{}}
            ],
            "vertices": [
                {{}},
                {{"type": "start", "text": "W", "with": 2}},
                {{"type": "final", "text": "W", "with": 1}},
                {{"type": "if", "with": 4, "sort_key": 7}},
                {{"type": "fi", "with": 3}},
                {{"type": "if", "with": 6, "sort_key": 1}},
                {{"type": "fi", "with": 5}},
                {{}},
                {{}}
            ],
            "null_edges": [
                [], [],
                [[7, 4], [8, 4], [4, 2]],
                [[1, 3], [1, 5]]
            ],
            "char_edges": [[], [], [], [[3, 7], [5, 8]]],
            "start_vertex": 1,
            "final_vertex": 2
        }}"#,
        alphabet = alphabet_json(&[('a', 1)])
    ))
}

/// `T ::= '[' A B ']'; A ::= 'a'; B ::= 'b'`: two named siblings inside
/// one bracket, the shape of a delimited list.
pub(crate) fn siblings() -> DataFile {
    load(format!(
        r#"{{
            "input_to_symbol": {alphabet},
            "forwards": [
                {{}},
                {{"transitions": {{"1": 2}}}},
                {{"transitions": {{"3": 3}}}},
                {{"transitions": {{"4": 4}}}},
                {{"transitions": {{"2": 5}}}},
                {{"accepts": true}}
            ],
            "backwards": [
                {{}},
                {{"transitions": {{"5": 2}}}},
                {{"transitions": {{"4": 3}}}},
                {{"transitions": {{"3": 4}}}},
                {{"transitions": {{"2": 5}}}},
                {{"transitions": {{"1": 6}}}},
                {{}}
            ],
            "vertices": [
                {{}},
                {{"type": "start", "text": "T", "with": 2}},
                {{"type": "final", "text": "T", "with": 1}},
                {{}},
                {{"type": "start", "text": "A", "with": 5}},
                {{"type": "final", "text": "A", "with": 4}},
                {{}},
                {{"type": "start", "text": "B", "with": 8}},
                {{"type": "final", "text": "B", "with": 7}},
                {{}},
                {{}}
            ],
            "null_edges": [
                [], [],
                [[10, 2]],
                [[9, 8]],
                [[6, 5], [5, 7]],
                [[3, 4]],
                []
            ],
            "char_edges": [
                [], [], [],
                [[8, 10]],
                [[7, 9]],
                [[4, 6]],
                [[1, 3]]
            ],
            "start_vertex": 1,
            "final_vertex": 2
        }}"#,
        alphabet = alphabet_json(&[('[', 1), (']', 2), ('a', 3), ('b', 4)])
    ))
}

/// `S ::= ε`, padded with the null cycle 3 -> 4 -> 3 next to the accepting
/// exit. Vertex 3 carries a high sort key so the exit through the final
/// vertex ranks first.
pub(crate) fn nullable() -> DataFile {
    load(
        r#"{
            "input_to_symbol": [0],
            "forwards": [{}, {"accepts": true}],
            "backwards": [{}, {"transitions": {"1": 2}}, {}],
            "vertices": [
                {},
                {"type": "start", "text": "S", "with": 2},
                {"type": "final", "text": "S", "with": 1},
                {"sort_key": 5},
                {}
            ],
            "null_edges": [[], [], [[1, 3], [3, 4], [4, 2], [4, 3]]],
            "char_edges": [[], [], []],
            "start_vertex": 1,
            "final_vertex": 2
        }"#
        .to_string(),
    )
}
