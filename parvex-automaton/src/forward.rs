use log::debug;
use parvex_data::{DataFile, StateId, StateMachine, SymbolId};

/// Result of the forwards pass: the full state trace (one entry per input
/// offset plus the initial state), the acceptance verdict, and the earliest
/// input offset whose transition entered the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTrace {
    states: Vec<StateId>,
    accepted: bool,
    first_bad_offset: Option<usize>,
}

impl ForwardTrace {
    /// `states()[i]` is the state before consuming the symbol at offset `i`;
    /// the last entry is the state after the whole input.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn first_bad_offset(&self) -> Option<usize> {
        self.first_bad_offset
    }

    /// Offset to report on rejection: the first sinking offset, or the input
    /// length when the automaton ended non-accepting without sinking.
    pub fn reject_offset(&self) -> usize {
        self.first_bad_offset.unwrap_or(self.states.len() - 1)
    }
}

/// Runs the forwards automaton over the symbol stream. The loop never
/// short-circuits on the sink state: the backwards pass consumes the whole
/// trace, zeros included.
pub fn run_forward(data: &DataFile, symbols: &[SymbolId]) -> ForwardTrace {
    let machine = data.forwards();
    let mut states = Vec::with_capacity(symbols.len() + 1);
    let mut state = StateMachine::START;
    states.push(state);
    for &symbol in symbols {
        state = machine.step(state, symbol);
        states.push(state);
    }
    let accepted = machine.accepts(state);
    let first_bad_offset = states
        .iter()
        .position(|&s| s == StateMachine::SINK)
        .map(|index| index - 1);
    debug!(
        "forward pass: {} symbols, accepted={}, first bad offset {:?}",
        symbols.len(),
        accepted,
        first_bad_offset
    );
    ForwardTrace {
        states,
        accepted,
        first_bad_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_grammar() -> DataFile {
        let mut alphabet = vec![0u32; 128];
        alphabet['a' as usize] = 1;
        let doc = format!(
            r#"{{
                "input_to_symbol": {:?},
                "forwards": [{{}}, {{"transitions": {{"1": 2}}}}, {{"accepts": true}}],
                "backwards": [{{}}, {{"transitions": {{"2": 2}}}}, {{"transitions": {{"1": 3}}}}, {{}}],
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
            alphabet
        );
        DataFile::from_json_slice(doc.as_bytes()).unwrap()
    }

    #[test]
    fn initial_state_is_one() {
        let data = single_grammar();
        let trace = run_forward(&data, &[]);
        assert_eq!(trace.states(), &[1]);
    }

    #[test]
    fn empty_input_acceptance_matches_state_one() {
        let data = single_grammar();
        let trace = run_forward(&data, &[]);
        assert_eq!(trace.accepted(), data.forwards().accepts(1));
        assert!(!trace.accepted());
        assert_eq!(trace.reject_offset(), 0);
    }

    #[test]
    fn accepts_single_symbol() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("a");
        let trace = run_forward(&data, &symbols);
        assert_eq!(trace.states(), &[1, 2]);
        assert!(trace.accepted());
        assert_eq!(trace.first_bad_offset(), None);
    }

    #[test]
    fn sink_symbol_rejects_at_offset_zero() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("\u{2603}");
        assert_eq!(symbols, vec![0]);
        let trace = run_forward(&data, &symbols);
        assert_eq!(trace.states(), &[1, 0]);
        assert!(!trace.accepted());
        assert_eq!(trace.first_bad_offset(), Some(0));
        assert_eq!(trace.reject_offset(), 0);
    }

    #[test]
    fn no_short_circuit_after_sink() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("baa");
        let trace = run_forward(&data, &symbols);
        assert_eq!(trace.states(), &[1, 0, 0, 0]);
        assert_eq!(trace.first_bad_offset(), Some(0));
    }

    #[test]
    fn trailing_garbage_reports_first_bad_offset() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("ab");
        let trace = run_forward(&data, &symbols);
        assert_eq!(trace.states(), &[1, 2, 0]);
        assert_eq!(trace.first_bad_offset(), Some(1));
    }
}
