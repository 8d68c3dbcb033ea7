use log::debug;
use parvex_data::{DataFile, StateMachine};

use crate::{EdgeStream, ForwardTrace};

/// Runs the backwards automaton right-to-left over the forward state trace.
/// The state reached after consuming `forward_states[i]` is the edge-set ID
/// for position `i`, so the output has one entry per trace entry. The last
/// entry, a function of the final forward state, is the terminal edge-set.
pub fn run_backward(data: &DataFile, trace: &ForwardTrace) -> EdgeStream {
    let machine = data.backwards();
    let states = trace.states();
    let mut ids = vec![0; states.len()];
    let mut state = StateMachine::START;
    for position in (0..states.len()).rev() {
        state = machine.step(state, states[position]);
        ids[position] = state;
    }
    debug!("backward pass: {} positions, terminal edge set {}", ids.len(), ids[ids.len() - 1]);
    EdgeStream::new(ids)
}

#[cfg(test)]
mod tests {
    use parvex_data::DataFile;

    use super::*;
    use crate::run_forward;

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
    fn stream_is_one_longer_than_input() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("a");
        let trace = run_forward(&data, &symbols);
        let stream = run_backward(&data, &trace);
        assert_eq!(stream.len(), symbols.len() + 1);
    }

    #[test]
    fn terminal_edge_set_follows_final_forward_state() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("a");
        let trace = run_forward(&data, &symbols);
        let stream = run_backward(&data, &trace);
        assert_eq!(stream.ids(), &[3, 2]);
        assert_eq!(stream.terminal(), 2);
        assert_eq!(stream.terminal(), data.backwards().step(1, 2));
    }

    #[test]
    fn empty_input_yields_terminal_only() {
        let data = single_grammar();
        let trace = run_forward(&data, &[]);
        let stream = run_backward(&data, &trace);
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn produced_ids_index_the_edge_tables() {
        let data = single_grammar();
        let symbols = data.alphabet().map_str("a");
        let trace = run_forward(&data, &symbols);
        let stream = run_backward(&data, &trace);
        for &id in stream.ids() {
            assert!((id as usize) < data.edge_set_count());
        }
    }
}
