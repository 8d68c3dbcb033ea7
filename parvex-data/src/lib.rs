pub mod alphabet;
pub mod data_file;

pub use alphabet::Alphabet;
pub use data_file::{DataFile, DataFileError, StateMachine, Vertex, VertexKind};

/// State ID in either automaton. 0 is the rejecting sink, 1 the initial state.
pub type StateId = u32;
/// Symbol index produced by the alphabet mapping. 0 is the sink symbol.
pub type SymbolId = u32;
/// Vertex ID in the grammar graph. 0 is the stack-floor sentinel.
pub type VertexId = u32;
/// Edge-set ID; doubles as a backward-automaton state ID.
pub type EdgeSetId = u32;
