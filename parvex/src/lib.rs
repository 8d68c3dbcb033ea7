use std::{error::Error, fmt::Display, path::Path};

use log::debug;

pub use parvex_automaton::{run_backward, run_forward, EdgeStream, ForwardTrace};
pub use parvex_data::{
    Alphabet, DataFile, DataFileError, EdgeSetId, StateId, StateMachine, SymbolId, Vertex,
    VertexId, VertexKind,
};
pub use parvex_parser::{
    BacktrackResolver, EdgeKind, ParallelResolver, ParseGraph, ParseNode, ParseTree, Resolution,
    ResolveError, StackMode,
};

#[derive(Debug)]
pub enum RuntimeError {
    /// The data file failed to load or verify; nothing was parsed.
    InvalidDataFile(DataFileError),
    /// The forward automaton ended in a non-accepting state. `offset` is
    /// the earliest input offset whose transition entered the sink, or the
    /// input length if the automaton never sank.
    InputRejected { offset: usize },
    /// Both passes succeeded but no well-nested path exists.
    NoParseTree,
}

impl Error for RuntimeError {}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::InvalidDataFile(err) => write!(f, "{}", err),
            RuntimeError::InputRejected { offset } => {
                write!(f, "input rejected at offset {}", offset)
            }
            RuntimeError::NoParseTree => {
                write!(f, "input matches the grammar's approximation but has no parse tree")
            }
        }
    }
}

impl From<DataFileError> for RuntimeError {
    fn from(err: DataFileError) -> Self {
        RuntimeError::InvalidDataFile(err)
    }
}

impl From<ResolveError> for RuntimeError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoParseTree => RuntimeError::NoParseTree,
        }
    }
}

pub fn load_data_file(path: &Path) -> Result<DataFile, RuntimeError> {
    Ok(DataFile::from_path(path)?)
}

/// Runs the two passes over `input`. On success the returned edge stream
/// encodes every parse of the input; rejection short-circuits before the
/// backward pass.
pub fn run_pipeline(data: &DataFile, input: &str) -> Result<EdgeStream, RuntimeError> {
    let symbols = data.alphabet().map_str(input);
    let trace = run_forward(data, &symbols);
    if !trace.accepted() {
        return Err(RuntimeError::InputRejected {
            offset: trace.reject_offset(),
        });
    }
    let stream = run_backward(data, &trace);
    debug!("pipeline produced {} edge sets", stream.len());
    Ok(stream)
}
