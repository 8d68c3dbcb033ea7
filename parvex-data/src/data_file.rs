use std::{
    collections::HashMap,
    error::Error,
    fmt::Display,
    io::Read,
    path::Path,
};

use flate2::read::GzDecoder;
use log::info;
use serde::{Deserialize, Deserializer};

use crate::{Alphabet, EdgeSetId, StateId, SymbolId, VertexId};

#[derive(Debug)]
pub enum DataFileError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl Error for DataFileError {}

impl Display for DataFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFileError::Io(err) => write!(f, "failed to read data file: {}", err),
            DataFileError::Json(err) => write!(f, "failed to parse data file: {}", err),
            DataFileError::Invalid(reason) => write!(f, "invalid data file: {}", reason),
        }
    }
}

impl From<std::io::Error> for DataFileError {
    fn from(err: std::io::Error) -> Self {
        DataFileError::Io(err)
    }
}

impl From<serde_json::Error> for DataFileError {
    fn from(err: serde_json::Error) -> Self {
        DataFileError::Json(err)
    }
}

fn accepts_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

#[derive(Deserialize)]
struct RawState {
    #[serde(default)]
    transitions: HashMap<String, StateId>,
    #[serde(default, deserialize_with = "accepts_flag")]
    accepts: bool,
}

#[derive(Deserialize)]
struct RawVertex {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    with: Option<VertexId>,
    sort_key: Option<i64>,
    stack_vertex: Option<VertexId>,
}

#[derive(Deserialize)]
struct RawDataFile {
    input_to_symbol: Vec<SymbolId>,
    forwards: Vec<RawState>,
    backwards: Vec<RawState>,
    vertices: Vec<RawVertex>,
    null_edges: Vec<Vec<(VertexId, VertexId)>>,
    char_edges: Vec<Vec<(VertexId, VertexId)>>,
    start_vertex: VertexId,
    final_vertex: VertexId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Start,
    Final,
    If,
    Fi,
}

impl VertexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexKind::Start => "start",
            VertexKind::Final => "final",
            VertexKind::If => "if",
            VertexKind::Fi => "fi",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    kind: Option<VertexKind>,
    text: Option<String>,
    with: Option<VertexId>,
    sort_key: i64,
    stack_vertex: Option<VertexId>,
}

impl Vertex {
    fn sentinel() -> Self {
        Vertex {
            kind: None,
            text: None,
            with: None,
            sort_key: 0,
            stack_vertex: None,
        }
    }

    pub fn kind(&self) -> Option<VertexKind> {
        self.kind
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The matching partner of a `start`/`final` or `if`/`fi` vertex.
    /// `None` when absent or the sentinel 0 was written in the data.
    pub fn with(&self) -> Option<VertexId> {
        self.with
    }

    pub fn sort_key(&self) -> i64 {
        self.sort_key
    }

    pub fn stack_vertex(&self) -> Option<VertexId> {
        self.stack_vertex
    }
}

#[derive(Debug)]
struct MachineState {
    transitions: HashMap<u32, StateId>,
    accepts: bool,
}

/// One of the two precompiled automata. States are dense by ID; the
/// transition map of each state is sparse with absence meaning the sink.
#[derive(Debug)]
pub struct StateMachine {
    states: Vec<MachineState>,
}

impl StateMachine {
    /// Initial state of both automata.
    pub const START: StateId = 1;
    /// Non-accepting sink; all missing transitions lead here.
    pub const SINK: StateId = 0;

    pub fn step(&self, state: StateId, input: u32) -> StateId {
        self.states
            .get(state as usize)
            .and_then(|s| s.transitions.get(&input))
            .copied()
            .unwrap_or(Self::SINK)
    }

    pub fn accepts(&self, state: StateId) -> bool {
        self.states
            .get(state as usize)
            .map(|s| s.accepts)
            .unwrap_or(false)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}

/// The loaded grammar tables. Immutable after construction; a single
/// instance may back any number of concurrent parses.
#[derive(Debug)]
pub struct DataFile {
    input_to_symbol: Vec<SymbolId>,
    forwards: StateMachine,
    backwards: StateMachine,
    vertices: Vec<Vertex>,
    null_edges: Vec<Vec<(VertexId, VertexId)>>,
    char_edges: Vec<Vec<(VertexId, VertexId)>>,
    start_vertex: VertexId,
    final_vertex: VertexId,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl DataFile {
    pub fn from_path(path: &Path) -> Result<DataFile, DataFileError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Loads a gzip-compressed data file; an uncompressed JSON document is
    /// also accepted (the generator's debug output).
    pub fn from_bytes(bytes: &[u8]) -> Result<DataFile, DataFileError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut decoder = GzDecoder::new(bytes);
            let mut document = Vec::new();
            decoder.read_to_end(&mut document)?;
            Self::from_json_slice(&document)
        } else {
            Self::from_json_slice(bytes)
        }
    }

    pub fn from_json_slice(document: &[u8]) -> Result<DataFile, DataFileError> {
        let raw: RawDataFile = serde_json::from_slice(document)?;
        let data = Self::from_raw(raw)?;
        info!(
            "loaded data file: {} forward states, {} backward states, {} vertices, {} edge sets",
            data.forwards.state_count(),
            data.backwards.state_count(),
            data.vertices.len(),
            data.null_edges.len(),
        );
        Ok(data)
    }

    fn from_raw(raw: RawDataFile) -> Result<DataFile, DataFileError> {
        let forwards = convert_machine(raw.forwards)?;
        let backwards = convert_machine(raw.backwards)?;
        let vertices = convert_vertices(raw.vertices)?;
        let data = DataFile {
            input_to_symbol: raw.input_to_symbol,
            forwards,
            backwards,
            vertices,
            null_edges: raw.null_edges,
            char_edges: raw.char_edges,
            start_vertex: raw.start_vertex,
            final_vertex: raw.final_vertex,
        };
        data.verify()?;
        Ok(data)
    }

    fn verify(&self) -> Result<(), DataFileError> {
        if self.forwards.state_count() < 2 {
            return Err(invalid("forwards automaton has no state 1"));
        }
        if self.backwards.state_count() < 2 {
            return Err(invalid("backwards automaton has no state 1"));
        }
        if self.null_edges.len() != self.char_edges.len() {
            return Err(invalid(format!(
                "null_edges and char_edges differ in length ({} vs {})",
                self.null_edges.len(),
                self.char_edges.len()
            )));
        }
        for (name, machine) in [("forwards", &self.forwards), ("backwards", &self.backwards)] {
            let sink = &machine.states[StateMachine::SINK as usize];
            if !sink.transitions.is_empty() || sink.accepts {
                return Err(invalid(format!("{} state 0 is not a sink", name)));
            }
        }
        for state in &self.forwards.states {
            for &target in state.transitions.values() {
                if target as usize >= self.forwards.state_count() {
                    return Err(invalid(format!("forwards transition to unknown state {}", target)));
                }
            }
        }
        // Backward states double as edge-set IDs, so targets must index the
        // edge tables as well.
        for state in &self.backwards.states {
            for &target in state.transitions.values() {
                if target as usize >= self.backwards.state_count() {
                    return Err(invalid(format!("backwards transition to unknown state {}", target)));
                }
                if target as usize >= self.null_edges.len() {
                    return Err(invalid(format!("backwards transition to unknown edge set {}", target)));
                }
            }
        }
        self.check_vertex(self.start_vertex, "start_vertex")?;
        self.check_vertex(self.final_vertex, "final_vertex")?;
        for (table, name) in [(&self.null_edges, "null_edges"), (&self.char_edges, "char_edges")] {
            for edges in table.iter() {
                for &(from, to) in edges {
                    self.check_vertex(from, name)?;
                    self.check_vertex(to, name)?;
                }
            }
        }
        for (id, vertex) in self.vertices.iter().enumerate() {
            if let Some(with) = vertex.with {
                if with as usize >= self.vertices.len() {
                    return Err(invalid(format!("vertex {} pairs with unknown vertex {}", id, with)));
                }
            }
            if let Some(projected) = vertex.stack_vertex {
                if projected as usize >= self.vertices.len() {
                    return Err(invalid(format!(
                        "vertex {} projects to unknown stack vertex {}",
                        id, projected
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_vertex(&self, id: VertexId, context: &str) -> Result<(), DataFileError> {
        if id == 0 || id as usize >= self.vertices.len() {
            Err(invalid(format!("{} references invalid vertex {}", context, id)))
        } else {
            Ok(())
        }
    }

    pub fn forwards(&self) -> &StateMachine {
        &self.forwards
    }

    pub fn backwards(&self) -> &StateMachine {
        &self.backwards
    }

    pub fn alphabet(&self) -> Alphabet<'_> {
        Alphabet::new(&self.input_to_symbol)
    }

    /// Panics if `id` is out of bounds; all IDs reachable through the edge
    /// tables are validated at load time.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id as usize]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_set_count(&self) -> usize {
        self.null_edges.len()
    }

    pub fn null_edges(&self, edge_set: EdgeSetId) -> &[(VertexId, VertexId)] {
        self.null_edges
            .get(edge_set as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn char_edges(&self, edge_set: EdgeSetId) -> &[(VertexId, VertexId)] {
        self.char_edges
            .get(edge_set as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn start_vertex(&self) -> VertexId {
        self.start_vertex
    }

    pub fn final_vertex(&self) -> VertexId {
        self.final_vertex
    }
}

fn invalid<S: Into<String>>(reason: S) -> DataFileError {
    DataFileError::Invalid(reason.into())
}

fn convert_machine(raw: Vec<RawState>) -> Result<StateMachine, DataFileError> {
    let mut states = Vec::with_capacity(raw.len());
    for (id, state) in raw.into_iter().enumerate() {
        let mut transitions = HashMap::with_capacity(state.transitions.len());
        for (input, target) in state.transitions {
            let input: u32 = input
                .parse()
                .map_err(|_| invalid(format!("state {} has non-numeric transition key {:?}", id, input)))?;
            transitions.insert(input, target);
        }
        states.push(MachineState {
            transitions,
            accepts: state.accepts,
        });
    }
    Ok(StateMachine { states })
}

fn convert_vertices(raw: Vec<RawVertex>) -> Result<Vec<Vertex>, DataFileError> {
    let mut vertices = Vec::with_capacity(raw.len().max(1));
    for (id, vertex) in raw.into_iter().enumerate() {
        let kind = match vertex.kind.as_deref() {
            None => None,
            Some("start") => Some(VertexKind::Start),
            Some("final") => Some(VertexKind::Final),
            Some("if") => Some(VertexKind::If),
            Some("fi") => Some(VertexKind::Fi),
            Some(other) => {
                return Err(invalid(format!("vertex {} has unknown type {:?}", id, other)));
            }
        };
        vertices.push(Vertex {
            kind,
            text: vertex.text,
            with: vertex.with.filter(|&with| with != 0),
            sort_key: vertex.sort_key.unwrap_or(0),
            stack_vertex: vertex.stack_vertex.filter(|&v| v != 0),
        });
    }
    if vertices.is_empty() {
        vertices.push(Vertex::sentinel());
    }
    Ok(vertices)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"{
        "input_to_symbol": [0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        "forwards": [{}, {"transitions": {"1": 2}}, {"accepts": true}],
        "backwards": [{}, {"transitions": {"2": 2}}, {"transitions": {"1": 3}}, {}],
        "vertices": [
            {},
            {"type": "start", "text": "S", "with": 2},
            {"type": "final", "text": "S", "with": 1},
            {}
        ],
        "null_edges": [[], [], [[3, 2]], []],
        "char_edges": [[], [], [], [[1, 3]]],
        "start_vertex": 1,
        "final_vertex": 2
    }"#;

    #[test]
    fn loads_plain_json() {
        let data = DataFile::from_json_slice(MINIMAL.as_bytes()).unwrap();
        assert_eq!(data.start_vertex(), 1);
        assert_eq!(data.final_vertex(), 2);
        assert_eq!(data.forwards().step(1, 1), 2);
        assert_eq!(data.forwards().step(1, 7), 0);
        assert!(data.forwards().accepts(2));
        assert!(!data.forwards().accepts(1));
        assert_eq!(data.null_edges(2), &[(3, 2)]);
        assert_eq!(data.char_edges(3), &[(1, 3)]);
        assert_eq!(data.vertex(1).kind(), Some(VertexKind::Start));
        assert_eq!(data.vertex(1).with(), Some(2));
        assert_eq!(data.vertex(1).text(), Some("S"));
        assert_eq!(data.vertex(3).kind(), None);
    }

    #[test]
    fn loads_gzip_container() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(MINIMAL.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.starts_with(&GZIP_MAGIC));
        let data = DataFile::from_bytes(&compressed).unwrap();
        assert_eq!(data.forwards().state_count(), 3);
    }

    #[test]
    fn loads_from_path() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(MINIMAL.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        let path = std::env::temp_dir().join(format!(
            "parvex-data-test-{}.gz",
            std::process::id()
        ));
        std::fs::write(&path, compressed).unwrap();
        let result = DataFile::from_path(&path);
        std::fs::remove_file(&path).unwrap();
        let data = result.unwrap();
        assert_eq!(data.start_vertex(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DataFile::from_path(Path::new("/nonexistent/parvex.gz")).unwrap_err();
        assert!(matches!(err, DataFileError::Io(_)));
    }

    #[test]
    fn accepts_integer_accept_flags() {
        let doc = MINIMAL.replace("\"accepts\": true", "\"accepts\": 1");
        let data = DataFile::from_json_slice(doc.as_bytes()).unwrap();
        assert!(data.forwards().accepts(2));
    }

    #[test]
    fn rejects_mismatched_edge_tables() {
        let doc = MINIMAL.replace("\"char_edges\": [[], [], [], [[1, 3]]]", "\"char_edges\": [[]]");
        let err = DataFile::from_json_slice(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DataFileError::Invalid(_)));
    }

    #[test]
    fn rejects_invalid_start_vertex() {
        let doc = MINIMAL.replace("\"start_vertex\": 1", "\"start_vertex\": 0");
        let err = DataFile::from_json_slice(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DataFileError::Invalid(_)));
    }

    #[test]
    fn rejects_backward_transitions_outside_edge_tables() {
        let doc = MINIMAL.replace("\"transitions\": {\"1\": 3}", "\"transitions\": {\"1\": 9}");
        let err = DataFile::from_json_slice(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DataFileError::Invalid(_)));
    }

    #[test]
    fn sentinel_with_is_dropped() {
        let doc = MINIMAL.replace("\"with\": 2", "\"with\": 0");
        let data = DataFile::from_json_slice(doc.as_bytes()).unwrap();
        assert_eq!(data.vertex(1).with(), None);
    }

    #[test]
    fn rejects_truncated_gzip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(MINIMAL.as_bytes()).unwrap();
        let mut compressed = encoder.finish().unwrap();
        compressed.truncate(compressed.len() / 2);
        assert!(DataFile::from_bytes(&compressed).is_err());
    }
}
