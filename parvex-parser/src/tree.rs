use parvex_data::{DataFile, VertexId};

/// A resolved nested parse tree. `start` and `end` are input offsets; the
/// root of a full parse spans `[0, n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub name: String,
    pub children: Vec<ParseTree>,
    pub start: usize,
    pub end: usize,
}

impl ParseTree {
    /// Renders the recursive `["name",[children…],start,end]` form. The
    /// writer is hand-rolled so commas inside names reach the output as the
    /// literal escape `,`, keeping the outer commas unambiguous.
    pub fn render_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        out.push_str("[\"");
        escape_name(&self.name, out);
        out.push_str("\",[");
        for (index, child) in self.children.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            child.write_json(out);
        }
        out.push_str("],");
        out.push_str(&self.start.to_string());
        out.push(',');
        out.push_str(&self.end.to_string());
        out.push(']');
    }
}

fn escape_name(name: &str, out: &mut String) {
    for ch in name.chars() {
        match ch {
            ',' => out.push_str("\\u002c"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            ch if (ch as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
}

/// Open/close frames emitted by the resolvers while walking a path; folded
/// into trees once a path is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeEvent {
    Open { vertex: VertexId },
    Close { start: usize, end: usize },
}

pub(crate) fn fold_events(data: &DataFile, events: &[TreeEvent]) -> Vec<ParseTree> {
    let mut pending: Vec<(VertexId, Vec<ParseTree>)> = Vec::new();
    let mut roots = Vec::new();
    for &event in events {
        match event {
            TreeEvent::Open { vertex } => pending.push((vertex, Vec::new())),
            TreeEvent::Close { start, end } => {
                if let Some((vertex, children)) = pending.pop() {
                    let info = data.vertex(vertex);
                    let name = info
                        .text()
                        .map(str::to_string)
                        .unwrap_or_else(|| vertex.to_string());
                    let tree = ParseTree {
                        name,
                        children,
                        start,
                        end,
                    };
                    match pending.last_mut() {
                        Some((_, siblings)) => siblings.push(tree),
                        None => roots.push(tree),
                    }
                }
            }
        }
    }
    roots
}
