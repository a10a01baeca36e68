//! Parser for the `sharp_cmd topology` connectivity description
//!
//! One declaration per line:
//!
//! ```text
//! SwitchName=<name> [Switches=<name>[,<name>...] | Nodes=<guid>[,<guid>...]]
//! ```
//!
//! Lines starting with `#` and blank lines are skipped. Anything else that does not
//! fit the grammar fails the whole parse: a silently dropped line would shrink a
//! torset without any signal.

use serde::{Deserialize, Serialize};

use crate::graph::FabricGraph;
use crate::guid::Guid;
use crate::{Result, TopologyError};

const SWITCH_DECL: &str = "SwitchName=";
const SWITCHES_KEY: &str = "Switches";
const NODES_KEY: &str = "Nodes";

/// The raw device list of one `Nodes=` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchNodes {
    /// Declaring switch
    pub switch: String,
    /// 1-based line number in the description
    pub line: usize,
    /// Comma-separated GUIDs exactly as written
    pub raw: String,
}

impl SwitchNodes {
    /// Split the raw list into GUIDs, in written order
    pub fn guids(&self) -> impl Iterator<Item = Guid> + '_ {
        self.raw.split(',').map(|g| Guid::new(g.trim()))
    }
}

/// Output of [`parse_topology`]
#[derive(Debug, Clone, Default)]
pub struct ParsedTopology {
    pub graph: FabricGraph,
    /// One entry per `Nodes=` line, in file order
    pub switch_nodes: Vec<SwitchNodes>,
}

enum Clause<'a> {
    Switches(Vec<&'a str>),
    Nodes(&'a str, Vec<&'a str>),
}

struct Declaration<'a> {
    switch: &'a str,
    clause: Option<Clause<'a>>,
}

impl<'a> Declaration<'a> {
    fn parse(line: &'a str) -> std::result::Result<Self, String> {
        let mut tokens = line.split_whitespace();

        let switch = tokens
            .next()
            .and_then(|t| t.strip_prefix(SWITCH_DECL))
            .ok_or_else(|| format!("expected `{SWITCH_DECL}<name>` declaration"))?;
        if switch.is_empty() {
            return Err("empty switch name".to_string());
        }

        let clause = match tokens.next() {
            None => None,
            Some(token) => Some(Self::parse_clause(switch, token)?),
        };

        if let Some(extra) = tokens.next() {
            return Err(format!("unexpected second clause `{extra}`"));
        }

        Ok(Self { switch, clause })
    }

    fn parse_clause(switch: &str, token: &'a str) -> std::result::Result<Clause<'a>, String> {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| format!("clause `{token}` has no `=`"))?;

        let entries = split_list(value).ok_or_else(|| format!("empty entry in `{key}` list"))?;

        match key {
            SWITCHES_KEY => {
                if entries.contains(&switch) {
                    return Err(format!("switch {switch} links to itself"));
                }
                Ok(Clause::Switches(entries))
            }
            NODES_KEY => Ok(Clause::Nodes(value, entries)),
            other => Err(format!("unknown clause `{other}`")),
        }
    }
}

fn split_list(value: &str) -> Option<Vec<&str>> {
    let entries: Vec<&str> = value.split(',').collect();
    if entries.iter().any(|e| e.is_empty()) {
        return None;
    }
    Some(entries)
}

/// Parse a full topology description.
///
/// Returns the fabric graph and the per-switch device lists. The parse is all or
/// nothing: the first malformed line aborts it and no partial graph is returned.
pub fn parse_topology(text: &str) -> Result<ParsedTopology> {
    let mut graph = FabricGraph::new();
    let mut switch_nodes = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let decl = Declaration::parse(line).map_err(|reason| TopologyError::MalformedLine {
            line: line_no,
            content: raw_line.to_string(),
            reason,
        })?;

        graph.add_switch(decl.switch);

        match decl.clause {
            None => {}
            Some(Clause::Switches(peers)) => {
                for peer in peers {
                    if !graph.link_switches(decl.switch, peer) {
                        tracing::trace!("Link {} <-> {} already known", decl.switch, peer);
                    }
                }
            }
            Some(Clause::Nodes(raw, guids)) => {
                for guid in guids {
                    let guid = Guid::new(guid);
                    if let Err(first_switch) = graph.attach_device(decl.switch, &guid) {
                        return Err(TopologyError::DeviceReattached {
                            guid,
                            line: line_no,
                            first_switch,
                            second_switch: decl.switch.to_string(),
                        });
                    }
                }
                tracing::debug!(
                    "Switch {} has {} device(s) on line {}",
                    decl.switch,
                    raw.split(',').count(),
                    line_no
                );
                switch_nodes.push(SwitchNodes {
                    switch: decl.switch.to_string(),
                    line: line_no,
                    raw: raw.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Parsed topology: {} switches, {} devices, {} edges, {} device lists",
        graph.switch_count(),
        graph.device_count(),
        graph.edge_count(),
        switch_nodes.len()
    );

    Ok(ParsedTopology {
        graph,
        switch_nodes,
    })
}
