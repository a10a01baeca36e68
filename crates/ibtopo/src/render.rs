//! Diagram rendering of a parsed fabric

use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::graph::{FabricGraph, Link, Vertex};
use crate::guid::Guid;
use crate::resolver::GuidTable;
use crate::torset::{TorsetAssignment, TorsetLabel};
use crate::Result;

/// Size of the Graphviz `set312` color scheme
const PALETTE_SIZE: usize = 12;

/// What a renderer knows about a device beyond its GUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAnnotation {
    pub host: String,
    pub torset: Option<TorsetLabel>,
}

/// Per-device labels layered on top of the graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    devices: IndexMap<Guid, DeviceAnnotation>,
}

impl Annotations {
    pub fn new(table: &GuidTable, assignment: &TorsetAssignment) -> Self {
        let devices = table
            .iter()
            .map(|(guid, host)| {
                let annotation = DeviceAnnotation {
                    host: host.to_string(),
                    torset: assignment.torset_of(host),
                };
                (guid.clone(), annotation)
            })
            .collect();
        Self { devices }
    }

    pub fn device(&self, guid: &Guid) -> Option<&DeviceAnnotation> {
        self.devices.get(guid)
    }
}

/// Turns a finished graph plus annotations into an artifact
pub trait TopologyRenderer {
    /// File extension of the produced artifact, without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, graph: &FabricGraph, annotations: &Annotations) -> Result<Vec<u8>>;
}

/// Graphviz DOT output. Switches are boxes, devices are ellipses filled by torset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotRenderer;

impl DotRenderer {
    fn vertex_attributes(vertex: &Vertex, annotations: &Annotations) -> String {
        match vertex {
            Vertex::Switch { name } => format!("label = \"{}\", shape = box", escape(name)),
            Vertex::Device { guid } => {
                let label = escape(guid.as_str());
                match annotations.device(guid) {
                    Some(DeviceAnnotation {
                        host,
                        torset: Some(torset),
                    }) => format!(
                        "label = \"{label}\\n{}\\n{torset}\", shape = ellipse, style = filled, colorscheme = set312, fillcolor = {}",
                        escape(host),
                        torset.index() % PALETTE_SIZE + 1
                    ),
                    Some(DeviceAnnotation { host, torset: None }) => {
                        format!("label = \"{label}\\n{}\", shape = ellipse", escape(host))
                    }
                    None => format!("label = \"{label}\", shape = ellipse, style = dashed"),
                }
            }
        }
    }

    fn link_attributes(link: Link) -> String {
        match link {
            Link::SwitchLink => "style = bold".to_string(),
            Link::DeviceLink => "style = solid".to_string(),
        }
    }
}

/// Escape a value for use inside a quoted DOT attribute
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

impl TopologyRenderer for DotRenderer {
    fn extension(&self) -> &'static str {
        "dot"
    }

    fn render(&self, graph: &FabricGraph, annotations: &Annotations) -> Result<Vec<u8>> {
        let edge_attrs = |_: &UnGraph<Vertex, Link>, edge: EdgeReference<'_, Link>| {
            Self::link_attributes(*edge.weight())
        };
        let node_attrs = |_: &UnGraph<Vertex, Link>, (_, vertex): (NodeIndex, &Vertex)| {
            Self::vertex_attributes(vertex, annotations)
        };
        let dot = Dot::with_attr_getters(
            graph.inner(),
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &edge_attrs,
            &node_attrs,
        );
        Ok(format!("{dot}").into_bytes())
    }
}
