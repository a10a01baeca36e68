//! Graph model for the switched fabric

use std::fmt;

use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::guid::Guid;

/// A vertex in the fabric graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Vertex {
    /// A switch enclosure
    Switch { name: String },
    /// A single HCA port, always a leaf hanging off one switch
    Device { guid: Guid },
}

impl Vertex {
    pub fn is_switch(&self) -> bool {
        matches!(self, Vertex::Switch { .. })
    }

    pub fn is_device(&self) -> bool {
        matches!(self, Vertex::Device { .. })
    }

    /// Switch name or device GUID
    pub fn name(&self) -> &str {
        match self {
            Vertex::Switch { name } => name,
            Vertex::Device { guid } => guid.as_str(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Vertex::Switch { .. } => "switch",
            Vertex::Device { .. } => "device",
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge metadata, recorded when the edge is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Link {
    /// Switch to switch, from a `Switches=` clause
    SwitchLink,
    /// Switch to device, from a `Nodes=` clause
    DeviceLink,
}

impl Link {
    pub fn as_str(&self) -> &'static str {
        match self {
            Link::SwitchLink => "switch-link",
            Link::DeviceLink => "device-link",
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undirected graph of switches and devices.
///
/// Switches and devices live in separate name spaces, so a switch named like a
/// GUID never collides with a device. There are no parallel edges.
#[derive(Debug, Clone, Default)]
pub struct FabricGraph {
    inner: UnGraph<Vertex, Link>,
    switches: IndexMap<String, NodeIndex>,
    devices: IndexMap<Guid, NodeIndex>,
}

impl FabricGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switch vertex, or return the existing one
    pub(crate) fn add_switch(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.switches.get(name) {
            return *idx;
        }
        let idx = self.inner.add_node(Vertex::Switch {
            name: name.to_string(),
        });
        self.switches.insert(name.to_string(), idx);
        idx
    }

    /// Connect two switches. Returns false if the link already existed.
    pub(crate) fn link_switches(&mut self, a: &str, b: &str) -> bool {
        let a = self.add_switch(a);
        let b = self.add_switch(b);
        if self.inner.find_edge(a, b).is_some() {
            return false;
        }
        self.inner.add_edge(a, b, Link::SwitchLink);
        true
    }

    /// Hang a device off a switch.
    ///
    /// Fails with the name of the current switch when the device is already attached
    /// somewhere else; attaching it to the same switch twice is a no-op.
    pub(crate) fn attach_device(&mut self, switch: &str, guid: &Guid) -> Result<(), String> {
        let switch_idx = self.add_switch(switch);

        if let Some(&device_idx) = self.devices.get(guid) {
            return match self.switch_index_of(device_idx) {
                Some(current) if current == switch_idx => Ok(()),
                Some(current) => Err(self.inner[current].name().to_string()),
                None => {
                    self.inner.add_edge(switch_idx, device_idx, Link::DeviceLink);
                    Ok(())
                }
            };
        }

        let device_idx = self.inner.add_node(Vertex::Device { guid: guid.clone() });
        self.devices.insert(guid.clone(), device_idx);
        self.inner.add_edge(switch_idx, device_idx, Link::DeviceLink);
        Ok(())
    }

    fn switch_index_of(&self, device_idx: NodeIndex) -> Option<NodeIndex> {
        self.inner
            .neighbors(device_idx)
            .find(|n| self.inner[*n].is_switch())
    }

    /// Borrow the underlying petgraph graph
    pub fn inner(&self) -> &UnGraph<Vertex, Link> {
        &self.inner
    }

    /// Number of vertices, switches and devices together
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn contains_switch(&self, name: &str) -> bool {
        self.switches.contains_key(name)
    }

    pub fn contains_device(&self, guid: &Guid) -> bool {
        self.devices.contains_key(guid)
    }

    /// Switch names in the order they were first seen
    pub fn switch_names(&self) -> impl Iterator<Item = &str> {
        self.switches.keys().map(String::as_str)
    }

    /// Device GUIDs in the order they were first seen
    pub fn device_guids(&self) -> impl Iterator<Item = &Guid> {
        self.devices.keys()
    }

    /// Get the switch a device is attached to
    pub fn switch_of(&self, guid: &Guid) -> Option<&str> {
        let idx = self.devices.get(guid)?;
        self.switch_index_of(*idx).map(|s| self.inner[s].name())
    }

    /// Get the devices attached to a switch
    pub fn devices_of(&self, switch: &str) -> Vec<&Guid> {
        self.neighbors_of(switch)
            .filter_map(|v| match v {
                Vertex::Device { guid } => Some(guid),
                Vertex::Switch { .. } => None,
            })
            .collect()
    }

    /// Get the switches directly linked to a switch
    pub fn neighbor_switches(&self, switch: &str) -> Vec<&str> {
        self.neighbors_of(switch)
            .filter(|v| v.is_switch())
            .map(Vertex::name)
            .collect()
    }

    fn neighbors_of(&self, switch: &str) -> impl Iterator<Item = &Vertex> {
        self.switches
            .get(switch)
            .into_iter()
            .flat_map(|idx| self.inner.neighbors(*idx))
            .map(|n| &self.inner[n])
    }

    /// Degree of a device vertex; always 1 for a parsed graph
    pub fn device_degree(&self, guid: &Guid) -> Option<usize> {
        self.devices
            .get(guid)
            .map(|idx| self.inner.neighbors(*idx).count())
    }

    /// Kind of the edge between two switches, if any
    pub fn switch_link(&self, a: &str, b: &str) -> Option<Link> {
        let a = self.switches.get(a)?;
        let b = self.switches.get(b)?;
        self.inner.find_edge(*a, *b).map(|e| self.inner[e])
    }

    /// All edges as (endpoint, endpoint, kind)
    pub fn edges(&self) -> impl Iterator<Item = (&Vertex, &Vertex, Link)> {
        self.inner
            .edge_references()
            .map(|e| (&self.inner[e.source()], &self.inner[e.target()], *e.weight()))
    }

    /// Count edges of one kind
    pub fn count_links(&self, kind: Link) -> usize {
        self.inner.edge_weights().filter(|l| **l == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_links_are_idempotent_in_both_directions() {
        let mut graph = FabricGraph::new();
        assert!(graph.link_switches("ibsw1", "ibsw2"));
        assert!(!graph.link_switches("ibsw1", "ibsw2"));
        assert!(!graph.link_switches("ibsw2", "ibsw1"));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.switch_link("ibsw2", "ibsw1"), Some(Link::SwitchLink));
    }

    #[test]
    fn test_device_is_a_leaf_of_its_switch() {
        let mut graph = FabricGraph::new();
        let guid = Guid::new("0x155dfffd341acb");
        graph.attach_device("ibsw3", &guid).unwrap();
        graph.attach_device("ibsw3", &guid).unwrap();

        assert_eq!(graph.device_degree(&guid), Some(1));
        assert_eq!(graph.switch_of(&guid), Some("ibsw3"));
        assert_eq!(graph.devices_of("ibsw3"), vec![&guid]);
        assert_eq!(graph.count_links(Link::DeviceLink), 1);
    }

    #[test]
    fn test_device_cannot_move_to_another_switch() {
        let mut graph = FabricGraph::new();
        let guid = Guid::new("0x155dfffd341acb");
        graph.attach_device("ibsw3", &guid).unwrap();

        let err = graph.attach_device("ibsw4", &guid).unwrap_err();
        assert_eq!(err, "ibsw3");
        assert_eq!(graph.device_degree(&guid), Some(1));
    }

    #[test]
    fn test_switch_and_device_names_do_not_collide() {
        let mut graph = FabricGraph::new();
        graph.add_switch("0xaaa");
        graph.attach_device("ibsw1", &Guid::new("0xaaa")).unwrap();

        assert_eq!(graph.switch_count(), 2);
        assert_eq!(graph.device_count(), 1);
        assert!(graph.neighbor_switches("0xaaa").is_empty());
    }

    #[test]
    fn test_edges_keep_their_kind() {
        let mut graph = FabricGraph::new();
        graph.link_switches("ibsw0", "ibsw1");
        graph.attach_device("ibsw1", &Guid::new("0xaaa")).unwrap();

        let kinds: Vec<_> = graph
            .edges()
            .map(|(a, b, kind)| (a.kind(), b.kind(), kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("switch", "switch", Link::SwitchLink),
                ("switch", "device", Link::DeviceLink),
            ]
        );
    }
}
