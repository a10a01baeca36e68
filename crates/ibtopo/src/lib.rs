//! # ibtopo - InfiniBand fabric topology and torset grouping
//!
//! Turns the connectivity description emitted by `sharp_cmd topology` into a graph of
//! switches and devices, and partitions the hosts behind those devices into torsets:
//! groups of hosts wired to the same top-of-rack switch enclosure.
//!
//! ## Pipeline
//!
//! - **Parser**: text -> [`FabricGraph`] plus the ordered per-switch device lists
//! - **Resolver**: discovered GUIDs -> canonical [`GuidTable`] (GUID to host address)
//! - **Assigner**: per-switch lists + table -> [`TorsetAssignment`] -> [`Torsets`]
//!
//! Every stage consumes the previous stage's output and returns a fresh value. Remote
//! GUID collection and topology generation are injected through [`GuidSource`] and
//! [`TopologySource`], so the whole pipeline runs against in-memory fixtures as well.

pub mod graph;
pub mod guid;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod source;
pub mod torset;

#[cfg(test)]
pub(crate) mod fixtures;

pub use graph::{FabricGraph, Link, Vertex};
pub use guid::Guid;
pub use parser::{parse_topology, ParsedTopology, SwitchNodes};
pub use pipeline::{analyze, discover, Analysis, Discovery};
pub use render::{Annotations, DeviceAnnotation, DotRenderer, TopologyRenderer};
pub use resolver::{GuidTable, HostRecord};
pub use source::{
    DiscoveryFailure, DiscoveryReport, GuidSource, StaticGuidSource, StaticTopologySource,
    TopologySource,
};
pub use torset::{group_hosts_by_torset, identify_torsets, TorsetAssignment, TorsetLabel, Torsets};

/// Main error type for topology discovery
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Malformed topology line {line} ({reason}): {content:?}")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },

    #[error(
        "Device {guid} on line {line} is attached to switch {second_switch} but already hangs off {first_switch}"
    )]
    DeviceReattached {
        guid: Guid,
        line: usize,
        first_switch: String,
        second_switch: String,
    },

    #[error("GUID {guid} listed under switch {switch} (line {line}) does not belong to any discovered host")]
    UnresolvableGuid {
        guid: Guid,
        switch: String,
        line: usize,
    },

    #[error("GUID {guid} reported by both {first_host} and {second_host}")]
    ConflictingGuid {
        guid: Guid,
        first_host: String,
        second_host: String,
    },

    #[error("Source error: {0}")]
    Source(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
