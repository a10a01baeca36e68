//! Torset assignment - grouping hosts by the switch enclosure they hang off

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parser::SwitchNodes;
use crate::resolver::GuidTable;
use crate::{Result, TopologyError};

/// A torset label, rendered as `torset-00`, `torset-01`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TorsetLabel(pub usize);

impl TorsetLabel {
    pub fn index(&self) -> usize {
        self.0
    }

    /// File name of the host list written for this torset
    pub fn hosts_file_name(&self) -> String {
        format!("{self}_hosts.txt")
    }
}

impl fmt::Display for TorsetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "torset-{:02}", self.0)
    }
}

impl std::str::FromStr for TorsetLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.strip_prefix("torset-")
            .and_then(|n| n.parse().ok())
            .map(TorsetLabel)
            .ok_or_else(|| format!("invalid torset label: {s}"))
    }
}

impl Serialize for TorsetLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TorsetLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Host address to torset, in assignment order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorsetAssignment {
    hosts: IndexMap<String, TorsetLabel>,
}

impl TorsetAssignment {
    /// Look up the torset of a host
    pub fn torset_of(&self, host: &str) -> Option<TorsetLabel> {
        self.hosts.get(host).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TorsetLabel)> {
        self.hosts.iter().map(|(h, t)| (h.as_str(), *t))
    }

    /// Number of distinct labels handed out so far
    pub fn distinct_torsets(&self) -> usize {
        self.hosts.values().collect::<HashSet<_>>().len()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Torset to host addresses, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Torsets {
    groups: IndexMap<TorsetLabel, Vec<String>>,
}

impl Torsets {
    pub fn hosts(&self, torset: TorsetLabel) -> Option<&[String]> {
        self.groups.get(&torset).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TorsetLabel, &[String])> {
        self.groups.iter().map(|(t, h)| (*t, h.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = TorsetLabel> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Newline-separated host list, as written to `torset-NN_hosts.txt`
    pub fn host_list(&self, torset: TorsetLabel) -> Option<String> {
        self.groups.get(&torset).map(|hosts| {
            hosts.iter().fold(String::new(), |mut out, h| {
                out.push_str(h);
                out.push('\n');
                out
            })
        })
    }
}

/// Walk the per-switch device lists and label every host the first time it shows up.
///
/// The label for a switch is the number of distinct labels handed out before that
/// switch, recomputed from the assignment rather than kept in a counter. All hosts
/// first seen at one switch share its label, and a switch that only lists known
/// hosts hands out nothing, so the next switch reuses the same number.
///
/// Every GUID must resolve; an unknown one means the topology snapshot and the GUID
/// collection disagree and the run is aborted.
pub fn identify_torsets(switch_nodes: &[SwitchNodes], table: &GuidTable) -> Result<TorsetAssignment> {
    let mut assignment = TorsetAssignment::default();

    for entry in switch_nodes {
        let label = TorsetLabel(assignment.distinct_torsets());
        let mut new_hosts = 0usize;

        for guid in entry.guids() {
            let host = table
                .resolve(&guid)
                .ok_or_else(|| TopologyError::UnresolvableGuid {
                    guid: guid.clone(),
                    switch: entry.switch.clone(),
                    line: entry.line,
                })?;

            if assignment.hosts.contains_key(host) {
                continue;
            }
            assignment.hosts.insert(host.to_string(), label);
            new_hosts += 1;
        }

        if new_hosts > 0 {
            tracing::debug!("Switch {} -> {} ({} new host(s))", entry.switch, label, new_hosts);
        }
    }

    tracing::info!(
        "Assigned {} hosts to {} torsets",
        assignment.len(),
        assignment.distinct_torsets()
    );
    Ok(assignment)
}

/// Invert a host to torset assignment into torset to hosts
pub fn group_hosts_by_torset(assignment: &TorsetAssignment) -> Torsets {
    let mut groups: IndexMap<TorsetLabel, Vec<String>> = IndexMap::new();
    for (host, torset) in assignment.iter() {
        groups.entry(torset).or_default().push(host.to_string());
    }
    Torsets { groups }
}
