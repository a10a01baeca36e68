//! End-to-end discovery: collect -> table -> topology -> parse -> assign -> group

use crate::parser::{parse_topology, ParsedTopology};
use crate::render::Annotations;
use crate::resolver::GuidTable;
use crate::source::{DiscoveryFailure, GuidSource, TopologySource};
use crate::torset::{group_hosts_by_torset, identify_torsets, TorsetAssignment, Torsets};
use crate::{Result, TopologyError};

/// Outcome of grouping one topology snapshot
#[derive(Debug, Clone)]
pub struct Analysis {
    pub topology: ParsedTopology,
    pub assignment: TorsetAssignment,
    pub torsets: Torsets,
}

impl Analysis {
    /// Vertex annotations for renderers
    pub fn annotations(&self, table: &GuidTable) -> Annotations {
        Annotations::new(table, &self.assignment)
    }
}

/// Outcome of a full discovery run
#[derive(Debug, Clone)]
pub struct Discovery {
    pub table: GuidTable,
    pub failures: Vec<DiscoveryFailure>,
    pub topology_text: String,
    pub analysis: Analysis,
}

impl Discovery {
    pub fn annotations(&self) -> Annotations {
        self.analysis.annotations(&self.table)
    }
}

/// Group hosts from a topology description and an existing GUID table
pub fn analyze(table: &GuidTable, topology_text: &str) -> Result<Analysis> {
    let topology = parse_topology(topology_text)?;
    let assignment = identify_torsets(&topology.switch_nodes, table)?;
    let torsets = group_hosts_by_torset(&assignment);

    Ok(Analysis {
        topology,
        assignment,
        torsets,
    })
}

/// Run the whole discovery against the given sources
pub async fn discover(
    hosts: &[String],
    guid_source: &dyn GuidSource,
    topology_source: &dyn TopologySource,
) -> Result<Discovery> {
    let report = guid_source.collect(hosts).await?;
    let table = GuidTable::from_records(&report.records)?;
    tracing::info!(
        "Collected {} GUIDs from {} of {} hosts",
        table.len(),
        report.records.len(),
        hosts.len()
    );

    if table.is_empty() {
        return Err(TopologyError::Source(
            "no GUIDs collected from any host".to_string(),
        ));
    }

    let guids: Vec<_> = table.guids().cloned().collect();
    let topology_text = topology_source.topology(&guids).await?;

    let analysis = analyze(&table, &topology_text)?;
    tracing::info!("{} hosts identified", analysis.assignment.len());
    tracing::info!("{} torsets identified", analysis.torsets.len());

    Ok(Discovery {
        table,
        failures: report.failures,
        topology_text,
        analysis,
    })
}
