//! Files written into the output directory

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ibtopo::{
    Annotations, DiscoveryFailure, FabricGraph, Guid, GuidTable, TopologyRenderer,
    TorsetAssignment, TorsetLabel, Torsets,
};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::process::Command;

pub const GUID_MAP_FILE: &str = "guid_hosts.json";
pub const REPORT_FILE: &str = "report.json";
pub const DIAGRAM_STEM: &str = "topology";
const HOSTS_FILE_SUFFIX: &str = "_hosts.txt";

/// Summary of one run, written as report.json
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub host_count: usize,
    pub torset_count: usize,
    pub hosts: &'a TorsetAssignment,
    pub torsets: &'a Torsets,
    pub failures: &'a [DiscoveryFailure],
}

impl<'a> RunReport<'a> {
    pub fn new(
        assignment: &'a TorsetAssignment,
        torsets: &'a Torsets,
        failures: &'a [DiscoveryFailure],
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            host_count: assignment.len(),
            torset_count: torsets.len(),
            hosts: assignment,
            torsets,
            failures,
        }
    }
}

/// One GUID per line, the input format of `sharp_cmd --guids_file`
pub fn write_guids(path: &Path, guids: &[Guid]) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for guid in guids {
        writeln!(file, "{guid}")?;
    }
    file.flush()
}

pub fn write_guid_map(path: &Path, table: &GuidTable) -> Result<()> {
    let json = serde_json::to_string_pretty(table)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Load a saved GUID map, normalizing keys and rejecting GUIDs claimed by two hosts
pub fn read_guid_map(path: &Path) -> Result<GuidTable> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading GUID map {}", path.display()))?;
    let pairs: IndexMap<String, String> = serde_json::from_str(&json)
        .with_context(|| format!("parsing GUID map {}", path.display()))?;
    let table = GuidTable::from_pairs(
        pairs
            .into_iter()
            .map(|(guid, host)| (Guid::from_discovered(&guid), host)),
    )
    .with_context(|| format!("loading GUID map {}", path.display()))?;
    Ok(table)
}

/// Delete `torset-NN_hosts.txt` files left by an earlier run
fn remove_torset_files(dir: &Path) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let is_torset_file = name
            .to_str()
            .and_then(|n| n.strip_suffix(HOSTS_FILE_SUFFIX))
            .is_some_and(|label| label.parse::<TorsetLabel>().is_ok());
        if is_torset_file && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("removing {}", entry.path().display()))?;
            tracing::debug!("Removed stale {}", entry.path().display());
        }
    }
    Ok(())
}

/// Write `torset-NN_hosts.txt` for every torset, returning the paths written.
///
/// Torset files from a previous run into the same directory are removed first.
pub fn write_torset_files(dir: &Path, torsets: &Torsets) -> Result<Vec<PathBuf>> {
    remove_torset_files(dir)?;
    let mut written = Vec::with_capacity(torsets.len());
    for torset in torsets.labels() {
        let path = dir.join(torset.hosts_file_name());
        let hosts = torsets.host_list(torset).unwrap_or_default();
        std::fs::write(&path, hosts).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Render the diagram, and convert it to PNG when a Graphviz binary is configured.
///
/// A failed PNG conversion is logged and skipped; the DOT file is still returned.
pub async fn write_diagram(
    dir: &Path,
    renderer: &dyn TopologyRenderer,
    graph: &FabricGraph,
    annotations: &Annotations,
    graphviz_bin: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let source = dir.join(format!("{DIAGRAM_STEM}.{}", renderer.extension()));
    let bytes = renderer.render(graph, annotations)?;
    std::fs::write(&source, bytes).with_context(|| format!("writing {}", source.display()))?;
    let mut written = vec![source.clone()];

    if let Some(bin) = graphviz_bin {
        let png = dir.join(format!("{DIAGRAM_STEM}.png"));
        match graphviz_png(bin, &source, &png).await {
            Ok(()) => written.push(png),
            Err(e) => tracing::warn!("Skipping PNG rendering: {}", e),
        }
    }

    Ok(written)
}

async fn graphviz_png(bin: &Path, source: &Path, png: &Path) -> Result<()> {
    let output = Command::new(bin)
        .arg("-Tpng")
        .arg("-o")
        .arg(png)
        .arg(source)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("running {}", bin.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {:?}: {}",
            bin.display(),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
