//! Injected capabilities: where GUIDs and topology text come from
//!
//! Production implementations shell out (SSH to every host, `sharp_cmd` for the
//! topology); the static ones here serve fixtures and saved artifacts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::resolver::HostRecord;
use crate::Result;

/// A host that could not be queried for its GUIDs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryFailure {
    pub host: String,
    pub reason: String,
}

/// Result of querying a set of hosts. Failed hosts are listed, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub records: Vec<HostRecord>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    pub fn record(&mut self, record: HostRecord) {
        self.records.push(record);
    }

    pub fn fail(&mut self, host: impl Into<String>, reason: impl Into<String>) {
        let failure = DiscoveryFailure {
            host: host.into(),
            reason: reason.into(),
        };
        tracing::error!("Error fetching GUIDs for host {}: {}", failure.host, failure.reason);
        self.failures.push(failure);
    }
}

/// Provider of host to GUID records
#[async_trait]
pub trait GuidSource: Send + Sync {
    async fn collect(&self, hosts: &[String]) -> Result<DiscoveryReport>;
}

/// Provider of raw topology description text for a set of GUIDs
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn topology(&self, guids: &[Guid]) -> Result<String>;
}

/// Fixed records; hosts without a record are reported as failures
#[derive(Debug, Clone, Default)]
pub struct StaticGuidSource {
    records: Vec<HostRecord>,
}

impl StaticGuidSource {
    pub fn new(records: Vec<HostRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl GuidSource for StaticGuidSource {
    async fn collect(&self, hosts: &[String]) -> Result<DiscoveryReport> {
        let mut report = DiscoveryReport::default();
        for host in hosts {
            match self.records.iter().find(|r| &r.address == host) {
                Some(record) => report.record(record.clone()),
                None => report.fail(host, "no record"),
            }
        }
        Ok(report)
    }
}

/// Fixed topology text, e.g. a previously generated `topology.txt`
#[derive(Debug, Clone)]
pub struct StaticTopologySource {
    text: String,
}

impl StaticTopologySource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TopologySource for StaticTopologySource {
    async fn topology(&self, _guids: &[Guid]) -> Result<String> {
        Ok(self.text.clone())
    }
}
