//! GUID to host resolution

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::{Result, TopologyError};

/// GUIDs collected from one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Address used to reach the host, usually an IP
    pub address: String,
    /// Canonical port GUIDs exposed by the host
    pub guids: Vec<Guid>,
}

impl HostRecord {
    pub fn new(address: impl Into<String>, guids: Vec<Guid>) -> Self {
        Self {
            address: address.into(),
            guids,
        }
    }

    /// Build a record from raw `ibstat` output, one GUID per whitespace-separated token
    pub fn from_ibstat_output(address: impl Into<String>, stdout: &str) -> Self {
        let guids = stdout.split_whitespace().map(Guid::from_discovered).collect();
        Self::new(address, guids)
    }
}

/// Canonical GUID to host address lookup, in collection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuidTable {
    entries: IndexMap<Guid, String>,
}

impl GuidTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from discovered host records.
    ///
    /// A GUID claimed by two different hosts is rejected; the same host repeating a
    /// GUID is harmless.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a HostRecord>) -> Result<Self> {
        let mut table = Self::new();
        for record in records {
            for guid in &record.guids {
                table.insert(guid.clone(), &record.address)?;
            }
        }
        Ok(table)
    }

    /// Build the table from already-canonical pairs
    pub fn from_pairs<G, H>(pairs: impl IntoIterator<Item = (G, H)>) -> Result<Self>
    where
        G: Into<Guid>,
        H: Into<String>,
    {
        let mut table = Self::new();
        for (guid, host) in pairs {
            let host: String = host.into();
            table.insert(guid.into(), &host)?;
        }
        Ok(table)
    }

    fn insert(&mut self, guid: Guid, host: &str) -> Result<()> {
        if !guid.is_canonical() {
            tracing::warn!("GUID {} from {} is not in canonical form", guid, host);
        }

        match self.entries.get(&guid) {
            Some(existing) if existing == host => Ok(()),
            Some(existing) => Err(TopologyError::ConflictingGuid {
                guid,
                first_host: existing.clone(),
                second_host: host.to_string(),
            }),
            None => {
                self.entries.insert(guid, host.to_string());
                Ok(())
            }
        }
    }

    /// Get the host owning a GUID
    pub fn resolve(&self, guid: &Guid) -> Option<&str> {
        self.entries.get(guid).map(String::as_str)
    }

    /// GUIDs in collection order; this is what `sharp_cmd` is fed
    pub fn guids(&self) -> impl Iterator<Item = &Guid> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Guid, &str)> {
        self.entries.iter().map(|(g, h)| (g, h.as_str()))
    }

    /// Distinct hosts in the order their first GUID was collected
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = Vec::new();
        for host in self.entries.values() {
            if !hosts.contains(&host.as_str()) {
                hosts.push(host);
            }
        }
        hosts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ibstat_output_is_normalized_on_collection() {
        let record = HostRecord::from_ibstat_output(
            "10.0.0.1",
            " 0x00155dfffd341acb\n 0x00155dfffd341afb\n",
        );
        assert_eq!(
            record.guids,
            vec![
                Guid::new("0x155dfffd341acb"),
                Guid::new("0x155dfffd341afb")
            ]
        );

        let table = GuidTable::from_records([&record]).unwrap();
        // topology description form resolves
        assert_eq!(table.resolve(&Guid::new("0x155dfffd341acb")), Some("10.0.0.1"));
        assert_eq!(table.resolve(&Guid::new("0x00155dfffd341acb")), None);
    }

    #[test]
    fn test_multi_port_hosts() {
        let table = GuidTable::from_pairs([
            ("0xaaa", "h1"),
            ("0xbbb", "h1"),
            ("0xccc", "h2"),
        ])
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.hosts(), vec!["h1", "h2"]);
        assert_eq!(table.resolve(&Guid::new("0xbbb")), Some("h1"));
    }

    #[test]
    fn test_guid_claimed_by_two_hosts_is_rejected() {
        let records = vec![
            HostRecord::new("10.0.0.1", vec![Guid::new("0xaaa")]),
            HostRecord::new("10.0.0.2", vec![Guid::new("0xaaa")]),
        ];
        let err = GuidTable::from_records(&records).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::ConflictingGuid { ref first_host, ref second_host, .. }
                if first_host == "10.0.0.1" && second_host == "10.0.0.2"
        ));
    }

    #[test]
    fn test_repeated_guid_from_same_host_is_kept_once() {
        let records = vec![HostRecord::new(
            "10.0.0.1",
            vec![Guid::new("0xaaa"), Guid::new("0xaaa")],
        )];
        let table = GuidTable::from_records(&records).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_guid_order_follows_collection() {
        let records = vec![
            HostRecord::new("10.0.0.2", vec![Guid::new("0xbbb")]),
            HostRecord::new("10.0.0.1", vec![Guid::new("0xaaa")]),
        ];
        let table = GuidTable::from_records(&records).unwrap();
        let guids: Vec<&str> = table.guids().map(Guid::as_str).collect();
        assert_eq!(guids, vec!["0xbbb", "0xaaa"]);
    }

    #[test]
    fn test_roundtrips_through_json_map() {
        let table = GuidTable::from_pairs([("0x155dfffd341acb", "10.0.0.1")]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"0x155dfffd341acb":"10.0.0.1"}"#);
        let back: GuidTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
