//! Shared test fixture: 16 hosts behind 12 leaf switches, 3 aggregation switches

use crate::resolver::{GuidTable, HostRecord};

pub(crate) const TOPOLOGY: &str = "\
# sharp_cmd topology
SwitchName=ibsw0 Switches=ibsw1,ibsw2
SwitchName=ibsw1 Switches=ibsw0,ibsw3,ibsw4,ibsw5,ibsw6,ibsw7,ibsw8
SwitchName=ibsw2 Switches=ibsw0,ibsw9,ibsw10,ibsw11,ibsw12,ibsw13,ibsw14
SwitchName=ibsw3 Switches=ibsw1

SwitchName=ibsw3 Nodes=0x155dfffd341acb,0x155dfffd341afb
SwitchName=ibsw4 Nodes=0x155dfffd34193b
SwitchName=ibsw5 Nodes=0x155dfffd341b0b
SwitchName=ibsw6 Nodes=0x155dfffd34168b,0x155dfffd3416bb
SwitchName=ibsw7 Nodes=0x155dfffd341b23
SwitchName=ibsw8 Nodes=0x155dfffd34136b
SwitchName=ibsw9 Nodes=0x155dfffd34110b,0x155dfffd341b1b
SwitchName=ibsw10 Nodes=0x155dfffd341adb
SwitchName=ibsw11 Nodes=0x155dfffd341b03
SwitchName=ibsw12 Nodes=0x155dfffd341a03,0x155dfffd341aeb
SwitchName=ibsw13 Nodes=0x155dfffd341abb
SwitchName=ibsw14 Nodes=0x155dfffd341ad3
";

pub(crate) const GUID_HOSTS: [(&str, &str); 16] = [
    ("0x155dfffd341acb", "10.0.0.1"),
    ("0x155dfffd341afb", "10.0.0.2"),
    ("0x155dfffd34193b", "10.0.0.3"),
    ("0x155dfffd341b0b", "10.0.0.4"),
    ("0x155dfffd34168b", "10.0.0.5"),
    ("0x155dfffd3416bb", "10.0.0.6"),
    ("0x155dfffd341b23", "10.0.0.7"),
    ("0x155dfffd34136b", "10.0.0.8"),
    ("0x155dfffd34110b", "10.0.0.9"),
    ("0x155dfffd341b1b", "10.0.0.10"),
    ("0x155dfffd341adb", "10.0.0.11"),
    ("0x155dfffd341b03", "10.0.0.12"),
    ("0x155dfffd341a03", "10.0.0.13"),
    ("0x155dfffd341aeb", "10.0.0.14"),
    ("0x155dfffd341abb", "10.0.0.15"),
    ("0x155dfffd341ad3", "10.0.0.16"),
];

pub(crate) fn guid_table() -> GuidTable {
    GuidTable::from_pairs(GUID_HOSTS).expect("fixture GUIDs are unique")
}

pub(crate) fn hosts() -> Vec<String> {
    GUID_HOSTS.iter().map(|(_, h)| h.to_string()).collect()
}

/// Host records as `ibstat` reports them, with the redundant zero byte
pub(crate) fn ibstat_records() -> Vec<HostRecord> {
    GUID_HOSTS
        .iter()
        .map(|(guid, host)| {
            let raw = guid.replacen("0x", "0x00", 1);
            HostRecord::from_ibstat_output(*host, &format!(" {raw}\n"))
        })
        .collect()
}
