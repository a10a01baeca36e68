//! Hosts file: one address per line

use std::path::Path;

use anyhow::{Context, Result};

/// Read the host list, skipping blank lines and `#` comments
pub fn read_hosts_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading hosts file {}", path.display()))?;
    Ok(parse_hosts(&content))
}

pub fn parse_hosts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosts() {
        let hosts = parse_hosts("10.0.0.1\n  10.0.0.2  \n\n# spare\n10.0.0.3\n");
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_hosts_file(Path::new("/nonexistent/hosts.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hosts.txt"));
    }
}
