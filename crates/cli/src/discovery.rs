//! GUID collection over SSH
//!
//! Every host is queried independently; at most `concurrency` ssh processes run
//! at once. A host that times out or exits non-zero is reported and skipped.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ibtopo::{DiscoveryReport, GuidSource, HostRecord, TopologyError};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::config::DiscoveryConfig;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Command timed out after {0}s")]
    Timeout(u64),
    #[error("Remote command exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Queries `ibstat` on every host through the local ssh client
#[derive(Debug, Clone)]
pub struct SshGuidSource {
    ssh_bin: String,
    username: Option<String>,
    private_key: Option<PathBuf>,
    ibdevice_pattern: String,
    concurrency: usize,
    timeout: Duration,
}

impl SshGuidSource {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            ssh_bin: config.ssh_bin.clone(),
            username: config.username.clone(),
            private_key: config.private_key.clone(),
            ibdevice_pattern: config.ibdevice_pattern.clone(),
            concurrency: config.concurrency.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Shell pipeline printing one port GUID per line
    pub fn remote_command(&self) -> String {
        format!(
            "ibstatus | grep {} | cut -d ' ' -f 3 | xargs -I% ibstat '%' | grep 'Port GUID' | cut -d ':' -f 2",
            self.ibdevice_pattern
        )
    }

    /// Arguments passed to ssh for one host
    pub fn ssh_args(&self, host: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        if let Some(key) = &self.private_key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        let target = match &self.username {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        };
        args.push(target);
        args.push(self.remote_command());
        args
    }

    async fn fetch_guids(
        program: String,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<String, DiscoveryError> {
        let output = tokio::time::timeout(
            timeout,
            Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| DiscoveryError::Timeout(timeout.as_secs()))?
        .map_err(|source| DiscoveryError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(DiscoveryError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl GuidSource for SshGuidSource {
    async fn collect(&self, hosts: &[String]) -> ibtopo::Result<DiscoveryReport> {
        tracing::info!(
            "Fetching GUIDs from {} hosts with parallelism {}",
            hosts.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(hosts.len());

        for host in hosts {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| TopologyError::Source(format!("Semaphore error: {e}")))?;

            let program = self.ssh_bin.clone();
            let args = self.ssh_args(host);
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                let result = Self::fetch_guids(program, args, timeout).await;
                drop(permit);
                result
            });
            handles.push(handle);
        }

        let mut report = DiscoveryReport::default();
        let results = futures::future::join_all(handles).await;

        for (host, result) in hosts.iter().zip(results) {
            match result {
                Ok(Ok(stdout)) => {
                    let record = HostRecord::from_ibstat_output(host.as_str(), &stdout);
                    if record.guids.is_empty() {
                        tracing::warn!("Host {} reported no GUIDs", host);
                    } else {
                        tracing::debug!("Host {} has {} GUID(s)", host, record.guids.len());
                    }
                    report.record(record);
                }
                Ok(Err(e)) => report.fail(host.as_str(), e.to_string()),
                Err(e) => report.fail(host.as_str(), format!("task panicked: {e}")),
            }
        }

        tracing::info!(
            "Finished collecting GUIDs: {} succeeded, {} failed",
            report.records.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
