//! Topology generation with `sharp_cmd topology`

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use ibtopo::{Guid, TopologyError, TopologySource};
use thiserror::Error;
use tokio::process::Command;

use crate::artifacts;

pub const GUIDS_FILE: &str = "guids.txt";
pub const TOPOLOGY_FILE: &str = "topology.txt";

#[derive(Debug, Error)]
pub enum SharpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sharp_cmd exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("sharp_cmd succeeded but did not write {}", .0.display())]
    MissingTopology(PathBuf),
}

impl From<SharpError> for TopologyError {
    fn from(err: SharpError) -> Self {
        TopologyError::Source(err.to_string())
    }
}

/// Runs `sharp_cmd` against the collected GUIDs and reads back the topology file
#[derive(Debug, Clone)]
pub struct SharpTopologySource {
    cmd_path: PathBuf,
    ucx_interface: String,
    output_dir: PathBuf,
}

impl SharpTopologySource {
    pub fn new(cmd_path: PathBuf, ucx_interface: impl Into<String>, output_dir: &Path) -> Self {
        Self {
            cmd_path,
            ucx_interface: ucx_interface.into(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn guids_file(&self) -> PathBuf {
        self.output_dir.join(GUIDS_FILE)
    }

    pub fn topology_file(&self) -> PathBuf {
        self.output_dir.join(TOPOLOGY_FILE)
    }

    fn args(&self) -> Vec<String> {
        vec![
            "topology".to_string(),
            "--ib-dev".to_string(),
            self.ucx_interface.clone(),
            "--guids_file".to_string(),
            self.guids_file().display().to_string(),
            "--topology_file".to_string(),
            self.topology_file().display().to_string(),
        ]
    }

    async fn generate(&self, guids: &[Guid]) -> Result<String, SharpError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        artifacts::write_guids(&self.guids_file(), guids)?;
        tracing::info!("GUIDs written to {}", self.guids_file().display());

        let topology_file = self.topology_file();
        match tokio::fs::remove_file(&topology_file).await {
            Ok(()) => tracing::debug!("Removed stale {}", topology_file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let output = Command::new(&self.cmd_path)
            .args(self.args())
            .env("SHARP_SMX_UCX_INTERFACE", &self.ucx_interface)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(SharpError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = match tokio::fs::read_to_string(&topology_file).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SharpError::MissingTopology(topology_file));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Topology file generated at {}", topology_file.display());
        Ok(text)
    }
}

#[async_trait]
impl TopologySource for SharpTopologySource {
    async fn topology(&self, guids: &[Guid]) -> ibtopo::Result<String> {
        Ok(self.generate(guids).await?)
    }
}
