//! CLI subcommand handlers
//!
//! `discover` runs the full pipeline against live hosts, `analyze` regroups saved
//! artifacts offline, and `config` inspects or edits the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ibtopo::{Analysis, DiscoveryFailure, DotRenderer, GuidTable};

use crate::artifacts::{self, RunReport, GUID_MAP_FILE, REPORT_FILE};
use crate::config::{Config, RenderConfig};
use crate::discovery::SshGuidSource;
use crate::hosts::read_hosts_file;
use crate::output::OutputHandler;
use crate::sharp::SharpTopologySource;

#[derive(Debug, Clone, Args)]
pub struct DiscoverArgs {
    /// File with one host address per line
    pub hosts_file: PathBuf,

    /// Remote user for ssh
    #[arg(short, long)]
    pub username: Option<String>,

    /// Private key passed to ssh with -i
    #[arg(short = 'k', long)]
    pub private_key: Option<PathBuf>,

    /// Path to the sharp_cmd binary
    #[arg(long)]
    pub sharp_cmd: Option<PathBuf>,

    /// Directory receiving every artifact of the run
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// UCX interface handed to sharp_cmd (e.g. mlx5_ib0:1)
    #[arg(long)]
    pub sharp_smx_ucx_interface: Option<String>,

    /// Pattern matched against ibstatus device names
    #[arg(long)]
    pub ibdevice_pattern: Option<String>,

    /// Hosts queried at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Skip the topology diagram
    #[arg(long)]
    pub no_render: bool,
}

impl DiscoverArgs {
    /// Layer command line flags over the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(username) = &self.username {
            config.discovery.username = Some(username.clone());
        }
        if let Some(key) = &self.private_key {
            config.discovery.private_key = Some(key.clone());
        }
        if let Some(cmd) = &self.sharp_cmd {
            config.sharp.cmd_path = Some(cmd.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(interface) = &self.sharp_smx_ucx_interface {
            config.sharp.ucx_interface = interface.clone();
        }
        if let Some(pattern) = &self.ibdevice_pattern {
            config.discovery.ibdevice_pattern = pattern.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.discovery.concurrency = concurrency;
        }
        if self.no_render {
            config.render.enabled = false;
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Topology file produced by `sharp_cmd topology`
    #[arg(short, long)]
    pub topology: PathBuf,

    /// GUID to host map written by a previous discover run
    #[arg(short, long)]
    pub guid_map: PathBuf,

    /// Directory receiving the torset files and report
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip the topology diagram
    #[arg(long)]
    pub no_render: bool,
}

impl AnalyzeArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.no_render {
            config.render.enabled = false;
        }
    }
}

/// Collect GUIDs over ssh, generate the topology with sharp_cmd and group the hosts
pub async fn discover(config: &Config, args: &DiscoverArgs, output: &OutputHandler) -> Result<()> {
    let mut config = config.clone();
    args.apply(&mut config);

    let hosts = read_hosts_file(&args.hosts_file)?;
    if hosts.is_empty() {
        anyhow::bail!("No hosts listed in {}", args.hosts_file.display());
    }
    let cmd_path = config.sharp.cmd_path.clone().context(
        "sharp_cmd path not set; pass --sharp-cmd or set sharp.cmd_path in the config",
    )?;

    let out_dir = &config.output.dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    output.print_header(&format!("Discovering fabric of {} hosts", hosts.len()));
    output.print_info(&format!("Writing artifacts to {}", out_dir.display()));

    let guid_source = SshGuidSource::new(&config.discovery);
    let topology_source =
        SharpTopologySource::new(cmd_path, config.sharp.ucx_interface.clone(), out_dir);

    let discovery = ibtopo::discover(&hosts, &guid_source, &topology_source).await?;

    let guid_map = out_dir.join(GUID_MAP_FILE);
    artifacts::write_guid_map(&guid_map, &discovery.table)?;

    let mut written = vec![
        topology_source.guids_file(),
        topology_source.topology_file(),
        guid_map,
    ];
    written.extend(
        write_analysis(
            out_dir,
            &config.render,
            &discovery.table,
            &discovery.analysis,
            &discovery.failures,
        )
        .await?,
    );

    print_summary(output, &discovery.analysis, &discovery.failures, &written);
    Ok(())
}

/// Group hosts from a saved topology file and GUID map
pub async fn analyze(config: &Config, args: &AnalyzeArgs, output: &OutputHandler) -> Result<()> {
    let mut config = config.clone();
    args.apply(&mut config);

    let table = artifacts::read_guid_map(&args.guid_map)?;
    let topology = std::fs::read_to_string(&args.topology)
        .with_context(|| format!("reading topology {}", args.topology.display()))?;

    let out_dir = &config.output.dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    output.print_header(&format!("Analyzing {}", args.topology.display()));
    output.print_info(&format!("Writing artifacts to {}", out_dir.display()));

    let analysis = ibtopo::analyze(&table, &topology)?;
    tracing::info!("{} hosts identified", analysis.assignment.len());
    tracing::info!("{} torsets identified", analysis.torsets.len());

    let written = write_analysis(out_dir, &config.render, &table, &analysis, &[]).await?;

    print_summary(output, &analysis, &[], &written);
    Ok(())
}

/// Torset files, report and diagram shared by both commands
async fn write_analysis(
    out_dir: &Path,
    render: &RenderConfig,
    table: &GuidTable,
    analysis: &Analysis,
    failures: &[DiscoveryFailure],
) -> Result<Vec<PathBuf>> {
    let mut written = artifacts::write_torset_files(out_dir, &analysis.torsets)?;

    let report_path = out_dir.join(REPORT_FILE);
    let report = RunReport::new(&analysis.assignment, &analysis.torsets, failures);
    artifacts::write_report(&report_path, &report)?;
    written.push(report_path);

    if render.enabled {
        written.extend(
            artifacts::write_diagram(
                out_dir,
                &DotRenderer,
                &analysis.topology.graph,
                &analysis.annotations(table),
                render.graphviz_bin.as_deref(),
            )
            .await?,
        );
    }

    Ok(written)
}

fn print_summary(
    output: &OutputHandler,
    analysis: &Analysis,
    failures: &[DiscoveryFailure],
    written: &[PathBuf],
) {
    output.print_torsets_table(&analysis.torsets);
    output.print_failures(failures);
    output.print_success(&format!(
        "{} hosts in {} torsets",
        analysis.assignment.len(),
        analysis.torsets.len()
    ));
    output.print_artifacts(written);
}

/// Show current configuration
pub fn show_config(config: &Config, path: Option<&Path>, output: &OutputHandler) -> Result<()> {
    output.print_header("Configuration");

    println!();
    println!("{}", toml::to_string_pretty(config)?);
    println!(
        "  {} {}",
        "Config file:".dimmed(),
        path.map(Path::to_path_buf)
            .unwrap_or_else(Config::config_path)
            .display()
    );

    Ok(())
}

/// Set a configuration value
pub fn set_config(path: Option<&Path>, kv: &str, output: &OutputHandler) -> Result<()> {
    let Some((key, value)) = kv.split_once('=') else {
        anyhow::bail!("Invalid format {:?}. Use: key=value", kv);
    };

    let key = key.trim();
    let value = value.trim().trim_matches('"');

    let mut config = Config::load(path)?;
    config
        .set(key, value)
        .with_context(|| format!("Failed to set {}", key))?;
    config.save(path)?;

    let stored = config.get(key).unwrap_or_default();
    output.print_success(&format!("Set {} = \"{}\"", key, stored));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharp::TOPOLOGY_FILE;
    use std::os::unix::fs::PermissionsExt;

    const TOPOLOGY: &str = "\
SwitchName=ibsw0 Switches=ibsw1,ibsw2
SwitchName=ibsw1 Nodes=0x155dfffd341acb,0x155dfffd341afb
SwitchName=ibsw2 Nodes=0x155dfffd34193b
";

    const GUID_MAP: &str = r#"{
  "0x155dfffd341acb": "10.0.0.1",
  "0x155dfffd341afb": "10.0.0.2",
  "0x155dfffd34193b": "10.0.0.3"
}"#;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn analyze_args(dir: &Path) -> AnalyzeArgs {
        let topology = dir.join("topology.txt");
        let guid_map = dir.join("guid_hosts.json");
        std::fs::write(&topology, TOPOLOGY).unwrap();
        std::fs::write(&guid_map, GUID_MAP).unwrap();
        AnalyzeArgs {
            topology,
            guid_map,
            output_dir: Some(dir.join("out")),
            no_render: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = DiscoverArgs {
            hosts_file: PathBuf::from("hosts.txt"),
            username: Some("azureuser".to_string()),
            private_key: None,
            sharp_cmd: Some(PathBuf::from("/opt/sharp/bin/sharp_cmd")),
            output_dir: None,
            sharp_smx_ucx_interface: Some("mlx5_ib1:1".to_string()),
            ibdevice_pattern: None,
            concurrency: Some(4),
            no_render: true,
        };
        let mut config = Config::default();
        config.discovery.ibdevice_pattern = "mlx5_ib2".to_string();

        args.apply(&mut config);

        assert_eq!(config.discovery.username.as_deref(), Some("azureuser"));
        assert_eq!(config.discovery.ibdevice_pattern, "mlx5_ib2");
        assert_eq!(config.discovery.concurrency, 4);
        assert_eq!(config.sharp.ucx_interface, "mlx5_ib1:1");
        assert_eq!(config.output.dir, PathBuf::from("ibtopo-out"));
        assert!(!config.render.enabled);
    }

    #[tokio::test]
    async fn test_analyze_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let args = analyze_args(dir.path());

        analyze(&Config::default(), &args, &OutputHandler::new(true))
            .await
            .unwrap();

        let out = dir.path().join("out");
        assert_eq!(
            std::fs::read_to_string(out.join("torset-00_hosts.txt")).unwrap(),
            "10.0.0.1\n10.0.0.2\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("torset-01_hosts.txt")).unwrap(),
            "10.0.0.3\n"
        );
        assert!(out.join(REPORT_FILE).exists());
        assert!(out.join("topology.dot").exists());
    }

    #[tokio::test]
    async fn test_analyze_without_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = analyze_args(dir.path());
        args.no_render = true;

        analyze(&Config::default(), &args, &OutputHandler::new(true))
            .await
            .unwrap();

        assert!(!dir.path().join("out").join("topology.dot").exists());
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_guid() {
        let dir = tempfile::tempdir().unwrap();
        let args = analyze_args(dir.path());
        std::fs::write(
            &args.topology,
            format!("{TOPOLOGY}SwitchName=ibsw3 Nodes=0x155dfffd3419ff\n"),
        )
        .unwrap();

        let err = analyze(&Config::default(), &args, &OutputHandler::new(true))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("0x155dfffd3419ff"));
    }

    #[tokio::test]
    async fn test_discover_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let hosts_file = dir.path().join("hosts.txt");
        std::fs::write(&hosts_file, "10.0.0.1\n10.0.0.2\nnode-down\n").unwrap();

        let ssh = script(
            dir.path(),
            "fake-ssh",
            "#!/bin/sh\n\
             case \"$*\" in\n\
               *down*) echo 'ssh: Could not resolve hostname' >&2; exit 255 ;;\n\
               *10.0.0.1\\ *) echo ' 0x00155dfffd341acb' ;;\n\
               *) echo ' 0x00155dfffd341afb' ;;\n\
             esac\n",
        );
        let sharp = script(
            dir.path(),
            "fake-sharp",
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               case \"$1\" in\n\
                 --guids_file) guids=\"$2\"; shift ;;\n\
                 --topology_file) topo=\"$2\"; shift ;;\n\
               esac\n\
               shift\n\
             done\n\
             printf 'SwitchName=ibsw1 Nodes=%s\\n' \"$(paste -sd, \"$guids\")\" > \"$topo\"\n",
        );

        let mut config = Config::default();
        config.discovery.ssh_bin = ssh.display().to_string();
        let out = dir.path().join("out");
        let args = DiscoverArgs {
            hosts_file,
            username: None,
            private_key: None,
            sharp_cmd: Some(sharp),
            output_dir: Some(out.clone()),
            sharp_smx_ucx_interface: None,
            ibdevice_pattern: None,
            concurrency: Some(2),
            no_render: true,
        };

        discover(&config, &args, &OutputHandler::new(true))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(out.join(TOPOLOGY_FILE)).unwrap(),
            "SwitchName=ibsw1 Nodes=0x155dfffd341acb,0x155dfffd341afb\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("torset-00_hosts.txt")).unwrap(),
            "10.0.0.1\n10.0.0.2\n"
        );

        let table = artifacts::read_guid_map(&out.join(GUID_MAP_FILE)).unwrap();
        assert_eq!(table.len(), 2);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(report["torset_count"], 1);
        assert_eq!(report["failures"][0]["host"], "node-down");
    }

    #[tokio::test]
    async fn test_discover_requires_sharp_cmd() {
        let dir = tempfile::tempdir().unwrap();
        let hosts_file = dir.path().join("hosts.txt");
        std::fs::write(&hosts_file, "10.0.0.1\n").unwrap();
        let args = DiscoverArgs {
            hosts_file,
            username: None,
            private_key: None,
            sharp_cmd: None,
            output_dir: Some(dir.path().join("out")),
            sharp_smx_ucx_interface: None,
            ibdevice_pattern: None,
            concurrency: None,
            no_render: true,
        };

        let err = discover(&Config::default(), &args, &OutputHandler::new(true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sharp_cmd path not set"));
    }

    #[test]
    fn test_set_config_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = OutputHandler::new(true);

        set_config(Some(&path), "sharp.ucx_interface=\"mlx5_ib3:1\"", &output).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sharp.ucx_interface, "mlx5_ib3:1");
    }

    #[test]
    fn test_set_config_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = OutputHandler::new(true);

        assert!(set_config(Some(&path), "sharp.ucx_interface", &output).is_err());
        assert!(set_config(Some(&path), "server.url=http://x", &output).is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_analyze_twice_into_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = analyze_args(dir.path());
        let output = OutputHandler::new(true);

        analyze(&Config::default(), &args, &output).await.unwrap();
        std::fs::write(
            &args.topology,
            "SwitchName=ibsw1 Nodes=0x155dfffd341acb,0x155dfffd341afb,0x155dfffd34193b\n",
        )
        .unwrap();
        analyze(&Config::default(), &args, &output).await.unwrap();

        let out = dir.path().join("out");
        let mut torset_files: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("torset-"))
            .collect();
        torset_files.sort();

        assert_eq!(torset_files, vec!["torset-00_hosts.txt"]);
        assert_eq!(
            std::fs::read_to_string(out.join("torset-00_hosts.txt")).unwrap(),
            "10.0.0.1\n10.0.0.2\n10.0.0.3\n"
        );
    }
}
