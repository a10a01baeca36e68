//! Output formatting and terminal rendering
//!
//! Run summaries with colors: torset table, discovery failures, written artifacts.

use std::path::PathBuf;

use colored::Colorize;
use ibtopo::{DiscoveryFailure, Torsets};

/// Hosts shown per torset row before the list is elided
const MAX_HOSTS_SHOWN: usize = 4;

/// Output handler for terminal display
pub struct OutputHandler {
    pub quiet: bool,
}

impl OutputHandler {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        if !self.quiet {
            println!("{} {}", "✓".bright_green(), text.bright_white());
        }
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        eprintln!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        if !self.quiet {
            println!("{} {}", "⚠".bright_yellow(), text.yellow());
        }
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        if !self.quiet {
            println!("{} {}", "ℹ".bright_blue(), text);
        }
    }

    /// Print torsets table
    pub fn print_torsets_table(&self, torsets: &Torsets) {
        if self.quiet {
            return;
        }
        println!();
        println!(
            "{}",
            format!("{:<12} {:>6}  {}", "Torset", "Hosts", "Members")
                .bright_white()
                .bold()
        );
        println!("{}", "─".repeat(60).dimmed());

        for (torset, hosts) in torsets.iter() {
            println!(
                "{:<12} {:>6}  {}",
                torset.to_string().bright_cyan(),
                hosts.len(),
                summarize_hosts(hosts)
            );
        }
        println!();
    }

    /// Print hosts that could not be queried
    pub fn print_failures(&self, failures: &[DiscoveryFailure]) {
        if failures.is_empty() {
            return;
        }
        self.print_warning(&format!("{} host(s) could not be queried:", failures.len()));
        if self.quiet {
            return;
        }
        for failure in failures {
            println!("    {} {}", format!("{}:", failure.host).dimmed(), failure.reason);
        }
    }

    /// Print the files written by a run
    pub fn print_artifacts(&self, paths: &[PathBuf]) {
        if self.quiet {
            return;
        }
        for path in paths {
            println!("  {} {}", "Wrote:".bright_green(), path.display());
        }
    }
}

fn summarize_hosts(hosts: &[String]) -> String {
    if hosts.len() <= MAX_HOSTS_SHOWN {
        return hosts.join(", ");
    }
    format!(
        "{}, ... (+{})",
        hosts[..MAX_HOSTS_SHOWN].join(", "),
        hosts.len() - MAX_HOSTS_SHOWN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("10.0.0.{i}")).collect()
    }

    #[test]
    fn test_summarize_short_list() {
        assert_eq!(summarize_hosts(&hosts(2)), "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_summarize_long_list() {
        assert_eq!(
            summarize_hosts(&hosts(6)),
            "10.0.0.1, 10.0.0.2, 10.0.0.3, 10.0.0.4, ... (+2)"
        );
    }
}
