//! pfstat - print pf counters once.
//!
//! Parses a saved `pfctl -s info` capture, or runs pfctl when no capture is
//! given, and prints the counters as an aligned table or as JSON.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pfstat_core::collector::{Collector, Counters, PfctlParser, SystemRunner};
use pfstat_core::config::PfConfig;

#[derive(Parser)]
#[command(name = "pfstat", about = "Print pf counters from pfctl -s info", version)]
struct Cli {
    /// Saved `pfctl -s info` output, or "-" for stdin. Runs pfctl when omitted.
    path: Option<PathBuf>,

    /// Run pfctl through doas.
    #[arg(long)]
    use_sudo: bool,

    /// Also show IPv6 interface counters.
    #[arg(long)]
    ipv6_counters: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let counters = match load_counters(&cli) {
        Ok(counters) => counters,
        Err(e) => {
            eprintln!("pfstat: {e}");
            std::process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&counters) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("pfstat: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", format_table(&counters));
    }
}

fn load_counters(cli: &Cli) -> Result<Counters, Box<dyn std::error::Error>> {
    let Some(path) = &cli.path else {
        let config = PfConfig::default()
            .with_sudo(cli.use_sudo)
            .with_ipv6_counters(cli.ipv6_counters);
        let mut collector = Collector::new(SystemRunner::new(), config);
        return Ok(collector.collect()?);
    };

    let text = read_capture(path)?;
    debug!("read {} bytes from {}", text.len(), path.display());
    Ok(PfctlParser::with_ipv6_counters(cli.ipv6_counters).parse(&text)?)
}

fn read_capture(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

/// Formats counters as `key  value` rows with right-aligned values.
fn format_table(counters: &Counters) -> String {
    let key_width = counters.keys().map(String::len).max().unwrap_or(0);
    let value_width = counters
        .values()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (key, value) in counters {
        out.push_str(&format!("{key:<key_width$}  {value:>value_width$}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfstat_core::collector::mock::scenarios;

    #[test]
    fn format_table_aligns_columns() {
        let mut counters = Counters::new();
        counters.insert("entries".to_string(), 2);
        counters.insert("bad-timestamp".to_string(), 11325);

        let table = format_table(&counters);
        assert_eq!(table, "bad-timestamp  11325\nentries            2\n");
    }

    #[test]
    fn format_table_empty() {
        assert_eq!(format_table(&Counters::new()), "");
    }

    #[test]
    fn load_counters_from_capture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.txt");
        fs::write(&path, scenarios::PFCTL_INFO_FULL).unwrap();

        let cli = Cli::parse_from(["pfstat", path.to_str().unwrap()]);
        let counters = load_counters(&cli).unwrap();
        assert_eq!(counters.len(), 25);
        assert_eq!(counters["packets-out-blocked"], 5);
    }

    #[test]
    fn load_counters_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disabled.txt");
        fs::write(&path, scenarios::PFCTL_DISABLED).unwrap();

        let cli = Cli::parse_from(["pfstat", path.to_str().unwrap()]);
        let err = load_counters(&cli).unwrap_err();
        assert!(err.to_string().contains("State Table"));
    }
}
