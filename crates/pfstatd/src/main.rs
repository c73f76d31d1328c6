//! pfstatd - pf counters collector daemon.
//!
//! Periodically runs `pfctl -s info`, parses it and emits the counters as
//! JSON lines (stdout or an append-only file) or as log records.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pfstat_core::collector::{Collector, Counters, SystemRunner};
use pfstat_core::config::{DEFAULT_SUDO_COMMAND, PfConfig};
use pfstat_core::sink::{CounterSink, JsonLinesSink, LogSink};

/// pf counters collector daemon.
#[derive(Parser)]
#[command(name = "pfstatd", about = "pf counters collector daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "10", env = "PFSTAT_INTERVAL")]
    interval: u64,

    /// Path to pfctl. Searched in PATH when not set.
    #[arg(long, value_name = "PATH", env = "PFSTAT_PFCTL_COMMAND")]
    pfctl_command: Option<PathBuf>,

    /// Arguments for pfctl, space separated or repeated. Defaults to "-s info".
    #[arg(
        long,
        value_name = "ARGS",
        allow_hyphen_values = true,
        value_delimiter = ' ',
        env = "PFSTAT_PFCTL_ARGS"
    )]
    pfctl_args: Vec<String>,

    /// Run pfctl through doas. pf requires root access on most systems;
    /// doas must permit this user to run pfctl without a password, e.g.
    /// "permit nopass USER as root cmd /sbin/pfctl args -s info".
    #[arg(long, env = "PFSTAT_USE_SUDO")]
    use_sudo: bool,

    /// Privilege elevation helper used with --use-sudo.
    #[arg(long, default_value = DEFAULT_SUDO_COMMAND, env = "PFSTAT_SUDO_COMMAND")]
    sudo_command: String,

    /// Also report IPv6 interface counters (bytes6-in, packets6-in-passed, ...).
    #[arg(long, env = "PFSTAT_IPV6_COUNTERS")]
    ipv6_counters: bool,

    /// Append JSON lines to this file instead of writing them to stdout.
    #[arg(short, long, value_name = "FILE", env = "PFSTAT_OUTPUT")]
    output: Option<PathBuf>,

    /// Only log the counters, don't emit JSON lines.
    #[arg(long, conflicts_with = "output")]
    log_only: bool,

    /// Collect once and exit. Exit status is non-zero if collection failed.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn pf_config(&self) -> PfConfig {
        let mut config = PfConfig::default()
            .with_pfctl_args(self.pfctl_args.iter().cloned())
            .with_sudo(self.use_sudo)
            .with_sudo_command(self.sudo_command.clone())
            .with_ipv6_counters(self.ipv6_counters);
        if let Some(ref path) = self.pfctl_command {
            config = config.with_pfctl_command(path);
        }
        config
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["pfstatd", "pfstat_core"] {
        match format!("{target}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {target}: {e}"),
        }
    }

    // Logs go to stderr so stdout stays clean for JSON lines.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Opens the configured sink.
fn open_sink(args: &Args) -> io::Result<Box<dyn CounterSink>> {
    if args.log_only {
        return Ok(Box::new(LogSink));
    }
    match &args.output {
        Some(path) => Ok(Box::new(JsonLinesSink::append(path)?)),
        None => Ok(Box::new(JsonLinesSink::new(io::stdout()))),
    }
}

/// Short summary of a counter set for logging.
fn describe_counters(counters: &Counters) -> String {
    let get = |key: &str| {
        counters
            .get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let mut desc = format!(
        "{} counters, {} states, {} matches",
        counters.len(),
        get("entries"),
        get("match")
    );
    if counters.contains_key("bytes-in") {
        desc.push_str(&format!(
            ", {} bytes in, {} bytes out",
            get("bytes-in"),
            get("bytes-out")
        ));
    }
    desc
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = args.pf_config();

    info!("pfstatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, use_sudo={}, ipv6_counters={}",
        args.interval, config.use_sudo, config.ipv6_counters
    );

    let mut sink = match open_sink(&args) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to open output: {}", e);
            std::process::exit(1);
        }
    };
    match &args.output {
        Some(path) => info!("Writing counters to {}", path.display()),
        None if args.log_only => info!("Logging counters only"),
        None => debug!("Writing counters to stdout"),
    }

    let mut collector = Collector::new(SystemRunner::new(), config);
    match collector.command() {
        Ok(command) => info!("Collecting with: {}", command),
        // Lookup is retried on every cycle.
        Err(e) => warn!("{}", e),
    }

    if args.once {
        match collector.gather(sink.as_mut()) {
            Ok(counters) => {
                info!("Collected {}", describe_counters(&counters));
                return;
            }
            Err(e) => {
                error!("Failed to collect pf counters: {}", e);
                std::process::exit(1);
            }
        }
    }

    let interval = Duration::from_secs(args.interval.max(1));

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut collection_count: u64 = 0;
    let mut failure_count: u64 = 0;

    info!("Starting collection loop");

    while running.load(Ordering::SeqCst) {
        match collector.gather(sink.as_mut()) {
            Ok(counters) => {
                collection_count += 1;
                info!(
                    "Collection #{}: {}",
                    collection_count,
                    describe_counters(&counters)
                );
                if let Some(timing) = collector.last_timing() {
                    debug!(
                        "Timing: total={:?}, pfctl={:?}, parse={:?}",
                        timing.total, timing.command, timing.parse
                    );
                }
            }
            Err(e) => {
                failure_count += 1;
                error!("Failed to collect pf counters: {}", e);
            }
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!(
        "Shutdown complete ({} collections, {} failures)",
        collection_count, failure_count
    );
}
