//! Main collector that runs pfctl and parses its output.
//!
//! The `Collector` struct ties together command resolution, execution,
//! parsing and reporting for one collection cycle.

use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::collector::pfctl::{Counters, ParseError, PfctlCommand, PfctlParser};
use crate::collector::traits::CommandRunner;
use crate::config::PfConfig;
use crate::sink::{CounterSink, MEASUREMENT};

/// Error type for a collection cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    /// A program could not be found.
    #[error("can't locate {program}: {source}")]
    Lookup {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The command could not be started.
    #[error("error running {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("error running {command}: {}: {stderr}", describe_status(.status))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    /// The output could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The sink rejected the counters.
    #[error("failed to report counters: {0}")]
    Report(#[source] io::Error),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Timing information for each collection phase.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total collection time.
    pub total: Duration,
    /// Time spent waiting for pfctl.
    pub command: Duration,
    /// Time spent parsing its output.
    pub parse: Duration,
}

/// Collects pf counters through a [`CommandRunner`].
pub struct Collector<R: CommandRunner> {
    runner: R,
    config: PfConfig,
    parser: PfctlParser,
    /// Resolved on first successful lookup and reused afterwards.
    command: Option<PfctlCommand>,
    /// Timing information from the last collect call.
    last_timing: Option<CollectorTiming>,
}

impl<R: CommandRunner> Collector<R> {
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `runner` - Command runner (real or mock)
    /// * `config` - pfctl location, arguments and elevation settings
    pub fn new(runner: R, config: PfConfig) -> Self {
        let parser = PfctlParser::with_ipv6_counters(config.ipv6_counters);
        Self {
            runner,
            config,
            parser,
            command: None,
            last_timing: None,
        }
    }

    /// Replaces the output parser.
    pub fn with_parser(mut self, parser: PfctlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &PfConfig {
        &self.config
    }

    pub fn parser(&self) -> &PfctlParser {
        &self.parser
    }

    /// Returns timing information from the last collection, if any.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Resolves the command line, caching it once found.
    pub fn command(&mut self) -> Result<&PfctlCommand, CollectError> {
        let command = match self.command.take() {
            Some(command) => command,
            None => PfctlCommand::resolve(&self.config, &self.runner)?,
        };
        Ok(&*self.command.insert(command))
    }

    /// Runs pfctl once and parses its output.
    pub fn collect(&mut self) -> Result<Counters, CollectError> {
        let start = Instant::now();
        let command = self.command()?.clone();

        let output = self
            .runner
            .run(&command.program, &command.args)
            .map_err(|source| CollectError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let command_time = start.elapsed();

        if !output.success {
            return Err(CollectError::Failed {
                command: command.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        if !output.stderr.trim().is_empty() {
            warn!(command = %command, stderr = output.stderr.trim(), "pfctl wrote to stderr");
        }

        let parse_start = Instant::now();
        let counters = self.parser.parse(&output.stdout)?;
        let parse_time = parse_start.elapsed();

        let timing = CollectorTiming {
            total: start.elapsed(),
            command: command_time,
            parse: parse_time,
        };
        debug!(
            counters = counters.len(),
            command_us = timing.command.as_micros() as u64,
            parse_us = timing.parse.as_micros() as u64,
            "collected pf counters"
        );
        self.last_timing = Some(timing);

        Ok(counters)
    }

    /// Collects and hands the counters to `sink`.
    ///
    /// Nothing is reported when collection fails.
    pub fn gather<S>(&mut self, sink: &mut S) -> Result<Counters, CollectError>
    where
        S: CounterSink + ?Sized,
    {
        let counters = self.collect()?;
        sink.report(MEASUREMENT, &counters)
            .map_err(CollectError::Report)?;
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockRunner, scenarios};
    use crate::collector::traits::CommandOutput;
    use crate::sink::MemorySink;
    use std::path::PathBuf;

    #[test]
    fn test_collect_typical() {
        let mut collector = Collector::new(MockRunner::typical_pf(), PfConfig::default());
        let counters = collector.collect().unwrap();

        assert_eq!(counters.len(), 25);
        assert_eq!(counters["bytes-in"], 1_234_567);
        assert!(collector.last_timing().is_some());

        let calls = collector.runner().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("/sbin/pfctl"));
        assert_eq!(calls[0].args, vec!["-s", "info"]);
    }

    #[test]
    fn test_collect_through_doas() {
        let config = PfConfig::default().with_sudo(true);
        let mut collector = Collector::new(MockRunner::typical_pf(), config);
        collector.collect().unwrap();

        let calls = collector.runner().calls();
        assert_eq!(calls[0].program, PathBuf::from("/usr/bin/doas"));
        assert_eq!(calls[0].args, vec!["/sbin/pfctl", "-s", "info"]);
    }

    #[test]
    fn test_collect_ipv6_counters() {
        let config = PfConfig::default().with_ipv6_counters(true);
        let mut collector = Collector::new(MockRunner::typical_pf(), config);
        let counters = collector.collect().unwrap();
        assert_eq!(counters["bytes6-out"], 1_024);
    }

    #[test]
    fn test_command_resolved_once() {
        let mut collector = Collector::new(MockRunner::typical_pf(), PfConfig::default());
        collector.collect().unwrap();
        collector.collect().unwrap();
        assert_eq!(
            collector.command().unwrap().program,
            PathBuf::from("/sbin/pfctl")
        );
        assert_eq!(collector.runner().calls().len(), 2);
    }

    #[test]
    fn test_command_failure_carries_stderr() {
        let mut runner = MockRunner::new();
        runner.add_program("pfctl", "/sbin/pfctl");
        runner.add_output(
            "/sbin/pfctl",
            CommandOutput::failure(1, "pfctl: /dev/pf: Permission denied\n"),
        );
        let mut collector = Collector::new(runner, PfConfig::default());

        let err = collector.collect().unwrap_err();
        assert_eq!(
            err.to_string(),
            "error running /sbin/pfctl -s info: exit status 1: pfctl: /dev/pf: Permission denied"
        );
        assert!(collector.last_timing().is_none());
    }

    #[test]
    fn test_spawn_failure() {
        let mut runner = MockRunner::new();
        runner.add_program("pfctl", "/sbin/pfctl");
        let mut collector = Collector::new(runner, PfConfig::default());
        let err = collector.collect().unwrap_err();
        assert!(matches!(err, CollectError::Spawn { .. }));
    }

    #[test]
    fn test_parse_failure_reports_nothing() {
        let runner = MockRunner::with_output(scenarios::PFCTL_DISABLED);
        let mut collector = Collector::new(runner, PfConfig::default());
        let mut sink = MemorySink::new();

        let err = collector.gather(&mut sink).unwrap_err();
        assert!(matches!(
            err,
            CollectError::Parse(ParseError::MissingSection { section: "State Table", .. })
        ));
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_gather_reports_measurement() {
        let runner = MockRunner::with_output(scenarios::PFCTL_INFO);
        let mut collector = Collector::new(runner, PfConfig::default());
        let mut sink = MemorySink::new();

        let counters = collector.gather(&mut sink).unwrap();
        let record = sink.last().unwrap();
        assert_eq!(record.measurement, "pf");
        assert_eq!(record.fields, counters);
        assert_eq!(record.fields.len(), 19);
    }

    #[test]
    fn test_missing_pfctl_is_retried() {
        let mut collector = Collector::new(MockRunner::new(), PfConfig::default());
        assert!(matches!(
            collector.collect(),
            Err(CollectError::Lookup { .. })
        ));
        assert!(matches!(
            collector.collect(),
            Err(CollectError::Lookup { .. })
        ));
    }
}
