//! Stanza scanner for `pfctl -s info` output.
//!
//! The output is a sequence of sections, each introduced by a header line
//! that starts at column 0 with an uppercase letter, followed by indented
//! data lines:
//!
//! ```text
//! Status: Enabled for 0 days 00:26:05           Debug: Urgent
//!
//! Interface Stats for em0               IPv4             IPv6
//!   Bytes In                         1234567            0
//!   Bytes Out                         891011            0
//!   Packets In
//!     Passed                           12345            0
//!     Blocked                             67            0
//!   ...
//! State Table                          Total             Rate
//!   current entries                        2
//!   searches                           11325            7.2/s
//! Counters
//!   match                              11325            7.2/s
//! ```
//!
//! The scanner is a two-state machine (`Outside` / `Collecting`). Any line
//! starting with an uppercase letter terminates the current stanza and is then
//! re-examined as a header, so stanza order in the output doesn't matter.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::error::ParseError;
use super::extractor::{CounterTable, Counters};

/// Name of the command whose output is parsed, used in error messages.
pub const PFCTL_COMMAND: &str = "pfctl";

/// Universal stanza terminator: any line that starts with an uppercase letter.
static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]").expect("section start regex"));

/// `Packets In` / `Packets Out`: the two following lines hold the sub-counts.
static PACKETS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s+Packets In|\s+Packets Out)").expect("packets regex"));

/// `Bytes In` / `Bytes Out` with IPv4 and IPv6 columns.
static BYTES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s+Bytes In|\s+Bytes Out)\s+([0-9]+)\s+([0-9]+)").expect("bytes regex")
});

/// `Passed` / `Blocked` sub-count with IPv4 and IPv6 columns.
static DUAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(.*?)\s+([0-9]+)\s+([0-9]+)").expect("dual count regex"));

/// Number of sub-count lines following a `Packets In`/`Packets Out` line.
const PACKET_SUBCOUNT_LINES: usize = 2;

/// Describes one section of the output.
#[derive(Debug, Clone)]
pub struct StanzaSpec {
    name: &'static str,
    header: Regex,
    table: CounterTable,
    optional: bool,
}

impl StanzaSpec {
    /// Creates a mandatory stanza whose header line starts with `name`.
    pub fn new(name: &'static str, table: CounterTable) -> Self {
        let header = Regex::new(&format!("^{}", regex::escape(name)))
            .expect("escaped literal is a valid regex");
        Self {
            name,
            header,
            table,
            optional: false,
        }
    }

    /// Marks the stanza as optional: its absence is not an error.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn table(&self) -> &CounterTable {
        &self.table
    }

    fn matches_header(&self, line: &str) -> bool {
        self.header.is_match(line)
    }
}

/// Builder for [`PfctlParser`].
#[derive(Debug, Clone)]
pub struct PfctlParserBuilder {
    command: String,
    stanzas: Vec<StanzaSpec>,
}

impl PfctlParserBuilder {
    /// Name of the command reported in errors (default `pfctl`).
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Adds a stanza. Stanzas are tried in insertion order.
    pub fn stanza(mut self, stanza: StanzaSpec) -> Self {
        self.stanzas.push(stanza);
        self
    }

    pub fn build(self) -> PfctlParser {
        PfctlParser {
            command: self.command,
            stanzas: self.stanzas,
        }
    }
}

/// Parser for `pfctl -s info` output.
///
/// The stanza and counter tables are immutable once built; every call to
/// [`PfctlParser::parse`] allocates its own run state, so a parser can be
/// shared and reused freely.
#[derive(Debug, Clone)]
pub struct PfctlParser {
    command: String,
    stanzas: Vec<StanzaSpec>,
}

impl Default for PfctlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PfctlParser {
    /// Standard parser: optional `Interface Stats`, mandatory `State Table`
    /// and `Counters`. Only IPv4 interface counters are exposed.
    pub fn new() -> Self {
        Self::with_ipv6_counters(false)
    }

    /// Standard parser, optionally exposing the IPv6 interface counters
    /// (`bytes6-in`, `packets6-in-passed`, ...).
    pub fn with_ipv6_counters(ipv6: bool) -> Self {
        // Interface Stats requires `set loginterface` in pf.conf.
        Self::builder()
            .stanza(
                StanzaSpec::new("Interface Stats", CounterTable::interface_stats(ipv6)).optional(),
            )
            .stanza(StanzaSpec::new("State Table", CounterTable::state_table()))
            .stanza(StanzaSpec::new("Counters", CounterTable::filter_counters()))
            .build()
    }

    /// Empty builder with no stanzas.
    pub fn builder() -> PfctlParserBuilder {
        PfctlParserBuilder {
            command: PFCTL_COMMAND.to_string(),
            stanzas: Vec::new(),
        }
    }

    pub fn stanzas(&self) -> &[StanzaSpec] {
        &self.stanzas
    }

    /// Parses the complete output into counters.
    ///
    /// Fails if a mandatory stanza is missing, if any stanza that was found
    /// lacks one of its counters, or if a value doesn't fit in `i64`.
    pub fn parse(&self, output: &str) -> Result<Counters, ParseError> {
        let mut scan = Scan::new(&self.stanzas);
        let mut lines = output.lines().peekable();

        while let Some(line) = lines.next() {
            scan.feed(line, &mut lines, self)?;
        }
        scan.finish(self)?;

        for (stanza, found) in self.stanzas.iter().zip(&scan.found) {
            if !found && !stanza.optional {
                return Err(ParseError::MissingSection {
                    section: stanza.name,
                    command: self.command.clone(),
                });
            }
            if !found {
                debug!(stanza = stanza.name, "optional stanza not present");
            }
        }

        debug!(counters = scan.counters.len(), "parsed {} output", self.command);
        Ok(scan.counters)
    }

    fn header_of(&self, line: &str) -> Option<usize> {
        self.stanzas.iter().position(|s| s.matches_header(line))
    }

    fn extract(
        &self,
        index: usize,
        buffer: &[String],
        counters: &mut Counters,
    ) -> Result<(), ParseError> {
        let stanza = &self.stanzas[index];
        trace!(stanza = stanza.name, lines = buffer.len(), "extracting stanza");
        stanza
            .table
            .extract(buffer, counters)
            .map_err(|source| ParseError::Stanza {
                stanza: stanza.name,
                command: self.command.clone(),
                source,
            })
    }
}

/// Scanner state.
#[derive(Debug)]
enum State {
    /// Between stanzas: lines are only tested for headers.
    Outside,
    /// Inside stanza `index`, buffering normalized lines.
    Collecting { index: usize, buffer: Vec<String> },
}

/// Per-parse run state.
struct Scan {
    state: State,
    found: Vec<bool>,
    counters: Counters,
}

impl Scan {
    fn new(stanzas: &[StanzaSpec]) -> Self {
        Self {
            state: State::Outside,
            found: vec![false; stanzas.len()],
            counters: Counters::new(),
        }
    }

    fn feed<'a, I>(
        &mut self,
        line: &'a str,
        rest: &mut std::iter::Peekable<I>,
        parser: &PfctlParser,
    ) -> Result<(), ParseError>
    where
        I: Iterator<Item = &'a str>,
    {
        if SECTION_START.is_match(line) {
            self.finish(parser)?;
        } else if let State::Collecting { buffer, .. } = &mut self.state {
            normalize_line(line, rest, buffer);
            return Ok(());
        }

        if let Some(index) = parser.header_of(line) {
            trace!(stanza = parser.stanzas[index].name, "stanza header");
            self.state = State::Collecting {
                index,
                buffer: Vec::new(),
            };
        }
        Ok(())
    }

    /// Closes the current stanza, if any, and extracts its counters.
    fn finish(&mut self, parser: &PfctlParser) -> Result<(), ParseError> {
        let state = std::mem::replace(&mut self.state, State::Outside);
        if let State::Collecting { index, buffer } = state {
            parser.extract(index, &buffer, &mut self.counters)?;
            self.found[index] = true;
        }
        Ok(())
    }
}

/// Appends `line` to `buffer`, rewriting the dual-column interface lines into
/// single-value `label integer` lines.
fn normalize_line<'a, I>(
    line: &'a str,
    rest: &mut std::iter::Peekable<I>,
    buffer: &mut Vec<String>,
) where
    I: Iterator<Item = &'a str>,
{
    if let Some(caps) = PACKETS_HEADER.captures(line) {
        let packets = &caps[1];
        for _ in 0..PACKET_SUBCOUNT_LINES {
            // Don't swallow the next section header if the block is short.
            let Some(next) = rest.next_if(|l| !SECTION_START.is_match(l)) else {
                break;
            };
            match DUAL_COUNT.captures(next) {
                Some(sub) => {
                    buffer.push(format!("{} {} IPv4 {}", packets, &sub[1], &sub[2]));
                    buffer.push(format!("{} {} IPv6 {}", packets, &sub[1], &sub[3]));
                }
                None => trace!(line = next, "skipping malformed packet sub-count"),
            }
        }
    } else if let Some(caps) = BYTES_LINE.captures(line) {
        buffer.push(format!("{} IPv4 {}", &caps[1], &caps[2]));
        buffer.push(format!("{} IPv6 {}", &caps[1], &caps[3]));
    } else {
        buffer.push(line.to_string());
    }
}
