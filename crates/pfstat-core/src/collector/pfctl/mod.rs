//! Parsing and invocation of `pfctl -s info`.
//!
//! - [`scanner`]: splits the output into stanzas and normalizes their lines
//! - [`extractor`]: reads labeled counters out of normalized lines
//! - [`command`]: resolves the command line to run

pub mod command;
mod error;
pub mod extractor;
pub mod scanner;

pub use command::PfctlCommand;
pub use error::{ExtractError, ParseError};
pub use extractor::{CounterSpec, CounterTable, Counters};
pub use scanner::{PFCTL_COMMAND, PfctlParser, PfctlParserBuilder, StanzaSpec};
