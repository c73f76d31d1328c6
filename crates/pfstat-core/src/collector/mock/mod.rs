//! Mock infrastructure for testing the collector without pf.
//!
//! - [`MockRunner`]: in-memory [`CommandRunner`](crate::collector::CommandRunner)
//!   with canned program lookups and outputs.
//! - [`scenarios`]: captured `pfctl -s info` outputs.

mod runner;
pub mod scenarios;

pub use runner::{Invocation, MockRunner};
