//! pf counters collector.
//!
//! This module runs `pfctl -s info`, parses its stanza-based text output and
//! hands the resulting counters to a [`CounterSink`](crate::sink::CounterSink).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │    PfctlCommand     │   │        PfctlParser          │  │
//! │  │  - PATH lookup      │   │  - stanza scanner           │  │
//! │  │  - doas elevation   │   │  - counter tables           │  │
//! │  └──────────┬──────────┘   └─────────────────────────────┘  │
//! │             │                                               │
//! │      ┌──────▼────────┐                                      │
//! │      │ CommandRunner │ (trait)                              │
//! │      └──────┬────────┘                                      │
//! └─────────────┼───────────────────────────────────────────────┘
//!               │
//!        ┌──────┴───────┐
//!        │              │
//! ┌──────▼──────┐ ┌─────▼───────┐
//! │SystemRunner │ │ MockRunner  │
//! │ (BSD host)  │ │ (Testing)   │
//! └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```ignore
//! use pfstat_core::collector::{Collector, SystemRunner};
//! use pfstat_core::config::PfConfig;
//!
//! let mut collector = Collector::new(SystemRunner::new(), PfConfig::default());
//! let counters = collector.collect().unwrap();
//! ```
//!
//! ## Testing (with MockRunner)
//!
//! ```
//! use pfstat_core::collector::{Collector, MockRunner};
//! use pfstat_core::config::PfConfig;
//!
//! let mut collector = Collector::new(MockRunner::typical_pf(), PfConfig::default());
//! let counters = collector.collect().unwrap();
//! assert_eq!(counters["entries"], 2);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod pfctl;
pub mod traits;

pub use collector::{CollectError, Collector, CollectorTiming};
pub use mock::MockRunner;
pub use pfctl::{Counters, ParseError, PfctlParser};
pub use traits::{CommandOutput, CommandRunner, SystemRunner};
