//! pfstat-core — shared library for the pfstat tools.
//!
//! Provides:
//! - `collector` — pfctl invocation and `pfctl -s info` parsing
//! - `config` — collector configuration
//! - `sink` — destinations for collected counters

pub mod collector;
pub mod config;
pub mod sink;
