//! Field extraction from normalized stanza lines.
//!
//! Every stanza of `pfctl -s info` ends up as a list of lines shaped like
//! `<indent><label><spaces><integer>[<anything>]`. The scanner rewrites the
//! multi-column interface lines into that shape first, so a single routine can
//! serve all three tables.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::error::ExtractError;

/// Counters produced by a parse, keyed by output name.
pub type Counters = BTreeMap<String, i64>;

/// Leading whitespace, a non-greedy label, whitespace, then the integer.
/// Anything after the integer (rate columns such as `7.2/s`) is ignored.
static LABELED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(.*?)\s+([0-9]+)").expect("labeled value regex"));

/// One expected counter: the output key and the exact label in pfctl output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSpec {
    pub key: &'static str,
    pub label: &'static str,
}

impl CounterSpec {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

const INTERFACE_IPV4: &[CounterSpec] = &[
    CounterSpec::new("bytes-in", "Bytes In IPv4"),
    CounterSpec::new("bytes-out", "Bytes Out IPv4"),
    CounterSpec::new("packets-in-passed", "Packets In Passed IPv4"),
    CounterSpec::new("packets-in-blocked", "Packets In Blocked IPv4"),
    CounterSpec::new("packets-out-passed", "Packets Out Passed IPv4"),
    CounterSpec::new("packets-out-blocked", "Packets Out Blocked IPv4"),
];

const INTERFACE_IPV6: &[CounterSpec] = &[
    CounterSpec::new("bytes6-in", "Bytes In IPv6"),
    CounterSpec::new("bytes6-out", "Bytes Out IPv6"),
    CounterSpec::new("packets6-in-passed", "Packets In Passed IPv6"),
    CounterSpec::new("packets6-in-blocked", "Packets In Blocked IPv6"),
    CounterSpec::new("packets6-out-passed", "Packets Out Passed IPv6"),
    CounterSpec::new("packets6-out-blocked", "Packets Out Blocked IPv6"),
];

const STATE_TABLE: &[CounterSpec] = &[
    CounterSpec::new("entries", "current entries"),
    CounterSpec::new("searches", "searches"),
    CounterSpec::new("inserts", "inserts"),
    CounterSpec::new("removals", "removals"),
];

const FILTER_COUNTERS: &[CounterSpec] = &[
    CounterSpec::new("match", "match"),
    CounterSpec::new("bad-offset", "bad-offset"),
    CounterSpec::new("fragment", "fragment"),
    CounterSpec::new("short", "short"),
    CounterSpec::new("normalize", "normalize"),
    CounterSpec::new("memory", "memory"),
    CounterSpec::new("bad-timestamp", "bad-timestamp"),
    CounterSpec::new("congestion", "congestion"),
    CounterSpec::new("ip-option", "ip-option"),
    CounterSpec::new("proto-cksum", "proto-cksum"),
    CounterSpec::new("state-mismatch", "state-mismatch"),
    CounterSpec::new("state-insert", "state-insert"),
    CounterSpec::new("state-limit", "state-limit"),
    CounterSpec::new("src-limit", "src-limit"),
    CounterSpec::new("synproxy", "synproxy"),
];

/// A fixed set of counters expected inside one stanza.
///
/// The table itself is immutable; value slots live only for the duration of
/// one [`CounterTable::extract`] call.
#[derive(Debug, Clone)]
pub struct CounterTable {
    counters: Vec<CounterSpec>,
    line_pattern: Regex,
}

impl CounterTable {
    /// Creates a table matched with the default `label  integer` line pattern.
    pub fn new(counters: impl Into<Vec<CounterSpec>>) -> Self {
        Self::with_pattern(counters, LABELED_VALUE.clone())
    }

    /// Creates a table with a custom line pattern.
    ///
    /// The pattern must capture the label in group 1 and the integer in group 2.
    pub fn with_pattern(counters: impl Into<Vec<CounterSpec>>, line_pattern: Regex) -> Self {
        Self {
            counters: counters.into(),
            line_pattern,
        }
    }

    /// `Interface Stats` counters (IPv4 values, optionally IPv6 too).
    pub fn interface_stats(ipv6: bool) -> Self {
        let mut counters = INTERFACE_IPV4.to_vec();
        if ipv6 {
            counters.extend_from_slice(INTERFACE_IPV6);
        }
        Self::new(counters)
    }

    /// `State Table` counters.
    pub fn state_table() -> Self {
        Self::new(STATE_TABLE)
    }

    /// `Counters` section.
    pub fn filter_counters() -> Self {
        Self::new(FILTER_COUNTERS)
    }

    pub fn counters(&self) -> &[CounterSpec] {
        &self.counters
    }

    /// Extracts every counter of this table from `lines` into `out`.
    ///
    /// Lines that don't match the pattern or carry an unknown label are
    /// ignored. If a label appears more than once, the last value wins.
    /// On error `out` is left untouched.
    pub fn extract<S: AsRef<str>>(
        &self,
        lines: &[S],
        out: &mut Counters,
    ) -> Result<(), ExtractError> {
        let mut slots: Vec<Option<i64>> = vec![None; self.counters.len()];

        for line in lines {
            let Some(caps) = self.line_pattern.captures(line.as_ref()) else {
                continue;
            };
            let (Some(label), Some(raw)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let label = label.as_str();
            let raw = raw.as_str();

            for (spec, slot) in self.counters.iter().zip(slots.iter_mut()) {
                if spec.label != label {
                    continue;
                }
                let value = raw
                    .parse::<i64>()
                    .map_err(|source| ExtractError::InvalidInteger {
                        label: spec.label,
                        value: raw.to_string(),
                        source,
                    })?;
                *slot = Some(value);
            }
        }

        let mut found = Vec::with_capacity(self.counters.len());
        for (spec, slot) in self.counters.iter().zip(&slots) {
            let value = slot.ok_or(ExtractError::MissingCounter { label: spec.label })?;
            found.push((spec.key, value));
        }

        for (key, value) in found {
            out.insert(key.to_string(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE_LINES: &[&str] = &[
        "  current entries                        2               ",
        "  searches                           11325            7.2/s",
        "  inserts                               28            0.0/s",
        "  removals                              26            0.0/s",
    ];

    #[test]
    fn test_extract_state_table() {
        let mut out = Counters::new();
        CounterTable::state_table()
            .extract(STATE_LINES, &mut out)
            .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out["entries"], 2);
        assert_eq!(out["searches"], 11325);
        assert_eq!(out["inserts"], 28);
        assert_eq!(out["removals"], 26);
    }

    #[test]
    fn test_extract_missing_label_leaves_output_untouched() {
        let mut out = Counters::new();
        out.insert("match".to_string(), 1);

        let err = CounterTable::state_table()
            .extract(&STATE_LINES[..3], &mut out)
            .unwrap_err();

        assert_eq!(err, ExtractError::MissingCounter { label: "removals" });
        assert_eq!(out.len(), 1);
        assert_eq!(out["match"], 1);
    }

    #[test]
    fn test_extract_empty_lines_reports_first_counter() {
        let mut out = Counters::new();
        let lines: Vec<String> = Vec::new();
        let err = CounterTable::filter_counters()
            .extract(&lines, &mut out)
            .unwrap_err();
        assert_eq!(err, ExtractError::MissingCounter { label: "match" });
        assert!(out.is_empty());
    }

    #[test]
    fn test_extract_overflowing_value_is_fatal() {
        let lines = [
            "  current entries     99999999999999999999",
            "  searches 1",
            "  inserts 1",
            "  removals 1",
        ];
        let mut out = Counters::new();
        let err = CounterTable::state_table()
            .extract(&lines, &mut out)
            .unwrap_err();

        match err {
            ExtractError::InvalidInteger { label, value, .. } => {
                assert_eq!(label, "current entries");
                assert_eq!(value, "99999999999999999999");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_extract_requires_leading_whitespace() {
        let lines = [
            "current entries 5",
            "  searches 1",
            "  inserts 1",
            "  removals 1",
        ];
        let mut out = Counters::new();
        let err = CounterTable::state_table()
            .extract(&lines, &mut out)
            .unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingCounter {
                label: "current entries"
            }
        );
    }

    #[test]
    fn test_extract_non_ascii_digits_are_not_values() {
        let lines = [
            "  current entries 2",
            "  searches 1",
            "  inserts 1",
            "  removals  \u{0662}\u{0666}",
        ];
        let mut out = Counters::new();
        let err = CounterTable::state_table()
            .extract(&lines, &mut out)
            .unwrap_err();
        assert_eq!(err, ExtractError::MissingCounter { label: "removals" });
        assert!(out.is_empty());
    }

    #[test]
    fn test_extract_last_value_wins() {
        let lines = [
            "  current entries 1",
            "  current entries 7",
            "  searches 1",
            "  inserts 1",
            "  removals 1",
        ];
        let mut out = Counters::new();
        CounterTable::state_table().extract(&lines, &mut out).unwrap();
        assert_eq!(out["entries"], 7);
    }

    #[test]
    fn test_extract_ignores_unknown_labels() {
        let mut lines = STATE_LINES.to_vec();
        lines.push("  something else    42");
        let mut out = Counters::new();
        CounterTable::state_table().extract(&lines, &mut out).unwrap();
        assert_eq!(out.len(), 4);
        assert!(!out.contains_key("something else"));
    }

    #[test]
    fn test_interface_table_ipv6_keys_are_opt_in() {
        let v4 = CounterTable::interface_stats(false);
        let both = CounterTable::interface_stats(true);
        assert_eq!(v4.counters().len(), 6);
        assert_eq!(both.counters().len(), 12);
        assert!(v4.counters().iter().all(|c| !c.key.contains('6')));
        assert!(both.counters().iter().any(|c| c.key == "bytes6-in"));
    }

    #[test]
    fn test_custom_line_pattern() {
        let table = CounterTable::with_pattern(
            [CounterSpec::new("answer", "answer")],
            Regex::new(r"^(\w+)=(\d+)$").unwrap(),
        );
        let mut out = Counters::new();
        table.extract(&["answer=42"], &mut out).unwrap();
        assert_eq!(out["answer"], 42);
    }
}
