//! Collector configuration.
//!
//! pf requires root access on most systems. With `use_sudo` the collector runs
//! pfctl through `doas`, which must allow the collecting user to run it without
//! a password. The rule can be restricted to the info listing, e.g. in
//! `/etc/doas.conf`:
//!
//! ```text
//! permit nopass USERNAME as root cmd /sbin/pfctl args -s info
//! ```

use std::path::PathBuf;

/// Arguments passed to pfctl when none are configured.
pub const DEFAULT_PFCTL_ARGS: &[&str] = &["-s", "info"];

/// Privilege elevation helper used with `use_sudo`.
pub const DEFAULT_SUDO_COMMAND: &str = "doas";

/// How to obtain and interpret pfctl output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfConfig {
    /// Explicit pfctl path. When `None`, `pfctl` is searched in `PATH`.
    pub pfctl_command: Option<PathBuf>,
    /// Arguments for pfctl.
    pub pfctl_args: Vec<String>,
    /// Run pfctl through [`PfConfig::sudo_command`].
    pub use_sudo: bool,
    /// Elevation helper, searched in `PATH` unless it is a path.
    pub sudo_command: String,
    /// Also report the IPv6 interface counters.
    pub ipv6_counters: bool,
}

impl Default for PfConfig {
    fn default() -> Self {
        Self {
            pfctl_command: None,
            pfctl_args: DEFAULT_PFCTL_ARGS.iter().map(|s| s.to_string()).collect(),
            use_sudo: false,
            sudo_command: DEFAULT_SUDO_COMMAND.to_string(),
            ipv6_counters: false,
        }
    }
}

impl PfConfig {
    pub fn with_pfctl_command(mut self, path: impl Into<PathBuf>) -> Self {
        self.pfctl_command = Some(path.into());
        self
    }

    /// Replaces the pfctl arguments. An empty list restores the defaults.
    pub fn with_pfctl_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.pfctl_args = if args.is_empty() {
            Self::default().pfctl_args
        } else {
            args
        };
        self
    }

    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn with_sudo_command(mut self, command: impl Into<String>) -> Self {
        self.sudo_command = command.into();
        self
    }

    pub fn with_ipv6_counters(mut self, enabled: bool) -> Self {
        self.ipv6_counters = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PfConfig::default();
        assert_eq!(config.pfctl_command, None);
        assert_eq!(config.pfctl_args, vec!["-s", "info"]);
        assert!(!config.use_sudo);
        assert_eq!(config.sudo_command, "doas");
        assert!(!config.ipv6_counters);
    }

    #[test]
    fn test_empty_args_restore_defaults() {
        let config = PfConfig::default()
            .with_pfctl_args(["-s", "all"])
            .with_pfctl_args(Vec::<String>::new());
        assert_eq!(config.pfctl_args, vec!["-s", "info"]);
    }
}
