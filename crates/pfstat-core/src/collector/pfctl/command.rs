//! Resolution of the pfctl command line.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use super::scanner::PFCTL_COMMAND;
use crate::collector::CollectError;
use crate::collector::traits::CommandRunner;
use crate::config::PfConfig;

/// A fully resolved program and argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfctlCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PfctlCommand {
    /// Builds the command line from `config`.
    ///
    /// pfctl is taken from the config or searched in `PATH`. With `use_sudo`
    /// the elevation helper becomes the program and the pfctl path its first
    /// argument: `doas /sbin/pfctl -s info`.
    pub fn resolve<R>(config: &PfConfig, runner: &R) -> Result<Self, CollectError>
    where
        R: CommandRunner + ?Sized,
    {
        let pfctl = match &config.pfctl_command {
            Some(path) => path.clone(),
            None => runner
                .lookup(PFCTL_COMMAND)
                .map_err(|source| CollectError::Lookup {
                    program: PFCTL_COMMAND.to_string(),
                    source,
                })?,
        };

        let command = if config.use_sudo {
            let sudo = runner
                .lookup(&config.sudo_command)
                .map_err(|source| CollectError::Lookup {
                    program: config.sudo_command.clone(),
                    source,
                })?;
            let mut args = Vec::with_capacity(config.pfctl_args.len() + 1);
            args.push(pfctl.to_string_lossy().into_owned());
            args.extend(config.pfctl_args.iter().cloned());
            Self {
                program: sudo,
                args,
            }
        } else {
            Self {
                program: pfctl,
                args: config.pfctl_args.clone(),
            }
        };

        debug!(command = %command, "resolved pfctl command");
        Ok(command)
    }
}

impl fmt::Display for PfctlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
