//! Starting selected commands.

use std::ffi::CString;

use nix::errno::Errno;
use nix::unistd::{ForkResult, fork};
use thiserror::Error;

use super::child;
use crate::command::CommandName;

#[derive(Debug, Error)]
pub enum LaunchError {
	#[error("{0}: command name contains a NUL byte")]
	Nul(String),

	#[error("could not fork to execute command: {0}")]
	Fork(#[source] Errno),
}

/// Starts one selected command.
pub trait Launcher {
	/// Starts `command` with no arguments and returns without waiting for it.
	///
	/// An error means the process could not be created at all. Failures of
	/// the command itself, including a failed exec, belong to the command's
	/// own process and are never reported here.
	fn launch(&mut self, command: &CommandName) -> Result<(), LaunchError>;
}

impl<L: Launcher + ?Sized> Launcher for &mut L {
	fn launch(&mut self, command: &CommandName) -> Result<(), LaunchError> {
		(**self).launch(command)
	}
}

/// Launches commands with `fork` + `execvp`.
///
/// Launched processes are detached: no handle is kept and they are never
/// waited on. Whatever is still running when `del` exits is reparented to
/// init, which also reaps the ones that finished earlier.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForkLauncher;

impl Launcher for ForkLauncher {
	fn launch(&mut self, command: &CommandName) -> Result<(), LaunchError> {
		let program = CString::new(command.as_bytes()).map_err(|_| LaunchError::Nul(command.to_string()))?;
		let args = [program.clone()];

		// SAFETY: the child only execs or reports and exits; see `child`.
		match unsafe { fork() }.map_err(LaunchError::Fork)? {
			ForkResult::Parent { child: pid } => {
				tracing::debug!(pid = pid.as_raw(), %command, "command launched");
				Ok(())
			}
			// The selector's output pipe is close-on-exec, so the command
			// never inherits it.
			ForkResult::Child => child::exec(&program, &args),
		}
	}
}
