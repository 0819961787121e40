//! Running the selector and launching what it picks.
//!
//! ```text
//! spawn selector ──► stream selections ──► wait for selector ──► outcome
//!                        │ launch failure
//!                        └──► SIGHUP to selector ──┘
//! ```
//!
//! The selector reads the command list on stdin and writes one command per
//! line to a pipe. Each complete line is launched as soon as it arrives, in
//! order, without waiting for earlier launches. If a launch cannot even
//! create a process, reading stops and the selector is hung up on; its
//! death by that signal is then expected and not reported again.

mod child;
mod launch;

use std::ffi::{CString, OsString};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::ExitStatus;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{Signal, kill};
use nix::unistd::{ForkResult, Pid, dup2_stdin, dup2_stdout, fork, pipe2};
use thiserror::Error;

pub use self::launch::{ForkLauncher, LaunchError, Launcher};
use crate::command::CommandName;
use crate::exit;

/// Signal used to cancel the selector.
pub const CANCEL_SIGNAL: Signal = Signal::SIGHUP;

/// Default selector program.
pub const DEFAULT_SELECTOR: &str = "dmenu";

#[derive(Debug, Error)]
pub enum MenuError {
	#[error("no selector program given")]
	NoSelector,

	#[error("selector argument contains a NUL byte: {0:?}")]
	Nul(OsString),

	#[error("could not create pipes for subprocess communication: {0}")]
	Pipe(#[source] Errno),

	#[error("could not fork to launch {selector}: {source}")]
	Fork { selector: String, source: Errno },

	#[error("could not read {selector} output: {source}")]
	Read { selector: String, source: io::Error },

	#[error(transparent)]
	Launch(#[from] LaunchError),
}

/// How a menu session ended, in order of precedence.
#[derive(Debug)]
pub enum MenuOutcome {
	/// Every selection was launched and the selector exited cleanly.
	Success,
	/// A fatal error occurred while setting up or streaming selections.
	Failed(MenuError),
	/// The selector could not be waited on.
	WaitFailed(Errno),
	/// The selector exited with this non-zero status.
	SelectorExited(i32),
	/// The selector was killed by this signal number, which `del` did not
	/// send. Kept raw since real-time signals have no [`Signal`] variant.
	SelectorSignaled(i32),
}

impl MenuOutcome {
	/// Process exit code for this outcome.
	pub fn code(&self) -> u8 {
		match self {
			MenuOutcome::Success => exit::SUCCESS,
			MenuOutcome::Failed(_) => exit::FATAL,
			MenuOutcome::WaitFailed(_) => exit::NON_FATAL,
			MenuOutcome::SelectorExited(status) => u8::try_from(*status).unwrap_or(exit::FATAL),
			MenuOutcome::SelectorSignaled(signal) => u8::try_from(*signal).map_or(exit::FATAL, |signal| exit::SIGNAL_BASE.saturating_add(signal)),
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, MenuOutcome::Success)
	}
}

/// One selector session.
pub struct Menu<'a, L> {
	list_path: &'a Path,
	argv: &'a [OsString],
	launcher: L,
}

impl<'a> Menu<'a, ForkLauncher> {
	/// `argv` is the selector program followed by its arguments.
	pub fn new(list_path: &'a Path, argv: &'a [OsString]) -> Self {
		Self {
			list_path,
			argv,
			launcher: ForkLauncher,
		}
	}
}

impl<'a, L: Launcher> Menu<'a, L> {
	pub fn with_launcher<M: Launcher>(self, launcher: M) -> Menu<'a, M> {
		Menu {
			list_path: self.list_path,
			argv: self.argv,
			launcher,
		}
	}

	fn selector_name(&self) -> String {
		self.argv.first().map(|arg| arg.to_string_lossy().into_owned()).unwrap_or_default()
	}

	/// Runs the selector to completion.
	pub fn run(mut self) -> MenuOutcome {
		let (pid, output) = match self.spawn_selector() {
			Ok(spawned) => spawned,
			Err(err) => return MenuOutcome::Failed(err),
		};

		let mut reader = BufReader::new(output);
		let failure = self.stream_selections(&mut reader).err();

		let mut cancelled_with = None;
		if let Some(err) = &failure {
			tracing::debug!(error = %err, pid = pid.as_raw(), "cancelling selector");
			match kill(pid, CANCEL_SIGNAL) {
				Ok(()) => cancelled_with = Some(CANCEL_SIGNAL as i32),
				Err(errno) => tracing::warn!(error = %errno, "could not cancel {}", self.selector_name()),
			}
		}
		drop(reader);

		self.finalize(pid, failure, cancelled_with)
	}

	/// Forks the selector with its stdout on a pipe and the list file on its
	/// stdin. Setup failures inside the child surface only as its exit status.
	fn spawn_selector(&self) -> Result<(Pid, File), MenuError> {
		let program = self.argv.first().ok_or(MenuError::NoSelector)?;
		let args = self
			.argv
			.iter()
			.map(|arg| CString::new(arg.as_bytes()).map_err(|_| MenuError::Nul(arg.clone())))
			.collect::<Result<Vec<_>, _>>()?;
		let program = CString::new(program.as_bytes()).map_err(|_| MenuError::Nul(program.clone()))?;

		let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(MenuError::Pipe)?;

		// SAFETY: the child only performs fd plumbing and exec; see `child`.
		match unsafe { fork() } {
			Err(source) => Err(MenuError::Fork {
				selector: self.selector_name(),
				source,
			}),
			Ok(ForkResult::Child) => {
				drop(read_end);
				if let Err(errno) = dup2_stdout(&write_end) {
					child::fail(format_args!("could not redirect stdout to parent process: {}", errno.desc()));
				}
				drop(write_end);

				let list = match File::open(self.list_path) {
					Ok(list) => list,
					Err(err) if err.kind() == io::ErrorKind::NotFound => {
						child::fail(format_args!("{} missing; was \"del -r\" run?", self.list_path.display()))
					}
					Err(err) => child::fail(format_args!("open: {}: {err}", self.list_path.display())),
				};
				if let Err(errno) = dup2_stdin(&list) {
					child::fail(format_args!("could not replace stdin: {}", errno.desc()));
				}
				drop(list);

				child::exec(&program, &args)
			}
			Ok(ForkResult::Parent { child: pid }) => {
				drop(write_end);
				tracing::debug!(pid = pid.as_raw(), selector = %self.selector_name(), "selector started");
				Ok((pid, File::from(read_end)))
			}
		}
	}

	/// Launches each newline-terminated line the selector prints.
	fn stream_selections(&mut self, reader: &mut impl BufRead) -> Result<(), MenuError> {
		let mut line = Vec::new();
		loop {
			line.clear();
			let read = reader.read_until(b'\n', &mut line).map_err(|source| MenuError::Read {
				selector: self.selector_name(),
				source,
			})?;
			if read == 0 {
				return Ok(());
			}

			let Some(selection) = line.strip_suffix(b"\n") else {
				tracing::warn!("missing newline after '{}'", String::from_utf8_lossy(&line));
				continue;
			};
			if selection.is_empty() {
				continue;
			}
			if selection.contains(&0) {
				tracing::warn!("ignoring selection with a NUL byte: '{}'", String::from_utf8_lossy(selection));
				continue;
			}

			self.launcher.launch(&CommandName::from_bytes(selection))?;
		}
	}

	/// Waits for the selector and folds its fate into the session outcome.
	fn finalize(&self, pid: Pid, failure: Option<MenuError>, cancelled_with: Option<i32>) -> MenuOutcome {
		let selector = self.selector_name();
		let status = match wait_for_exit(pid) {
			Ok(status) => status,
			Err(errno) => {
				tracing::warn!(error = %errno, "error waiting on {selector}");
				return match failure {
					Some(err) => MenuOutcome::Failed(err),
					None => MenuOutcome::WaitFailed(errno),
				};
			}
		};

		if let Some(signal) = status.signal() {
			if cancelled_with != Some(signal) {
				tracing::warn!("{selector} received signal {signal}");
			}
			return match failure {
				Some(err) => MenuOutcome::Failed(err),
				None if cancelled_with == Some(signal) => MenuOutcome::Success,
				None => MenuOutcome::SelectorSignaled(signal),
			};
		}

		let code = status.code().unwrap_or_default();
		match failure {
			Some(err) => MenuOutcome::Failed(err),
			None if code != 0 => {
				tracing::warn!("{selector} died with exit status {code}");
				MenuOutcome::SelectorExited(code)
			}
			None => MenuOutcome::Success,
		}
	}
}

/// Blocks until `pid` terminates, retrying on `EINTR`.
///
/// Decodes the raw status itself: `nix`'s `waitpid` rejects signal numbers
/// outside its `Signal` enum after the child has already been reaped.
fn wait_for_exit(pid: Pid) -> Result<ExitStatus, Errno> {
	let mut status = 0;
	loop {
		// SAFETY: `status` is a live, writable int for the whole call.
		match Errno::result(unsafe { nix::libc::waitpid(pid.as_raw(), &mut status, 0) }) {
			Err(Errno::EINTR) => continue,
			Err(errno) => return Err(errno),
			Ok(_) => {}
		}
		let status = ExitStatus::from_raw(status);
		if status.code().is_some() || status.signal().is_some() {
			return Ok(status);
		}
	}
}
