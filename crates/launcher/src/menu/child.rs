//! Code that runs in a freshly forked child, between `fork` and `exec`.
//!
//! The parent may have other threads (test harnesses do), so nothing here
//! touches the std stdio handles, whose locks may have been held at fork
//! time. Diagnostics go straight to the stderr descriptor with one `write`.

use std::ffi::{CStr, CString};
use std::fmt;

use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::{execvp, write};

/// Writes `del: <message>` to stderr and terminates the child with status 1.
pub(super) fn fail(message: fmt::Arguments<'_>) -> ! {
	let line = format!("del: {message}\n");
	let _ = write(std::io::stderr(), line.as_bytes());
	// SAFETY: `_exit` skips atexit handlers and stdio flushing, which belong
	// to the parent's image.
	unsafe { nix::libc::_exit(1) }
}

/// Replaces the child's image with `program`. Only returns by exiting.
pub(super) fn exec(program: &CStr, args: &[CString]) -> ! {
	// Rust ignores SIGPIPE and ignored dispositions survive exec.
	// SAFETY: restoring the default handler installs no Rust code.
	if let Err(errno) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
		fail(format_args!("could not reset SIGPIPE: {}", errno.desc()));
	}

	let errno = match execvp(program, args) {
		Ok(never) => match never {},
		Err(errno) => errno,
	};
	fail(format_args!("{}: {}", program.to_string_lossy(), errno.desc()))
}
