//! Shell-style executable lookup.
//!
//! Follows POSIX "Command Search and Execution": a name containing `/` is
//! tested as is, anything else is searched for in each `PATH` component in
//! order, where an empty component means the current directory.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};
use thiserror::Error;

/// Longest candidate path the resolver will build, terminator included.
pub const MAX_PATH_LEN: usize = nix::libc::PATH_MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
	#[error("{0}: command not found")]
	NotFound(String),

	#[error("{0}: PATH is unset")]
	NoSearchPath(String),

	/// A candidate built from a search path component exceeded [`MAX_PATH_LEN`].
	#[error("{name}: candidate path of {len} bytes is too long")]
	TooLong { name: String, len: usize },
}

/// Resolves command names against a colon-separated search path.
///
/// Results are inherently racy: the file may change between the check and
/// any later use of the path, exactly as with a shell's own lookup.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
	search_path: Option<OsString>,
}

impl Resolver {
	pub fn new(search_path: Option<OsString>) -> Self {
		Self { search_path }
	}

	/// Resolver using the process's `PATH`.
	pub fn from_env() -> Self {
		Self::new(std::env::var_os("PATH"))
	}

	pub fn search_path(&self) -> Option<&OsStr> {
		self.search_path.as_deref()
	}

	/// Returns the path that executing `command` would run.
	pub fn resolve(&self, command: &OsStr) -> Result<PathBuf, ResolveError> {
		let name = command.as_bytes();
		if name.contains(&b'/') {
			let path = Path::new(command);
			return if is_executable(path) {
				Ok(path.to_path_buf())
			} else {
				Err(ResolveError::NotFound(lossy(command)))
			};
		}

		let search_path = self.search_path.as_deref().ok_or_else(|| ResolveError::NoSearchPath(lossy(command)))?;

		for component in search_path.as_bytes().split(|&b| b == b':') {
			let candidate = join_component(component, name);
			// Leave room for the NUL terminator the kernel will want.
			if candidate.len() >= MAX_PATH_LEN {
				return Err(ResolveError::TooLong {
					name: lossy(command),
					len: candidate.len(),
				});
			}

			let candidate = PathBuf::from(OsString::from_vec(candidate));
			if is_executable(&candidate) {
				return Ok(candidate);
			}
		}

		Err(ResolveError::NotFound(lossy(command)))
	}

	pub fn is_resolvable(&self, command: &OsStr) -> bool {
		self.resolve(command).is_ok()
	}
}

fn join_component(component: &[u8], name: &[u8]) -> Vec<u8> {
	let mut candidate = Vec::with_capacity(component.len() + name.len() + 2);
	if component.is_empty() {
		candidate.extend_from_slice(b"./");
	} else {
		candidate.extend_from_slice(component);
		if !component.ends_with(b"/") {
			candidate.push(b'/');
		}
	}
	candidate.extend_from_slice(name);
	candidate
}

/// True when `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
	access(path, AccessFlags::X_OK).is_ok() && std::fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

fn lossy(command: &OsStr) -> String {
	command.to_string_lossy().into_owned()
}
