//! Recursive search for desktop entries.
//!
//! Equivalent to `find ROOTS -xdev -name '*.desktop'`: the walk never leaves
//! the filesystem a root lives on, so mounts below a root have to be listed
//! as roots of their own. Symbolic links are followed, directory ones
//! included; a link back into an ancestor is reported as a loop and skipped.

use std::io::Write;
use std::path::{Path, PathBuf};

use nix::unistd::{SysconfVar, sysconf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::command::CommandName;
use crate::entry::read_descriptor;
use crate::registry::{Registry, RegistryError};
use crate::resolve::Resolver;

/// Descriptors held open besides the walk's own: stdin, stdout, stderr and
/// the descriptor file being parsed.
const RESERVED_FDS: usize = 4;

/// Smallest `_SC_OPEN_MAX` POSIX allows.
const POSIX_OPEN_MAX: usize = 20;

#[derive(Debug, Error)]
pub enum ScanError {
	#[error("unable to walk '{}': {source}", root.display())]
	Walk { root: PathBuf, source: walkdir::Error },

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// Walks directory trees and feeds the commands of every usable desktop
/// entry into a [`Registry`].
pub struct Scanner<'a> {
	registry: &'a mut Registry,
	resolver: &'a Resolver,
	out: &'a mut dyn Write,
	max_open: usize,
}

impl<'a> Scanner<'a> {
	/// `out` receives a `+ name (path)` line for every accepted command.
	pub fn new(registry: &'a mut Registry, resolver: &'a Resolver, out: &'a mut dyn Write) -> Self {
		Self {
			registry,
			resolver,
			out,
			max_open: max_open_dirs(),
		}
	}

	/// Overrides the number of directory handles the walk may hold open.
	pub fn with_max_open(mut self, max_open: usize) -> Self {
		self.max_open = max_open.max(1);
		self
	}

	/// Scans every root in order, or `/` when there are none.
	pub fn scan_all(&mut self, roots: &[PathBuf]) -> Result<usize, ScanError> {
		if roots.is_empty() {
			return self.scan(Path::new("/"));
		}

		let mut accepted = 0;
		for root in roots {
			accepted += self.scan(root)?;
		}
		Ok(accepted)
	}

	/// Scans one tree and returns how many commands were added.
	///
	/// A root that cannot be read aborts the scan. Unreadable entries below
	/// the root are skipped.
	pub fn scan(&mut self, root: &Path) -> Result<usize, ScanError> {
		tracing::debug!(root = %root.display(), max_open = self.max_open, "scan.start");

		let walk = WalkDir::new(root).same_file_system(true).follow_links(true).max_open(self.max_open);

		let mut accepted = 0;
		for entry in walk {
			let entry = match entry {
				Ok(entry) => entry,
				Err(source) if source.depth() == 0 => {
					return Err(ScanError::Walk {
						root: root.to_path_buf(),
						source,
					});
				}
				Err(err) => {
					tracing::debug!(error = %err, "scan.skip");
					continue;
				}
			};

			// FIFOs and devices would block or never end.
			if !entry.file_type().is_file() {
				continue;
			}
			if self.visit_file(entry.path())?.is_some() {
				accepted += 1;
			}
		}

		tracing::debug!(root = %root.display(), accepted, "scan.complete");
		Ok(accepted)
	}

	/// Parses one candidate file and registers its command if it resolves.
	///
	/// Only registry growth failures are errors; unreadable or unusable
	/// files yield `Ok(None)`.
	pub fn visit_file(&mut self, path: &Path) -> Result<Option<CommandName>, ScanError> {
		let record = match read_descriptor(path) {
			Ok(Some(record)) => record,
			Ok(None) => return Ok(None),
			Err(err) => {
				tracing::debug!(path = %path.display(), error = %err, "descriptor unreadable");
				return Ok(None);
			}
		};

		let Some(command) = record.command() else {
			return Ok(None);
		};
		if self.registry.contains(command.as_os_str()) {
			return Ok(None);
		}

		let Some(name) = self.pick_resolvable(command) else {
			return Ok(None);
		};

		if let Err(err) = writeln!(self.out, "+ {name} ({})", path.display()) {
			tracing::debug!(error = %err, "could not report discovered command");
		}
		self.registry.add(name.clone())?;
		Ok(Some(name))
	}

	/// Prefers the lowercase spelling, falling back to the original casing.
	fn pick_resolvable(&self, command: CommandName) -> Option<CommandName> {
		let lowercase = command.to_ascii_lowercase();
		match self.resolver.resolve(lowercase.as_os_str()) {
			Ok(_) => return Some(lowercase),
			Err(err) => tracing::trace!(error = %err, "lowercase spelling not resolvable"),
		}

		if lowercase.as_bytes() != command.as_bytes() && self.resolver.is_resolvable(command.as_os_str()) {
			return Some(command);
		}
		None
	}
}

/// Directory handles the walk may keep open: the process limit minus
/// [`RESERVED_FDS`].
pub fn max_open_dirs() -> usize {
	let limit = match sysconf(SysconfVar::OPEN_MAX) {
		Ok(Some(limit)) => usize::try_from(limit).unwrap_or(usize::MAX),
		_ => POSIX_OPEN_MAX,
	};
	limit.saturating_sub(RESERVED_FDS).max(1)
}

#[cfg(test)]
mod tests;
