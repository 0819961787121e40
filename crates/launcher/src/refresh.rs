//! The refresh operation: merge list sources, scan, persist.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::load::{ListSource, LoadError, load};
use crate::registry::{Registry, RegistryError};
use crate::resolve::Resolver;
use crate::scan::{ScanError, Scanner};

#[derive(Debug, Error)]
pub enum RefreshError {
	#[error(transparent)]
	Load(#[from] LoadError),

	#[error(transparent)]
	Scan(#[from] ScanError),

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// Rebuilds the command list at `destination`.
///
/// Sources are merged in this order: the extra list (usually stdin), the
/// destination's current contents, then desktop entries found under the
/// roots. A destination that does not exist yet counts as empty.
///
/// Two refreshes of the same destination running at once are not
/// coordinated; the last rename wins.
pub struct Refresh<'a> {
	destination: &'a Path,
	roots: &'a [PathBuf],
	resolver: &'a Resolver,
	extra: Option<Box<dyn BufRead + 'a>>,
	max_open: Option<usize>,
}

impl<'a> Refresh<'a> {
	pub fn new(destination: &'a Path, roots: &'a [PathBuf], resolver: &'a Resolver) -> Self {
		Self {
			destination,
			roots,
			resolver,
			extra: None,
			max_open: None,
		}
	}

	/// Reads an additional list from `reader` before anything else.
	pub fn with_list(mut self, reader: impl BufRead + 'a) -> Self {
		self.extra = Some(Box::new(reader));
		self
	}

	/// Reads the process's standard input as an additional list, unless it
	/// is a terminal. A closed stdin reads as empty.
	pub fn with_stdin(self) -> Self {
		let stdin = io::stdin();
		if stdin.is_terminal() {
			tracing::debug!("stdin is a terminal; not reading a command list from it");
			return self;
		}
		self.with_list(stdin.lock())
	}

	pub fn with_max_open(mut self, max_open: usize) -> Self {
		self.max_open = Some(max_open);
		self
	}

	/// Runs the refresh and returns the number of commands persisted.
	///
	/// Discovery notifications go to `out`.
	pub fn run(self, out: &mut dyn Write) -> Result<usize, RefreshError> {
		let mut registry = Registry::new();

		if let Some(mut extra) = self.extra {
			load(ListSource::Reader(&mut *extra), &mut registry, self.resolver, out)?;
		}

		match load(ListSource::Path(self.destination), &mut registry, self.resolver, out) {
			Ok(_) => {}
			Err(err) if err.is_not_found() => {
				tracing::debug!(path = %self.destination.display(), "no existing command list");
			}
			Err(err) => return Err(err.into()),
		}

		let mut scanner = Scanner::new(&mut registry, self.resolver, out);
		if let Some(max_open) = self.max_open {
			scanner = scanner.with_max_open(max_open);
		}
		scanner.scan_all(self.roots)?;

		registry.persist(self.destination)?;
		let persisted = registry.sorted().len();
		tracing::info!(path = %self.destination.display(), persisted, "command list refreshed");
		Ok(persisted)
	}
}
