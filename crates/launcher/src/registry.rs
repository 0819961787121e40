//! In-memory command set and its on-disk list file.
//!
//! The registry is a plain vector searched linearly. Lists hold tens to a
//! few hundred commands, so a hash set would buy nothing here.
//!
//! Persisting never exposes a partially written list: the new contents go to
//! a temporary file in the destination's directory, are synced, and then
//! renamed over the destination.

use std::ffi::OsStr;
use std::io::{self, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::command::CommandName;

/// Number of slots added whenever the registry runs out of room.
pub const GROWTH_CHUNK: usize = 64;

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("could not resize command list: {0}")]
	Alloc(#[from] std::collections::TryReserveError),

	#[error("no commands found")]
	Empty,

	#[error(transparent)]
	Persist(#[from] PersistError),
}

/// Failure of one persistence step. The destination is untouched in every case.
#[derive(Debug, Error)]
pub enum PersistError {
	#[error("could not create temporary file in '{}': {source}", dir.display())]
	CreateTemp { dir: PathBuf, source: io::Error },

	#[error("could not write '{}': {source}", path.display())]
	Write { path: PathBuf, source: io::Error },

	#[error("unable to flush changes to '{}': {source}", path.display())]
	Sync { path: PathBuf, source: io::Error },

	#[error("unable to rename '{}' to '{}': {source}", from.display(), to.display())]
	Rename { from: PathBuf, to: PathBuf, source: io::Error },
}

/// Unordered set of command names, unique under case-insensitive comparison.
#[derive(Debug, Default)]
pub struct Registry {
	commands: Vec<CommandName>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &CommandName> {
		self.commands.iter()
	}

	pub fn contains(&self, name: &OsStr) -> bool {
		self.commands.iter().any(|command| command.eq_ignore_case(name.as_bytes()))
	}

	/// Appends `name` without checking for duplicates.
	///
	/// Storage grows by [`GROWTH_CHUNK`] slots at a time; failing to grow is
	/// reported rather than aborting the process.
	pub fn add(&mut self, name: CommandName) -> Result<(), RegistryError> {
		if self.commands.len() == self.commands.capacity() {
			self.commands.try_reserve_exact(GROWTH_CHUNK)?;
		}
		self.commands.push(name);
		Ok(())
	}

	/// Adds `name` unless an equal name is already present. Returns whether it was added.
	pub fn insert(&mut self, name: CommandName) -> Result<bool, RegistryError> {
		if self.contains(name.as_os_str()) {
			return Ok(false);
		}
		self.add(name)?;
		Ok(true)
	}

	/// Entries in list order: sorted ignoring case, with case-insensitive
	/// duplicates collapsed onto their first occurrence.
	pub fn sorted(&self) -> Vec<&CommandName> {
		let mut sorted: Vec<&CommandName> = self.commands.iter().collect();
		sorted.sort_by(|a, b| a.cmp_ignore_case(b));
		sorted.dedup_by(|next, prev| *prev == *next);
		sorted
	}

	/// Writes the list contents, one name per line.
	pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
		for command in self.sorted() {
			out.write_all(command.as_bytes())?;
			out.write_all(b"\n")?;
		}
		Ok(())
	}

	/// Writes the list to `path`, replacing any previous version atomically.
	pub fn persist(&self, path: &Path) -> Result<(), RegistryError> {
		self.stage(path)?.commit()?;
		Ok(())
	}

	/// Writes and syncs the list into a temporary file beside `path` without
	/// touching `path` itself. Dropping the result discards the file.
	pub fn stage(&self, path: &Path) -> Result<StagedList, RegistryError> {
		if self.is_empty() {
			return Err(RegistryError::Empty);
		}

		let dir = parent_dir(path);
		let prefix = path.file_name().unwrap_or_else(|| OsStr::new(".del"));
		let temp = tempfile::Builder::new()
			.prefix(prefix)
			.tempfile_in(dir)
			.map_err(|source| PersistError::CreateTemp { dir: dir.to_path_buf(), source })?;
		let temp_path = temp.path().to_path_buf();

		let mut writer = BufWriter::new(temp.as_file());
		self.write_to(&mut writer).map_err(|source| PersistError::Write { path: temp_path.clone(), source })?;
		writer.flush().map_err(|source| PersistError::Sync { path: temp_path.clone(), source })?;
		drop(writer);
		temp.as_file().sync_all().map_err(|source| PersistError::Sync { path: temp_path.clone(), source })?;

		tracing::debug!(temp = %temp_path.display(), entries = self.len(), "command list staged");
		Ok(StagedList {
			temp,
			destination: path.to_path_buf(),
		})
	}
}

/// A fully written list waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedList {
	temp: NamedTempFile,
	destination: PathBuf,
}

impl StagedList {
	pub fn temp_path(&self) -> &Path {
		self.temp.path()
	}

	/// Renames the staged file over the destination.
	pub fn commit(self) -> Result<(), PersistError> {
		let from = self.temp.path().to_path_buf();
		match self.temp.persist(&self.destination) {
			Ok(_) => {
				tracing::debug!(path = %self.destination.display(), "command list replaced");
				Ok(())
			}
			Err(err) => {
				let source = err.error;
				if let Err(cleanup) = err.file.close() {
					tracing::warn!(path = %from.display(), error = %cleanup, "could not delete temporary file");
				}
				Err(PersistError::Rename {
					from,
					to: self.destination,
					source,
				})
			}
		}
	}
}

fn parent_dir(path: &Path) -> &Path {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	}
}
