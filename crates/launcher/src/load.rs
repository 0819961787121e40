//! Loading plain, newline-separated command lists.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::command::CommandName;
use crate::registry::{Registry, RegistryError};
use crate::resolve::Resolver;

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("could not load commands from '{}': {source}", path.display())]
	Open { path: PathBuf, source: io::Error },

	#[error("could not load commands from {origin}: {source}")]
	Read { origin: String, source: io::Error },

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

impl LoadError {
	/// True when the list file simply does not exist yet.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Open { source, .. } if source.kind() == io::ErrorKind::NotFound)
	}
}

/// Where a list comes from: a file to open, or a stream the caller owns.
pub enum ListSource<'a> {
	Path(&'a Path),
	Reader(&'a mut dyn BufRead),
}

impl ListSource<'_> {
	fn origin(&self) -> String {
		match self {
			ListSource::Path(path) => format!("'{}'", path.display()),
			ListSource::Reader(_) => "stdin".to_string(),
		}
	}
}

/// Adds every resolvable name in `source` to `registry` and returns how
/// many were added.
///
/// Names that do not resolve are reported on `out` as `- name` and dropped.
/// Blank lines and names already present are skipped.
pub fn load(source: ListSource<'_>, registry: &mut Registry, resolver: &Resolver, out: &mut dyn Write) -> Result<usize, LoadError> {
	let origin = source.origin();
	match source {
		ListSource::Path(path) => {
			let file = File::open(path).map_err(|source| LoadError::Open {
				path: path.to_path_buf(),
				source,
			})?;
			load_lines(&mut BufReader::new(file), &origin, registry, resolver, out)
		}
		ListSource::Reader(reader) => load_lines(reader, &origin, registry, resolver, out),
	}
}

fn load_lines(reader: &mut dyn BufRead, origin: &str, registry: &mut Registry, resolver: &Resolver, out: &mut dyn Write) -> Result<usize, LoadError> {
	let mut added = 0;
	let mut line = Vec::new();
	loop {
		line.clear();
		let read = reader.read_until(b'\n', &mut line).map_err(|source| LoadError::Read {
			origin: origin.to_string(),
			source,
		})?;
		if read == 0 {
			break;
		}

		let entry = line.strip_suffix(b"\n").unwrap_or(&line);
		if entry.is_empty() {
			continue;
		}

		let name = CommandName::from_bytes(entry);
		if registry.contains(name.as_os_str()) {
			continue;
		}
		if resolver.is_resolvable(name.as_os_str()) {
			registry.add(name)?;
			added += 1;
		} else if let Err(err) = writeln!(out, "- {name}") {
			tracing::debug!(error = %err, "could not report rejected command");
		}
	}

	tracing::debug!(origin, added, "command list loaded");
	Ok(added)
}
