//! Freedesktop desktop entry parsing.
//!
//! Only the handful of keys needed to pick a launchable command are read:
//! `NoDisplay`, `Terminal` and `Exec`, and only inside the `[Desktop Entry]`
//! group. Everything else in the file is ignored.

use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::command::CommandName;

/// Suffix a file name must carry to be parsed at all.
pub const DESCRIPTOR_EXTENSION: &[u8] = b".desktop";

/// Group header that opens the section we care about.
pub const SECTION_HEADER: &[u8] = b"[Desktop Entry]";

/// Indirection helper whose arguments hide the real command.
const ENV_HELPER: &[u8] = b"env";

/// Keys read from one descriptor file. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorRecord {
	pub source: PathBuf,
	/// Raw value of the last `Exec` key seen before parsing stopped.
	pub exec_line: Option<Vec<u8>>,
	pub no_display: bool,
	pub terminal: bool,
}

impl DescriptorRecord {
	/// Parses descriptor text. Parsing stops at the first `NoDisplay=true`
	/// or `Terminal=true`, since either rules the file out.
	pub fn parse(source: impl Into<PathBuf>, text: &[u8]) -> Self {
		let mut record = Self {
			source: source.into(),
			..Self::default()
		};

		let mut in_section = false;
		for line in text.split(|&b| b == b'\n') {
			if !in_section {
				in_section = line.eq_ignore_ascii_case(SECTION_HEADER);
				continue;
			}

			if let Some(value) = key_value(line, b"NoDisplay") {
				if is_true(value) {
					record.no_display = true;
					break;
				}
			} else if let Some(value) = key_value(line, b"Terminal") {
				if is_true(value) {
					record.terminal = true;
					break;
				}
			} else if let Some(value) = key_value(line, b"Exec") {
				record.exec_line = Some(value.to_vec());
			}
		}

		record
	}

	/// Base name of the command this entry launches, if it launches one.
	pub fn command(&self) -> Option<CommandName> {
		if self.no_display || self.terminal {
			return None;
		}

		let mut tokens = tokens(self.exec_line.as_deref()?);
		let mut program = base_name(tokens.next()?)?;

		// `env VAR=value -i program ...`: the program is the first word that
		// is neither an assignment nor an option.
		if program == ENV_HELPER {
			let real = tokens.find(|token| !token[1..].contains(&b'=') && !token.starts_with(b"-"))?;
			program = base_name(real)?;
		}

		Some(CommandName::from_bytes(program))
	}
}

/// True when the path names a file worth opening.
pub fn is_descriptor(path: &Path) -> bool {
	path.as_os_str().as_bytes().ends_with(DESCRIPTOR_EXTENSION)
}

/// Reads and parses the descriptor at `path`.
///
/// Returns `Ok(None)` without opening anything when the name lacks the
/// descriptor extension or `path` does not lead to a regular file.
pub fn read_descriptor(path: &Path) -> io::Result<Option<DescriptorRecord>> {
	if !is_descriptor(path) || !std::fs::metadata(path)?.is_file() {
		return Ok(None);
	}
	let text = std::fs::read(path)?;
	Ok(Some(DescriptorRecord::parse(path, &text)))
}

/// Matches `<key> = <value>` with optional blanks around `=`, returning the
/// value from its first non-blank byte. The key itself is case-sensitive and
/// must be followed directly by a blank or `=`, so `Exec[de]` never matches.
fn key_value<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
	let rest = line.strip_prefix(key)?;
	let rest = rest.trim_ascii_start().strip_prefix(b"=")?;
	let value = rest.trim_ascii_start();
	(!value.is_empty()).then_some(value)
}

fn is_true(value: &[u8]) -> bool {
	tokens(value).next().is_some_and(|token| token.eq_ignore_ascii_case(b"true"))
}

fn tokens(value: &[u8]) -> impl Iterator<Item = &[u8]> {
	value.split(u8::is_ascii_whitespace).filter(|token| !token.is_empty())
}

/// Final path component, ignoring trailing slashes.
fn base_name(token: &[u8]) -> Option<&[u8]> {
	let trimmed = match token.iter().rposition(|&b| b != b'/') {
		Some(end) => &token[..=end],
		None => return None,
	};
	let start = trimmed.iter().rposition(|&b| b == b'/').map_or(0, |slash| slash + 1);
	Some(&trimmed[start..])
}
