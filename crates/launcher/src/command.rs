//! Command names compared without regard to ASCII case.

use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Name of an executable as it appears in the command list.
///
/// Case is preserved for display and execution, but equality and ordering
/// ignore ASCII case, so `Firefox` and `firefox` name the same entry. Names
/// are raw bytes; nothing requires them to be UTF-8.
#[derive(Clone, Debug)]
pub struct CommandName(OsString);

impl CommandName {
	pub fn new(name: impl Into<OsString>) -> Self {
		Self(name.into())
	}

	pub fn from_bytes(bytes: &[u8]) -> Self {
		Self(OsStr::from_bytes(bytes).to_os_string())
	}

	pub fn as_os_str(&self) -> &OsStr {
		&self.0
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Copy of this name with ASCII uppercase letters folded to lowercase.
	pub fn to_ascii_lowercase(&self) -> Self {
		Self(OsString::from_vec(self.as_bytes().to_ascii_lowercase()))
	}

	/// Case-insensitive comparison with an arbitrary byte string.
	pub fn eq_ignore_case(&self, other: &[u8]) -> bool {
		self.as_bytes().eq_ignore_ascii_case(other)
	}

	/// Ordering used by the persisted list: bytewise after ASCII folding.
	pub fn cmp_ignore_case(&self, other: &Self) -> Ordering {
		let lhs = self.as_bytes().iter().map(u8::to_ascii_lowercase);
		let rhs = other.as_bytes().iter().map(u8::to_ascii_lowercase);
		lhs.cmp(rhs)
	}
}

impl PartialEq for CommandName {
	fn eq(&self, other: &Self) -> bool {
		self.eq_ignore_case(other.as_bytes())
	}
}

impl Eq for CommandName {}

impl AsRef<OsStr> for CommandName {
	fn as_ref(&self) -> &OsStr {
		&self.0
	}
}

impl From<&str> for CommandName {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl fmt::Display for CommandName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.to_string_lossy())
	}
}
