//! Desktop entry discovery and launching.
//!
//! Two operations make up the crate:
//!
//! * [`refresh`] scans directory trees for Freedesktop desktop entries,
//!   merges the commands they name with an optional plain list, and
//!   atomically persists the result as a sorted, de-duplicated list file.
//! * [`menu`] feeds that list file to an external selector program and
//!   launches every command the selector prints.
//!
//! Commands are validated with [`Resolver`], which follows the shell's
//! `PATH` search rules.

pub mod command;
pub mod entry;
pub mod load;
pub mod menu;
pub mod refresh;
pub mod registry;
pub mod resolve;
pub mod scan;

pub use command::CommandName;
pub use load::{ListSource, LoadError};
pub use menu::{ForkLauncher, LaunchError, Launcher, Menu, MenuError, MenuOutcome};
pub use refresh::{Refresh, RefreshError};
pub use registry::{PersistError, Registry, RegistryError};
pub use resolve::{ResolveError, Resolver};
pub use scan::{ScanError, Scanner};

/// Process exit codes shared by both operations.
pub mod exit {
	/// Everything went fine.
	pub const SUCCESS: u8 = 0;
	/// A fatal error stopped the operation.
	pub const FATAL: u8 = 1;
	/// The operation finished, but something went wrong along the way.
	pub const NON_FATAL: u8 = 2;
	/// Added to a signal number when the selector is killed by a signal.
	pub const SIGNAL_BASE: u8 = 128;
}
