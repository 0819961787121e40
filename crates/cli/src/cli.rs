use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use clap::Parser;
use del_launcher::menu::DEFAULT_SELECTOR;

/// Basename of the default command list, kept in `$HOME`.
pub const DEFAULT_LIST_BASENAME: &str = ".del";

const LONG_ABOUT: &str = "\
DEL searches for Freedesktop Desktop Entries, generates a list of graphical
commands and uses dmenu as a front-end so the user can select a command to
execute. The first time DEL is executed, it should be invoked as \"del -r\" to
generate the application list.

When \"-r\" is not specified, dmenu is launched with the command list fed into
standard input. Trailing command line arguments can be used to pass flags to
dmenu or use a different menu altogether:

    Set the background color of selected text to red:
    $ del -- -sb \"#ff0000\"

    Use rofi in dmenu mode instead of dmenu:
    $ del rofi -dmenu";

const AFTER_LONG_HELP: &str = "\
Exit Statuses:
- 1: Fatal error encountered.
- 2: Non-fatal error encountered.
- > 128: The menu subprocess was killed by signal \"N\" where \"N\" is 128
  subtracted from the exit status.";

#[derive(Parser, Debug)]
#[command(name = "del")]
#[command(about = "Desktop Entry Launcher")]
#[command(long_about = LONG_ABOUT)]
#[command(after_long_help = AFTER_LONG_HELP)]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Use specified file as the command list (defaults to "$HOME/.del")
	#[arg(short = 'f', long = "file", value_name = "PATH")]
	pub file: Option<PathBuf>,

	/// Search for desktop entries to refresh the command list
	///
	/// Trailing arguments are the folders to search; "/" when none are given.
	/// The search does not cross filesystem boundaries, like
	/// `find $ARGUMENTS -xdev -name '*.desktop'`. A newline-separated list of
	/// programs on stdin is merged in; programs missing from $PATH are dropped.
	#[arg(short, long)]
	pub refresh: bool,

	/// Log debug output to stderr (DEL_LOG overrides)
	#[arg(short, long)]
	pub verbose: bool,

	/// Folders to search with -r; otherwise the menu command and its arguments
	#[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGUMENTS")]
	pub args: Vec<OsString>,
}

/// What the invocation asks for, with every default filled in.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
	Refresh { list: PathBuf, roots: Vec<PathBuf> },
	Launch { list: PathBuf, argv: Vec<OsString> },
}

impl Cli {
	/// Resolves defaults; `home` is the value of `$HOME`.
	pub fn into_action(self, home: Option<OsString>) -> anyhow::Result<Action> {
		let list = match self.file {
			Some(file) => file,
			None => default_list_path(home)?,
		};

		Ok(if self.refresh {
			Action::Refresh {
				list,
				roots: self.args.into_iter().map(PathBuf::from).collect(),
			}
		} else {
			Action::Launch {
				list,
				argv: selector_argv(self.args),
			}
		})
	}
}

/// `$HOME/.del`, without doubling a trailing slash.
pub fn default_list_path(home: Option<OsString>) -> anyhow::Result<PathBuf> {
	match home {
		Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(DEFAULT_LIST_BASENAME)),
		_ => anyhow::bail!("HOME is unset; use \"-f\" to specify list path"),
	}
}

/// Prepends the default selector unless the arguments already name one.
pub fn selector_argv(args: Vec<OsString>) -> Vec<OsString> {
	let names_program = args.first().is_some_and(|first| !first.as_bytes().starts_with(b"-"));
	if names_program {
		return args;
	}
	let mut argv = Vec::with_capacity(args.len() + 1);
	argv.push(OsString::from(DEFAULT_SELECTOR));
	argv.extend(args);
	argv
}
