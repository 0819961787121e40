//! `del`: pick a desktop application from a menu and run it.

mod cli;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use cli::{Action, Cli};
use del_launcher::{MenuOutcome, Refresh, Resolver, exit};

fn main() -> ExitCode {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	match run(cli) {
		Ok(code) => ExitCode::from(code),
		Err(err) => {
			tracing::debug!(error = ?err, "fatal error");
			eprintln!("del: {err:#}");
			ExitCode::from(exit::FATAL)
		}
	}
}

fn run(cli: Cli) -> anyhow::Result<u8> {
	match cli.into_action(std::env::var_os("HOME"))? {
		Action::Refresh { list, roots } => {
			let resolver = Resolver::from_env();
			let mut stdout = io::stdout().lock();
			Refresh::new(&list, &roots, &resolver).with_stdin().run(&mut stdout)?;
			Ok(exit::SUCCESS)
		}
		Action::Launch { list, argv } => {
			let outcome = del_launcher::Menu::new(&list, &argv).run();
			if let MenuOutcome::Failed(err) = &outcome {
				eprintln!("del: {err}");
			}
			Ok(outcome.code())
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("DEL_LOG").unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.without_time()
		.init();
}
