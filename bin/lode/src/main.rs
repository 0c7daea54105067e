//! Lode command line.
//!
//! Resolves module names the way `require` and `load` would, without a host
//! interpreter. Useful for checking `MRBLIB` and `MRBGEMS_ROOT` setups.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lode_loader::{EntryHook, LoaderConfig, ProcessEnv, entry_symbol, initial_load_path, resolve_in};
use tracing::debug;

/// Lode command line arguments.
#[derive(Parser, Debug)]
#[command(name = "lode")]
#[command(about = "Inspect module resolution for the lode loader")]
struct Args {
	/// Verbose logging, repeat for trace output
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the initial load path, one directory per line
	LoadPath,
	/// Resolve a module name to its canonical file
	Resolve {
		name: String,
		/// Resolve like `load`: no extensions are appended
		#[arg(long)]
		load: bool,
	},
	/// Print the native entry point symbols for a library path
	Symbols { path: String },
}

fn main() -> ExitCode {
	let args = Args::parse();
	setup_tracing(args.verbose);

	match run(args.command) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			eprintln!("lode: {error}");
			ExitCode::FAILURE
		}
	}
}

fn run(command: Command) -> lode_loader::Result<()> {
	match command {
		Command::LoadPath => {
			for dir in load_path() {
				println!("{dir}");
			}
		}
		Command::Resolve { name, load } => {
			let dirs = load_path();
			let path = resolve_in(&name, &dirs, !load)?;
			println!("{path}");
		}
		Command::Symbols { path } => {
			println!("{}", entry_symbol(&path, EntryHook::Init));
			println!("{}", entry_symbol(&path, EntryHook::Final));
		}
	}
	Ok(())
}

fn load_path() -> Vec<String> {
	let dirs = initial_load_path(&LoaderConfig::default(), &ProcessEnv);
	debug!(count = dirs.len(), "load path from environment");
	dirs
}

fn setup_tracing(verbose: u8) {
	let level = match verbose {
		0 => tracing::Level::INFO,
		1 => tracing::Level::DEBUG,
		_ => tracing::Level::TRACE,
	};
	tracing_subscriber::fmt()
		.with_max_level(level)
		.with_writer(std::io::stderr)
		.init();
}
