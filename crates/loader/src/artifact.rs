//! Loading a resolved file into the interpreter.
//!
//! The strategy is picked from the file extension alone:
//!
//! | extension               | strategy    |
//! |-------------------------|-------------|
//! | none, `.rb`, unknown    | source      |
//! | `.mrb`                  | precompiled |
//! | `.so`, `.dll`, `.dylib` | native      |

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::host::{Host, HostCapabilities, ParseOptions, with_arena};
use crate::irep::CodeUnit;
use crate::native::load_native;
use crate::resolve::{NATIVE_EXTENSIONS, PRECOMPILED_EXTENSION, SOURCE_EXTENSION, extension};
use crate::value::Scope;

/// Result of loading one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
	/// Top-level code, ready for the host to run.
	Code(CodeUnit),
	/// A native library whose initializer has already run.
	Native,
	/// A precompiled file that deserialized to nothing without raising.
	Empty,
}

impl Artifact {
	pub fn as_code(&self) -> Option<&CodeUnit> {
		match self {
			Self::Code(unit) => Some(unit),
			_ => None,
		}
	}
}

/// How a file is turned into an [`Artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
	Source,
	Precompiled,
	Native,
}

impl LoadStrategy {
	/// Picks the strategy from the exact, case-sensitive extension of `path`.
	pub fn for_path(path: &str) -> Self {
		match extension(path) {
			None => Self::Source,
			Some(ext) if ext == SOURCE_EXTENSION => Self::Source,
			Some(ext) if ext == PRECOMPILED_EXTENSION => Self::Precompiled,
			Some(ext) if NATIVE_EXTENSIONS.contains(&ext) => Self::Native,
			Some(_) => Self::Source,
		}
	}
}

/// Loads the file at `path`, binding code units to `target`.
pub fn load_file<H: Host>(host: &mut H, path: &str, target: Scope) -> Result<Artifact> {
	let strategy = LoadStrategy::for_path(path);
	debug!(path, ?strategy, "loading file");
	match strategy {
		LoadStrategy::Source => load_source(host, path, target),
		LoadStrategy::Precompiled => load_precompiled(host, path, target),
		LoadStrategy::Native => load_native(host, path).map(|()| Artifact::Native),
	}
}

fn read_file(path: &str) -> Result<Vec<u8>> {
	fs::read(path).map_err(|error| {
		debug!(path, %error, "failed to read module");
		Error::cannot_load(path)
	})
}

fn load_source<H: Host>(host: &mut H, path: &str, target: Scope) -> Result<Artifact> {
	let source = read_file(path)?;
	let options = ParseOptions::parse_only(Path::new(path));

	let irep = with_arena(host, |host| {
		let irep = host.parse(&source, &options);
		if let Some(exc) = host.take_exception() {
			return Err(Error::Raised(exc));
		}
		irep.ok_or_else(|| Error::Runtime("parser produced no result, likely memory exhaustion".to_string()))
	})?;

	let unit = CodeUnit::script(irep, target);
	host.gc_protect(&unit);
	Ok(Artifact::Code(unit))
}

fn load_precompiled<H: Host>(host: &mut H, path: &str, target: Scope) -> Result<Artifact> {
	let bytes = read_file(path)?;

	let Some(mut irep) = with_arena(host, |host| host.read_irep(&bytes)) else {
		return match host.take_exception() {
			Some(exc) => Err(Error::Raised(exc)),
			None => Ok(Artifact::Empty),
		};
	};

	if host.capabilities().contains(HostCapabilities::LEGACY_BYTECODE) && irep.normalize_legacy_stop() {
		debug!(path, "rewrote trailing STOP of legacy unit");
	}
	Ok(Artifact::Code(CodeUnit::script(irep, target)))
}
