//! Logical name to canonical file resolution.
//!
//! A name is tried against every load path directory in order. Within one
//! directory, a `require` of a name without an extension tries `.rb`, `.mrb`
//! and the platform native extension in that order; every other request
//! tries the name verbatim. The first candidate that canonicalizes to a
//! readable regular file wins.

use std::fs::{self, File};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::host::Host;
use crate::value::Value;

/// Extension of script source files.
pub const SOURCE_EXTENSION: &str = ".rb";

/// Extension of precompiled bytecode files.
pub const PRECOMPILED_EXTENSION: &str = ".mrb";

/// Extension of native libraries on this platform.
pub const NATIVE_EXTENSION: &str = std::env::consts::DLL_SUFFIX;

/// Extensions accepted as native libraries regardless of platform.
pub const NATIVE_EXTENSIONS: [&str; 3] = [".so", ".dll", ".dylib"];

const REQUIRE_EXTENSIONS: [Option<&str>; 3] = [Some(SOURCE_EXTENSION), Some(PRECOMPILED_EXTENSION), Some(NATIVE_EXTENSION)];
const VERBATIM: [Option<&str>; 1] = [None];

/// Returns the last path component, splitting on both `/` and `\`.
pub fn basename(name: &str) -> &str {
	name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Returns the extension of the last path component, including the dot.
pub fn extension(name: &str) -> Option<&str> {
	let base = basename(name);
	base.rfind('.').map(|idx| &base[idx..])
}

/// Whether `name` is absolute under this platform's convention.
pub fn is_absolute_name(name: &str) -> bool {
	#[cfg(windows)]
	{
		name.as_bytes().get(1) == Some(&b':')
	}
	#[cfg(not(windows))]
	{
		name.starts_with('/')
	}
}

/// Extensions to append, in order, when resolving `name`.
pub fn candidate_extensions(name: &str, for_require: bool) -> &'static [Option<&'static str>] {
	if for_require && extension(name).is_none() {
		&REQUIRE_EXTENSIONS
	} else {
		&VERBATIM
	}
}

/// Resolves `name` against `load_path` without consulting host state.
///
/// A name starting with `.` is resolved against the working directory only.
pub fn resolve_in(name: &str, load_path: &[String], for_require: bool) -> Result<String> {
	let dot_path = [".".to_string()];
	let dirs = if name.starts_with('.') { &dot_path[..] } else { load_path };
	let extensions = candidate_extensions(name, for_require);

	for dir in dirs {
		for ext in extensions {
			if let Some(path) = check_candidate(dir, name, *ext) {
				debug!(name, path = %path, "resolved module");
				return Ok(path);
			}
		}
	}

	Err(Error::cannot_load(name))
}

/// Resolves `name` against the host's current `$:`.
pub fn find_file<H: Host + ?Sized>(host: &H, name: &str, for_require: bool) -> Result<String> {
	let load_path = current_load_path(host)?;
	resolve_in(name, &load_path, for_require)
}

/// Snapshot of the string entries of `$:`.
fn current_load_path<H: Host + ?Sized>(host: &H) -> Result<Vec<String>> {
	let Some(entries) = host.global(crate::LOAD_PATH_GLOBAL).and_then(Value::as_array) else {
		return Err(Error::Runtime("invalid $:".to_string()));
	};
	Ok(entries
		.iter()
		.filter_map(|entry| {
			let dir = entry.as_str();
			if dir.is_none() {
				warn!(entry = %entry.inspect(), "skipping non-string load path entry");
			}
			dir.map(str::to_string)
		})
		.collect())
}

fn check_candidate(dir: &str, name: &str, ext: Option<&str>) -> Option<String> {
	let mut candidate = if is_absolute_name(name) {
		name.to_string()
	} else {
		format!("{dir}/{name}")
	};
	if let Some(ext) = ext {
		candidate.push_str(ext);
	}

	let canonical = match fs::canonicalize(&candidate) {
		Ok(path) => path,
		Err(error) => {
			trace!(candidate = %candidate, %error, "candidate does not exist");
			return None;
		}
	};
	match fs::metadata(&canonical) {
		Ok(meta) if !meta.is_dir() => {}
		_ => {
			trace!(candidate = %canonical.display(), "candidate is not a file");
			return None;
		}
	}
	if let Err(error) = File::open(&canonical) {
		trace!(candidate = %canonical.display(), %error, "candidate is not readable");
		return None;
	}

	match canonical.to_str() {
		Some(path) => Some(path.to_string()),
		None => {
			warn!(candidate = %canonical.display(), "skipping candidate with a non-UTF-8 path");
			None
		}
	}
}
