//! Loader configuration and per-interpreter bookkeeping.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::host::HostCapabilities;
use crate::native::InitInvocation;

/// Separator between directories in the search path variable.
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

/// Separator between module names in the auto-require variable.
pub const REQUIRE_LIST_SEPARATOR: char = ',';

/// Source of environment variables.
pub trait EnvLookup {
	fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
///
/// A value that is not valid UTF-8 is converted lossily instead of being
/// treated as unset, so its valid entries still take effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
	fn var(&self, name: &str) -> Option<String> {
		let value = std::env::var_os(name)?;
		match value.into_string() {
			Ok(value) => Some(value),
			Err(raw) => {
				warn!(name, "environment variable is not valid UTF-8, converting lossily");
				Some(raw.to_string_lossy().into_owned())
			}
		}
	}
}

impl EnvLookup for HashMap<String, String> {
	fn var(&self, name: &str) -> Option<String> {
		self.get(name).cloned()
	}
}

impl<F> EnvLookup for F
where
	F: Fn(&str) -> Option<String>,
{
	fn var(&self, name: &str) -> Option<String> {
		self(name)
	}
}

/// Names of the environment variables the loader reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
	/// Directory list searched by `require` and `load`.
	pub load_path_var: String,
	/// One extra directory appended after the search path.
	pub gems_root_var: String,
	/// Comma separated modules required at interpreter start.
	pub auto_require_var: String,
	/// Fallback for `gems_root_var`, baked in at compile time.
	pub default_gems_root: Option<PathBuf>,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			load_path_var: "MRBLIB".to_string(),
			gems_root_var: "MRBGEMS_ROOT".to_string(),
			auto_require_var: "MRUBY_REQUIRE".to_string(),
			default_gems_root: option_env!("MRBGEMS_ROOT").map(PathBuf::from),
		}
	}
}

/// Loader bookkeeping owned by one interpreter context.
#[derive(Debug, Clone, Default)]
pub struct LoaderState {
	pub config: LoaderConfig,
	/// How native initializers are invoked, fixed by [`crate::init`].
	pub invocation: InitInvocation,
	/// Paths whose top-level code is currently running under `require`.
	pub loading: Vec<String>,
}

impl LoaderState {
	pub fn new(config: LoaderConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	pub(crate) fn select_invocation(&mut self, capabilities: HostCapabilities) {
		self.invocation = if capabilities.contains(HostCapabilities::REENTRANT_CALLS) {
			InitInvocation::Direct
		} else {
			InitInvocation::WrappedFrame
		};
	}
}

/// Splits a separator delimited environment value.
///
/// An empty value yields nothing. Interior empty segments are kept, and a
/// single trailing separator does not add an empty entry.
pub fn split_env_list(value: &str, separator: char) -> Vec<String> {
	if value.is_empty() {
		return Vec::new();
	}
	let mut items: Vec<String> = value.split(separator).map(str::to_string).collect();
	if items.last().is_some_and(String::is_empty) {
		items.pop();
	}
	items
}
