//! Initial load path construction.

use tracing::debug;

use crate::config::{EnvLookup, LoaderConfig, PATH_LIST_SEPARATOR, split_env_list};

/// Builds the initial load path list from the environment.
///
/// The search path variable contributes its directories in order, then one
/// extra directory is appended from the gems root variable, falling back to
/// the compile-time default when unset.
pub fn initial_load_path(config: &LoaderConfig, env: &impl EnvLookup) -> Vec<String> {
	let mut dirs = env
		.var(&config.load_path_var)
		.map(|value| split_env_list(&value, PATH_LIST_SEPARATOR))
		.unwrap_or_default();

	if let Some(root) = env.var(&config.gems_root_var) {
		dirs.push(root);
	} else if let Some(root) = &config.default_gems_root {
		dirs.push(root.to_string_lossy().into_owned());
	}

	debug!(load_path = ?dirs, "initialized load path");
	dirs
}
