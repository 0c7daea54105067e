//! The loaded-features registry (`$"`) and in-progress set (`$"_`).
//!
//! Both lists live in host globals that scripts can read, replace, or clear,
//! so they are looked up again on every call. Entries are compared as
//! strings; the resolver already produced one canonical spelling per file.

use tracing::debug;

use crate::host::Host;
use crate::value::Value;
use crate::{LOADED_FEATURES_GLOBAL, LOADING_FEATURES_GLOBAL};

/// The `$"` list, replacing a missing or non-list value with a fresh list
/// when `create` is set.
pub fn loaded_features<H: Host + ?Sized>(host: &mut H, create: bool) -> Option<&mut Vec<Value>> {
	let is_list = host.global(LOADED_FEATURES_GLOBAL).and_then(Value::as_array).is_some();
	if !is_list {
		if !create {
			return None;
		}
		host.set_global(LOADED_FEATURES_GLOBAL, Value::Array(Vec::new()));
	}
	host.global_mut(LOADED_FEATURES_GLOBAL).and_then(Value::as_array_mut)
}

/// Whether `path` has finished loading or is being loaded right now.
///
/// A missing `$"_` means nothing is in progress.
pub fn already_loaded<H: Host + ?Sized>(host: &mut H, path: &str) -> bool {
	let contains = |items: &[Value]| items.iter().any(|item| item.as_str() == Some(path));

	if loaded_features(host, true).is_some_and(|items| contains(items.as_slice())) {
		debug!(path, "already loaded");
		return true;
	}
	if host.global(LOADING_FEATURES_GLOBAL).and_then(Value::as_array).is_some_and(contains) {
		debug!(path, "load already in progress");
		return true;
	}
	false
}

/// Records `path` as loaded. Adding a path twice keeps a single entry.
pub fn mark_loaded<H: Host + ?Sized>(host: &mut H, path: &str) {
	if let Some(items) = loaded_features(host, true)
		&& !items.iter().any(|item| item.as_str() == Some(path))
	{
		items.push(Value::from(path));
	}
}

/// String entries of `$"`, without creating the list.
pub fn loaded_paths<H: Host + ?Sized>(host: &mut H) -> Vec<String> {
	loaded_features(host, false)
		.map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default()
}
