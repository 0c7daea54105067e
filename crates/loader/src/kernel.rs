//! `require`, `load`, and the loader lifecycle.
//!
//! [`load_library`] is the native entry point scripts reach through the
//! loader object bound by [`install_loader`]. [`require`] and [`load`] are
//! the `Kernel` methods built on top of it.

use tracing::debug;

use crate::artifact::{Artifact, load_file};
use crate::config::{EnvLookup, REQUIRE_LIST_SEPARATOR, split_env_list};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::load_path::initial_load_path;
use crate::native::unload_native;
use crate::registry::{already_loaded, loaded_paths, mark_loaded};
use crate::resolve::{NATIVE_EXTENSIONS, extension, find_file};
use crate::value::{Scope, Value};
use crate::{LOAD_PATH_GLOBAL, LOADED_FEATURES_GLOBAL};

/// Minimum local slots of the frame the loader entry is bound into.
const MIN_CALLER_LOCALS: usize = 4;

/// Result of [`load_library`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
	/// `require` of a path that is already loaded. Scripts see `false`.
	AlreadyLoaded,
	Loaded {
		artifact: Artifact,
		/// Canonical path the name resolved to.
		path: String,
	},
}

/// Sets up the loader globals: `$:` from the environment and an empty `$"`.
pub fn init<H: Host>(host: &mut H, env: &impl EnvLookup) {
	let capabilities = host.capabilities();
	let state = host.loader_state();
	state.select_invocation(capabilities);
	let load_path = initial_load_path(&state.config, env);

	host.set_global(LOAD_PATH_GLOBAL, Value::from(load_path));
	host.set_global(LOADED_FEATURES_GLOBAL, Value::Array(Vec::new()));
}

/// Binds the loader entry into the calling scripted frame.
pub fn install_loader<H: Host>(host: &mut H) -> Result<()> {
	match host.caller_frame() {
		Some(frame) if !frame.native && frame.locals >= MIN_CALLER_LOCALS => {
			host.bind_loader_entry();
			Ok(())
		}
		_ => Err(Error::Runtime("wrong caller".to_string())),
	}
}

/// Installs the loader, then requires every module named in the
/// auto-require variable, in order.
pub fn initialize_epilogue<H: Host>(host: &mut H, env: &impl EnvLookup) -> Result<()> {
	let arena = host.arena_save();
	let result = install_and_autoload(host, env, arena);
	host.arena_restore(arena);
	result
}

fn install_and_autoload<H: Host>(host: &mut H, env: &impl EnvLookup, arena: crate::ArenaIndex) -> Result<()> {
	install_loader(host)?;

	let var = host.loader_state().config.auto_require_var.clone();
	let Some(list) = env.var(&var) else {
		return Ok(());
	};
	for name in split_env_list(&list, REQUIRE_LIST_SEPARATOR) {
		debug!(name = %name, "auto-require");
		let result = require(host, &Value::from(name));
		host.arena_restore(arena);
		result?;
	}
	Ok(())
}

/// Resolves and loads `filename`.
///
/// With `for_require`, names without an extension try each loadable
/// extension and an already loaded path yields [`LoadOutcome::AlreadyLoaded`].
/// A `wrap` module becomes the target scope of code units; anything else
/// binds them to the top level.
pub fn load_library<H: Host>(host: &mut H, filename: &Value, for_require: bool, wrap: &Value) -> Result<LoadOutcome> {
	let Some(name) = filename.as_str() else {
		return Err(Error::Type(filename.inspect()));
	};

	let path = find_file(host, name, for_require)?;
	if for_require && already_loaded(host, &path) {
		return Ok(LoadOutcome::AlreadyLoaded);
	}

	let target = match wrap {
		Value::Module(id) => Scope::Module(*id),
		_ => Scope::TopLevel,
	};
	let artifact = load_file(host, &path, target)?;
	Ok(LoadOutcome::Loaded { artifact, path })
}

/// `Kernel#require`. Returns whether the module was loaded by this call.
///
/// Top-level code of a path already running further up the stack is not
/// entered again. A path is only recorded in `$"` once its code finished
/// without raising.
pub fn require<H: Host>(host: &mut H, name: &Value) -> Result<bool> {
	let (artifact, path) = match load_library(host, name, true, &Value::Nil)? {
		LoadOutcome::AlreadyLoaded => return Ok(false),
		LoadOutcome::Loaded { artifact, path } => (artifact, path),
	};

	match artifact {
		Artifact::Code(unit) => {
			if host.loader_state().loading.contains(&path) {
				debug!(path = %path, "require cycle, skipping");
				return Ok(false);
			}
			host.loader_state().loading.push(path.clone());
			let result = host.execute(&unit);
			host.loader_state().loading.pop();

			result?;
			mark_loaded(host, &path);
			Ok(true)
		}
		Artifact::Native => {
			mark_loaded(host, &path);
			Ok(true)
		}
		Artifact::Empty => Ok(false),
	}
}

/// `Kernel#load`. Always reloads and never touches `$"`.
///
/// `wrap` of `nil` or `false` runs the file at top level, a module runs it
/// inside that module, and any other value inside a fresh anonymous module.
pub fn load<H: Host>(host: &mut H, name: &Value, wrap: &Value) -> Result<bool> {
	let wrap = match wrap {
		Value::Nil | Value::Bool(false) => Value::Nil,
		Value::Module(_) => wrap.clone(),
		_ => Value::Module(host.new_module()),
	};

	if let LoadOutcome::Loaded {
		artifact: Artifact::Code(unit),
		..
	} = load_library(host, name, false, &wrap)?
	{
		host.execute(&unit)?;
	}
	Ok(true)
}

/// Runs the finalizer of every native library recorded in `$"`.
pub fn finalize<H: Host>(host: &mut H) {
	let natives: Vec<String> = loaded_paths(host)
		.into_iter()
		.filter(|path| extension(path).is_some_and(|ext| NATIVE_EXTENSIONS.contains(&ext)))
		.collect();
	for path in natives {
		unload_native(host, &path);
	}
}
