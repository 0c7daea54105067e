//! Native extension libraries.
//!
//! A loadable extension exports two C entry points derived from its file
//! name: `GENERATED_TMP_mrb_<name>_gem_init` and
//! `GENERATED_TMP_mrb_<name>_gem_final`, both `void (*)(mrb_state *)`.
//!
//! The library handle is closed right after the initializer returns and
//! reopened by path at shutdown to run the finalizer. On Unix the library is
//! opened with `RTLD_NODELETE` so closing the handle never unmaps code the
//! initializer registered with the interpreter.

use std::ffi::c_void;

use libloading::Library;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::host::{Host, with_arena};
use crate::resolve::basename;

/// Signature of both native entry points.
pub type EntryFn = unsafe extern "C" fn(state: *mut c_void);

/// Prefix shared by all generated entry point names.
pub const ENTRY_PREFIX: &str = "GENERATED_TMP_mrb_";

/// Which entry point of an extension to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHook {
	Init,
	Final,
}

impl EntryHook {
	const fn suffix(self) -> &'static str {
		match self {
			Self::Init => "gem_init",
			Self::Final => "gem_final",
		}
	}
}

/// How the initializer is called, chosen once from the host capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitInvocation {
	/// Call the initializer from the current frame.
	#[default]
	Direct,
	/// Hosts without reentrant calls cannot unwind through native code run
	/// from a nested frame. Unless already at the frame base, the initializer
	/// runs inside a wrapped frame and the call depth is restored afterwards.
	WrappedFrame,
}

/// Derives the entry point symbol for the library at `path`.
///
/// The directory and the last extension are stripped and every `-` becomes
/// `_`: `/app/my-ext.so` gives `GENERATED_TMP_mrb_my_ext_gem_init`.
pub fn entry_symbol(path: &str, hook: EntryHook) -> String {
	let base = basename(path);
	let stem = base.rfind('.').map_or(base, |idx| &base[..idx]);
	format!("{ENTRY_PREFIX}{}_{}", stem.replace('-', "_"), hook.suffix())
}

/// Opens the library at `path`, runs its initializer, and closes the handle.
///
/// Fails with a `RuntimeError` carrying the loader diagnostic if the library
/// cannot be opened, and with a `LoadError` if it lacks the init symbol.
pub fn load_native<H: Host>(host: &mut H, path: &str) -> Result<()> {
	let library = open_library(path).map_err(|error| Error::Runtime(error.to_string()))?;
	let symbol = entry_symbol(path, EntryHook::Init);

	let init = match lookup(&library, &symbol) {
		Some(init) => init,
		None => {
			debug!(path, symbol = %symbol, "library has no init entry point");
			return Err(Error::cannot_load(path));
		}
	};

	info!(path, symbol = %symbol, "initializing native library");
	let result = invoke_initializer(host, init);
	close_after_init(library);
	result
}

/// Reopens the library at `path` and runs its finalizer, if it has one.
///
/// Never fails: a library that cannot be reopened counts as unloaded.
pub fn unload_native<H: Host + ?Sized>(host: &mut H, path: &str) {
	let library = match open_library(path) {
		Ok(library) => library,
		Err(error) => {
			debug!(path, %error, "skipping unload, library cannot be reopened");
			return;
		}
	};
	let symbol = entry_symbol(path, EntryHook::Final);
	match lookup(&library, &symbol) {
		Some(fini) => {
			debug!(path, symbol = %symbol, "finalizing native library");
			call_entry(host, fini);
		}
		None => debug!(path, symbol = %symbol, "library has no final entry point"),
	}
}

/// Runs `init` with the current frame's method cleared and the GC arena
/// saved around it, then re-raises anything the initializer left pending.
pub(crate) fn invoke_initializer<H: Host>(host: &mut H, init: EntryFn) -> Result<()> {
	host.clear_frame_method();
	with_arena(host, |host| activate(host, init));
	match host.take_exception() {
		Some(exc) => Err(Error::Raised(exc)),
		None => Ok(()),
	}
}

fn activate<H: Host>(host: &mut H, init: EntryFn) {
	let invocation = host.loader_state().invocation;
	match invocation {
		InitInvocation::WrappedFrame if host.call_depth() != 0 => {
			let depth = host.call_depth();
			host.yield_wrapped(&mut |host| call_entry(host, init));
			host.set_call_depth(depth);
		}
		InitInvocation::Direct | InitInvocation::WrappedFrame => call_entry(host, init),
	}
}

fn call_entry<H: Host + ?Sized>(host: &mut H, entry: EntryFn) {
	let state = host.state_handle();
	// SAFETY: `entry` was resolved from an extension library whose contract is
	// `void (*)(mrb_state *)`, and `state` is the live interpreter handle.
	unsafe { entry(state) }
}

fn lookup(library: &Library, symbol: &str) -> Option<EntryFn> {
	// SAFETY: the symbol is only ever called through the `EntryFn` signature
	// that the extension contract prescribes.
	unsafe { library.get::<EntryFn>(symbol.as_bytes()) }.ok().map(|entry| *entry)
}

#[cfg(unix)]
fn open_library(path: &str) -> std::result::Result<Library, libloading::Error> {
	use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};

	// SAFETY: loading a native extension runs its constructors; extensions
	// are trusted code by contract. `RTLD_GLOBAL` lets extensions see each
	// other's symbols.
	let library = unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL | libc::RTLD_NODELETE) }?;
	Ok(Library::from(library))
}

#[cfg(not(unix))]
fn open_library(path: &str) -> std::result::Result<Library, libloading::Error> {
	// SAFETY: see the unix variant.
	unsafe { Library::new(path) }
}

#[cfg(unix)]
fn close_after_init(library: Library) {
	drop(library);
}

/// Without `RTLD_NODELETE` closing would unmap the initializer's code, so
/// the load-time handle is released to the process instead.
#[cfg(not(unix))]
fn close_after_init(library: Library) {
	std::mem::forget(library);
}
