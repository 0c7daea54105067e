//! The host interpreter as seen from the loader.
//!
//! The loader never parses, executes, or collects garbage itself. It drives
//! an embedding interpreter through [`Host`], which the interpreter context
//! implements. Host state is always reached through `&mut H` so that a script
//! replacing `$:` or `$"` between calls is observed on the next access.

use std::ffi::c_void;
use std::path::Path;

use bitflags::bitflags;
use thiserror::Error;

use crate::config::LoaderState;
use crate::irep::{CodeUnit, Irep};
use crate::value::{ModuleId, Value};

/// An exception object owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({class})")]
pub struct Exception {
	pub class: String,
	pub message: String,
}

impl Exception {
	pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			class: class.into(),
			message: message.into(),
		}
	}
}

/// A saved GC arena position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaIndex(pub usize);

/// Shape of a call frame, used to validate where the loader is installed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
	/// Frame belongs to a native (C) function rather than scripted code.
	pub native: bool,
	/// Number of local variable slots of the frame's code.
	pub locals: usize,
}

bitflags! {
	/// Features of the host interpreter that change how the loader behaves.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct HostCapabilities: u32 {
		/// Native code may be invoked directly from nested frames.
		const REENTRANT_CALLS = 1 << 0;
		/// Precompiled units use the old encoding that ends in a bare `STOP`.
		const LEGACY_BYTECODE = 1 << 1;
	}
}

/// Options handed to the host parser.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
	/// File name recorded in the parsed unit for backtraces.
	pub filename: &'a Path,
	/// Record parse errors as a pending exception instead of printing them.
	pub capture_errors: bool,
	/// Produce a code unit without running it.
	pub no_exec: bool,
}

impl<'a> ParseOptions<'a> {
	/// Parse-only with error capture, as every loader parse is done.
	pub fn parse_only(filename: &'a Path) -> Self {
		Self {
			filename,
			capture_errors: true,
			no_exec: true,
		}
	}
}

/// Interface of the embedding interpreter.
pub trait Host {
	/// Loader bookkeeping owned by the interpreter context.
	fn loader_state(&mut self) -> &mut LoaderState;

	fn capabilities(&self) -> HostCapabilities;

	/// Reads a global variable. `None` means it was never assigned.
	fn global(&self, name: &str) -> Option<&Value>;

	fn global_mut(&mut self, name: &str) -> Option<&mut Value>;

	fn set_global(&mut self, name: &str, value: Value);

	/// Parses source text. `None` means the parser produced nothing; a parse
	/// failure is reported through [`Host::take_exception`].
	fn parse(&mut self, source: &[u8], options: &ParseOptions<'_>) -> Option<Irep>;

	/// Deserializes a precompiled unit. Failures leave a pending exception or
	/// none at all.
	fn read_irep(&mut self, bytes: &[u8]) -> Option<Irep>;

	/// Takes the pending exception, if any.
	fn take_exception(&mut self) -> Option<Exception>;

	fn arena_save(&mut self) -> ArenaIndex;

	fn arena_restore(&mut self, index: ArenaIndex);

	/// Keeps `unit` alive across a subsequent arena restore.
	fn gc_protect(&mut self, _unit: &CodeUnit) {}

	/// Interpreter state pointer passed to native entry points.
	fn state_handle(&mut self) -> *mut c_void;

	/// Resets the current frame's method identifier.
	fn clear_frame_method(&mut self);

	/// Offset of the current call frame from the frame base.
	fn call_depth(&self) -> usize;

	fn set_call_depth(&mut self, depth: usize);

	/// Runs `body` inside a fresh re-enterable frame bound to the top-level
	/// class. Used only when [`HostCapabilities::REENTRANT_CALLS`] is absent.
	fn yield_wrapped(&mut self, body: &mut dyn FnMut(&mut Self));

	/// The frame that called into the loader, if any.
	fn caller_frame(&self) -> Option<FrameInfo>;

	/// Binds the native loader entry into the caller frame.
	fn bind_loader_entry(&mut self);

	/// Runs a loaded code unit with `self` as the receiver.
	fn execute(&mut self, unit: &CodeUnit) -> Result<Value, Exception>;

	/// Creates a fresh anonymous module for wrapped loads.
	fn new_module(&mut self) -> ModuleId;
}

/// Runs `f` between an arena save and restore.
///
/// The restore happens on every return from `f`, including `Err` results,
/// so objects from a failed step never outlive it.
pub fn with_arena<H, T>(host: &mut H, f: impl FnOnce(&mut H) -> T) -> T
where
	H: Host + ?Sized,
{
	let index = host.arena_save();
	let out = f(host);
	host.arena_restore(index);
	out
}
