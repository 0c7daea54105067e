//! In-memory host used by the unit tests.
//!
//! Source files use a line language: `require NAME`, `load NAME`,
//! `raise MESSAGE`, `set KEY`. A first line of `syntax error` leaves a
//! pending `SyntaxError`; a source of exactly `#undef` makes the parser return
//! nothing. Precompiled files are `MRB0` followed by one byte per
//! instruction (`0` STOP, `1` LOADNIL, `2` RETURN, anything else an opaque
//! op); `EXC` as the first bytes leaves a pending exception.

use std::collections::HashMap;
use std::ffi::c_void;

use crate::config::{LoaderConfig, LoaderState};
use crate::host::{ArenaIndex, Exception, FrameInfo, Host, HostCapabilities, ParseOptions};
use crate::irep::{CodeUnit, Instruction, Irep, Iseq, ReturnKind};
use crate::value::{ModuleId, Scope, Value};

/// Memory handed to native entry points as the interpreter state.
///
/// `counter` is the first field so C fixtures can bump it through a
/// `long long *`.
#[repr(C)]
#[derive(Debug, Default)]
pub(crate) struct NativeProbe {
	pub counter: i64,
	pub raised: Option<Exception>,
	pub seen_in_wrapped_frame: bool,
	pub seen_arena_depth: usize,
}

#[derive(Debug)]
pub(crate) struct MockHost {
	pub state: LoaderState,
	pub capabilities: HostCapabilities,
	pub globals: HashMap<String, Value>,
	pub pending: Option<Exception>,
	pub arena: usize,
	pub arena_saves: usize,
	pub arena_restores: usize,
	pub sources: HashMap<String, String>,
	pub executed: Vec<(String, Scope)>,
	pub keys: Vec<String>,
	pub call_depth: usize,
	pub in_wrapped_frame: bool,
	pub wrapped_calls: usize,
	pub frame_method_clears: usize,
	pub caller: Option<FrameInfo>,
	pub loader_bound: bool,
	pub next_module: u32,
	pub protected: usize,
	pub probe: NativeProbe,
}

impl MockHost {
	pub fn new() -> Self {
		Self::with_config(LoaderConfig {
			default_gems_root: None,
			..LoaderConfig::default()
		})
	}

	pub fn with_config(config: LoaderConfig) -> Self {
		Self {
			state: LoaderState::new(config),
			capabilities: HostCapabilities::REENTRANT_CALLS,
			globals: HashMap::new(),
			pending: None,
			arena: 0,
			arena_saves: 0,
			arena_restores: 0,
			sources: HashMap::new(),
			executed: Vec::new(),
			keys: Vec::new(),
			call_depth: 0,
			in_wrapped_frame: false,
			wrapped_calls: 0,
			frame_method_clears: 0,
			caller: Some(FrameInfo { native: false, locals: 4 }),
			loader_bound: false,
			next_module: 1,
			protected: 0,
			probe: NativeProbe::default(),
		}
	}

	/// Host with `$:` set to `dirs` and an empty `$"`.
	pub fn with_load_path(dirs: &[&str]) -> Self {
		let mut host = Self::new();
		host.set_global(crate::LOAD_PATH_GLOBAL, Value::from(dirs.to_vec()));
		host.set_global(crate::LOADED_FEATURES_GLOBAL, Value::Array(Vec::new()));
		host
	}

	pub fn loaded_features(&self) -> Vec<String> {
		self.globals
			.get(crate::LOADED_FEATURES_GLOBAL)
			.and_then(Value::as_array)
			.map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
			.unwrap_or_default()
	}

	pub fn executed_files(&self) -> Vec<String> {
		self.executed.iter().map(|(file, _)| file.clone()).collect()
	}

	fn run_line(&mut self, line: &str) -> Result<(), Exception> {
		let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
		match command {
			"require" => {
				crate::kernel::require(self, &Value::from(arg)).map_err(crate::Error::into_exception)?;
			}
			"load" => {
				crate::kernel::load(self, &Value::from(arg), &Value::Nil).map_err(crate::Error::into_exception)?;
			}
			"raise" => return Err(Exception::new("RuntimeError", arg)),
			"set" => self.keys.push(arg.to_string()),
			_ => {}
		}
		Ok(())
	}
}

fn returning_nil() -> Vec<Instruction> {
	vec![
		Instruction::LoadNil { dst: 0 },
		Instruction::Return {
			src: 0,
			kind: ReturnKind::Normal,
		},
	]
}

impl Host for MockHost {
	fn loader_state(&mut self) -> &mut LoaderState {
		&mut self.state
	}

	fn capabilities(&self) -> HostCapabilities {
		self.capabilities
	}

	fn global(&self, name: &str) -> Option<&Value> {
		self.globals.get(name)
	}

	fn global_mut(&mut self, name: &str) -> Option<&mut Value> {
		self.globals.get_mut(name)
	}

	fn set_global(&mut self, name: &str, value: Value) {
		self.globals.insert(name.to_string(), value);
	}

	fn parse(&mut self, source: &[u8], options: &ParseOptions<'_>) -> Option<Irep> {
		assert!(options.capture_errors && options.no_exec);
		self.arena += 1;
		let Ok(text) = std::str::from_utf8(source) else {
			self.pending = Some(Exception::new("SyntaxError", "invalid byte sequence"));
			return None;
		};
		if text == "#undef" {
			return None;
		}
		if text.lines().next() == Some("syntax error") {
			self.pending = Some(Exception::new("SyntaxError", "syntax error, unexpected end of input"));
			return None;
		}
		let filename = options.filename.to_string_lossy().into_owned();
		self.sources.insert(filename.clone(), text.to_string());
		let mut irep = Irep::new(Iseq::Owned(returning_nil()));
		irep.filename = Some(filename);
		Some(irep)
	}

	fn read_irep(&mut self, bytes: &[u8]) -> Option<Irep> {
		self.arena += 1;
		if bytes.starts_with(b"EXC") {
			self.pending = Some(Exception::new("ScriptError", "irep load error"));
			return None;
		}
		let body = bytes.strip_prefix(b"MRB0")?;
		let code = body
			.iter()
			.map(|byte| match byte {
				0 => Instruction::Stop,
				1 => Instruction::LoadNil { dst: 0 },
				2 => Instruction::Return {
					src: 0,
					kind: ReturnKind::Normal,
				},
				other => Instruction::Op(u32::from(*other)),
			})
			.collect();
		Some(Irep::new(Iseq::Owned(code)))
	}

	fn take_exception(&mut self) -> Option<Exception> {
		self.pending.take().or_else(|| self.probe.raised.take())
	}

	fn arena_save(&mut self) -> ArenaIndex {
		self.arena_saves += 1;
		ArenaIndex(self.arena)
	}

	fn arena_restore(&mut self, index: ArenaIndex) {
		self.arena_restores += 1;
		self.arena = index.0;
	}

	fn gc_protect(&mut self, _unit: &CodeUnit) {
		self.protected += 1;
	}

	fn state_handle(&mut self) -> *mut c_void {
		self.probe.seen_in_wrapped_frame = self.in_wrapped_frame;
		self.probe.seen_arena_depth = self.arena_saves - self.arena_restores;
		std::ptr::from_mut(&mut self.probe).cast()
	}

	fn clear_frame_method(&mut self) {
		self.frame_method_clears += 1;
	}

	fn call_depth(&self) -> usize {
		self.call_depth
	}

	fn set_call_depth(&mut self, depth: usize) {
		self.call_depth = depth;
	}

	fn yield_wrapped(&mut self, body: &mut dyn FnMut(&mut Self)) {
		self.wrapped_calls += 1;
		self.call_depth += 2;
		self.in_wrapped_frame = true;
		body(self);
		self.in_wrapped_frame = false;
	}

	fn caller_frame(&self) -> Option<FrameInfo> {
		self.caller
	}

	fn bind_loader_entry(&mut self) {
		self.loader_bound = true;
	}

	fn execute(&mut self, unit: &CodeUnit) -> Result<Value, Exception> {
		let file = unit.irep().filename.clone().unwrap_or_else(|| "<precompiled>".to_string());
		self.executed.push((file.clone(), unit.target()));
		let source = self.sources.get(&file).cloned().unwrap_or_default();
		for line in source.lines() {
			self.run_line(line.trim())?;
		}
		Ok(Value::Nil)
	}

	fn new_module(&mut self) -> ModuleId {
		let id = ModuleId::from_raw(self.next_module);
		self.next_module += 1;
		id
	}
}

pub(crate) fn fixture_dir() -> tempfile::TempDir {
	tempfile::tempdir().expect("temp dir should be creatable")
}

/// Canonical string form of `path`, as the resolver reports it.
pub(crate) fn canonical(path: &std::path::Path) -> String {
	std::fs::canonicalize(path)
		.expect("fixture path should canonicalize")
		.to_string_lossy()
		.into_owned()
}
