//! Code units produced by the source and precompiled strategies.

use bitflags::bitflags;

use crate::value::Scope;

/// How a `RETURN` leaves its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
	Normal,
	Break,
}

/// One VM instruction. The loader only inspects the terminator; every other
/// opcode is carried as [`Instruction::Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
	Stop,
	LoadNil { dst: u8 },
	Return { src: u8, kind: ReturnKind },
	Op(u32),
}

/// Instruction storage tagged with who owns the memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iseq {
	Owned(Vec<Instruction>),
	/// Memory the unit does not own, such as bytecode embedded in the binary.
	/// Must be copied before any modification.
	Borrowed(&'static [Instruction]),
}

impl Iseq {
	pub fn as_slice(&self) -> &[Instruction] {
		match self {
			Self::Owned(code) => code,
			Self::Borrowed(code) => code,
		}
	}

	pub fn len(&self) -> usize {
		self.as_slice().len()
	}

	pub fn is_empty(&self) -> bool {
		self.as_slice().is_empty()
	}

	pub fn is_borrowed(&self) -> bool {
		matches!(self, Self::Borrowed(_))
	}

	/// Converts into owned storage with room for `additional` more
	/// instructions. Borrowed memory is copied, owned memory is grown.
	fn into_owned(self, additional: usize) -> Vec<Instruction> {
		match self {
			Self::Owned(mut code) => {
				code.reserve(additional);
				code
			}
			Self::Borrowed(code) => {
				let mut owned = Vec::with_capacity(code.len() + additional);
				owned.extend_from_slice(code);
				owned
			}
		}
	}
}

/// A compiled unit of code as handed out by the host parser or deserializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Irep {
	pub nlocals: u16,
	pub nregs: u16,
	pub filename: Option<String>,
	pub iseq: Iseq,
}

impl Irep {
	pub fn new(iseq: Iseq) -> Self {
		Self {
			nlocals: 1,
			nregs: 1,
			filename: None,
			iseq,
		}
	}

	pub fn code(&self) -> &[Instruction] {
		self.iseq.as_slice()
	}

	/// Rewrites a trailing `STOP` into `LOADNIL R0; RETURN R0`.
	///
	/// Old-encoding units end in a bare `STOP`, which discards the unit's
	/// value. After the rewrite the unit returns `nil` like a new-encoding
	/// unit. The final instruction is then a `RETURN`, so calling this again
	/// is a no-op. Returns whether the buffer changed.
	pub fn normalize_legacy_stop(&mut self) -> bool {
		if self.code().last() != Some(&Instruction::Stop) {
			return false;
		}
		let iseq = std::mem::replace(&mut self.iseq, Iseq::Borrowed(&[]));
		let mut code = iseq.into_owned(1);
		if let Some(last) = code.last_mut() {
			*last = Instruction::LoadNil { dst: 0 };
		}
		code.push(Instruction::Return {
			src: 0,
			kind: ReturnKind::Normal,
		});
		self.iseq = Iseq::Owned(code);
		true
	}
}

bitflags! {
	/// Flags on a loaded code unit.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct UnitFlags: u8 {
		/// Runs with its own top-level scope, like a script file.
		const SCOPE = 1 << 0;
	}
}

/// An invokable code unit bound to its defining scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeUnit {
	irep: Irep,
	target: Scope,
	flags: UnitFlags,
}

impl CodeUnit {
	/// Binds `irep` to `target` as script-scope code.
	pub fn script(irep: Irep, target: Scope) -> Self {
		Self {
			irep,
			target,
			flags: UnitFlags::SCOPE,
		}
	}

	pub fn irep(&self) -> &Irep {
		&self.irep
	}

	pub fn target(&self) -> Scope {
		self.target
	}

	pub fn flags(&self) -> UnitFlags {
		self.flags
	}
}
