//! Host-visible values used at the loader boundary.

use std::fmt;

/// Opaque handle of a host module or class.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
	pub const fn from_raw(raw: u32) -> Self {
		Self(raw)
	}

	pub const fn raw(self) -> u32 {
		self.0
	}
}

impl fmt::Debug for ModuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ModuleId({})", self.0)
	}
}

/// Scope a loaded code unit is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
	/// The interpreter's object class.
	#[default]
	TopLevel,
	/// A wrapping module passed to `load`.
	Module(ModuleId),
}

/// A dynamically typed host value.
///
/// Only the shapes the loader inspects are modelled; everything else is an
/// [`Value::Object`] carrying its class name for error messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
	#[default]
	Nil,
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
	Symbol(String),
	Array(Vec<Value>),
	Module(ModuleId),
	Class(ModuleId),
	Object { class: String },
}

impl Value {
	pub fn is_nil(&self) -> bool {
		matches!(self, Self::Nil)
	}

	/// Host truthiness: everything except `nil` and `false`.
	pub fn is_truthy(&self) -> bool {
		!matches!(self, Self::Nil | Self::Bool(false))
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	/// Renders the value the way the host's `inspect` would.
	pub fn inspect(&self) -> String {
		match self {
			Self::Nil => "nil".to_string(),
			Self::Bool(b) => b.to_string(),
			Self::Integer(i) => i.to_string(),
			Self::Float(f) => {
				if f.fract() == 0.0 && f.is_finite() {
					format!("{f:.1}")
				} else {
					f.to_string()
				}
			}
			Self::String(s) => format!("{s:?}"),
			Self::Symbol(s) => format!(":{s}"),
			Self::Array(items) => {
				let inner: Vec<String> = items.iter().map(Value::inspect).collect();
				format!("[{}]", inner.join(", "))
			}
			Self::Module(id) => format!("#<Module:{:#x}>", id.raw()),
			Self::Class(id) => format!("#<Class:{:#x}>", id.raw()),
			Self::Object { class } => format!("#<{class}>"),
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Self::Array(items.into_iter().map(Into::into).collect())
	}
}
