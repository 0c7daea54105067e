//! Error types for module loading.

use thiserror::Error;

use crate::host::Exception;

/// Errors raised by the loader into the host.
#[derive(Debug, Error)]
pub enum Error {
	/// Resolution failed, or a native library lacks its entry point.
	#[error("{message} -- {path}")]
	Load {
		/// Human readable reason, usually [`crate::CANNOT_LOAD`].
		message: String,
		/// The logical name or path that could not be loaded.
		path: String,
	},

	/// An exception captured by the parser, deserializer, or a native
	/// initializer. Re-raised without wrapping.
	#[error(transparent)]
	Raised(#[from] Exception),

	#[error("{0}")]
	Runtime(String),

	/// A non-string value was passed where a file name was expected.
	#[error("can't convert {0} into String")]
	Type(String),
}

impl Error {
	pub(crate) fn load(message: &str, path: impl Into<String>) -> Self {
		Self::Load {
			message: message.to_string(),
			path: path.into(),
		}
	}

	pub(crate) fn cannot_load(path: impl Into<String>) -> Self {
		Self::load(crate::CANNOT_LOAD, path)
	}

	/// The offending name or path of a `LoadError`.
	pub fn path(&self) -> Option<&str> {
		match self {
			Self::Load { path, .. } => Some(path),
			_ => None,
		}
	}

	/// Host class name this error is raised as.
	pub fn class_name(&self) -> &str {
		match self {
			Self::Load { .. } => "LoadError",
			Self::Raised(exc) => &exc.class,
			Self::Runtime(_) => "RuntimeError",
			Self::Type(_) => "TypeError",
		}
	}

	/// Converts into the exception the host should raise.
	pub fn into_exception(self) -> Exception {
		match self {
			Self::Raised(exc) => exc,
			other => Exception::new(other.class_name(), other.to_string()),
		}
	}
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, Error>;
