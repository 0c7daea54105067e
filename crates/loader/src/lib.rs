//! Module loading core for an embeddable script interpreter.
//!
//! Resolves a logical module name to a canonical file on disk, loads the
//! file's source, precompiled, or native-library form into the running
//! interpreter, and keeps `require`-style loads to once per process.
//!
//! # Architecture
//!
//! - [`resolve`]: turns a logical name plus the load path into a canonical file
//! - [`registry`]: the loaded-features list (`$"`) and in-progress set (`$"_`)
//! - [`artifact`]: dispatches a resolved file to the source, precompiled, or
//!   native strategy
//! - [`native`]: opens shared libraries and runs their init/final entry points
//! - [`load_path`]: builds the initial load path (`$:`) from the environment
//! - [`kernel`]: the `require`/`load` entry points and the init/final lifecycle
//!
//! The interpreter itself (parser, VM, GC, object model) is reached through
//! the [`Host`] trait. Every operation takes `&mut H` and re-fetches host
//! state through it, because host scripts may replace `$:` or `$"` at any
//! time.

pub mod artifact;
pub mod config;
mod error;
pub mod host;
pub mod irep;
pub mod kernel;
pub mod load_path;
pub mod native;
pub mod registry;
pub mod resolve;
mod value;

#[cfg(test)]
mod testing;

pub use artifact::{Artifact, load_file};
pub use config::{EnvLookup, LoaderConfig, LoaderState, ProcessEnv};
pub use error::{Error, Result};
pub use host::{ArenaIndex, Exception, FrameInfo, Host, HostCapabilities, ParseOptions, with_arena};
pub use irep::{CodeUnit, Instruction, Irep, Iseq, ReturnKind, UnitFlags};
pub use kernel::{LoadOutcome, finalize, init, initialize_epilogue, install_loader, load, load_library, require};
pub use load_path::initial_load_path;
pub use native::{EntryHook, entry_symbol, load_native, unload_native};
pub use registry::{already_loaded, mark_loaded};
pub use resolve::{find_file, resolve_in};
pub use value::{ModuleId, Scope, Value};

/// Global holding the load path list.
pub const LOAD_PATH_GLOBAL: &str = "$:";

/// Global holding the loaded-features list.
pub const LOADED_FEATURES_GLOBAL: &str = "$\"";

/// Global holding the paths currently being loaded. Populated by the host.
pub const LOADING_FEATURES_GLOBAL: &str = "$\"_";

/// Message carried by every resolution and missing-entry-point failure.
pub const CANNOT_LOAD: &str = "cannot load such file";
