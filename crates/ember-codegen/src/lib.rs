//! Code generation backend.
//!
//! Turns a validated configuration into C++ source and a PlatformIO project
//! description. The pieces:
//!
//! - [`expr`]: the expression and statement model the generated code is
//!   built from.
//! - [`registry`]: resolved ids mapped to their C++ handles.
//! - [`scheduler`]: cooperative task queue that lets components await each
//!   other's variables.
//! - [`context`]: the per-build accumulator every task writes into.
//! - [`writer`]: serialization of the finished context to build files.

pub mod context;
pub mod error;
pub mod expr;
pub mod registry;
pub mod scheduler;
pub mod writer;

pub use context::{CoreContext, Define, Library, PioOption};
pub use error::{Error, Result};
pub use expr::{cpp_string_escape, Expression, Statement};
pub use registry::{is_reserved, Handle, VariableRegistry};
pub use scheduler::{get_variable, get_variable_with_full_id, Resume, Scheduler, StalledTask};
pub use writer::Artifacts;
