//! Build pipeline.
//!
//! Ties the schema engine and the code generator together: components own
//! stanzas, the driver expands and validates the document, resolves ids,
//! schedules every component's generation task, and serializes the result.

pub mod component;
pub mod components;
pub mod driver;
pub mod error;
pub mod expand;
pub mod validate;

pub use component::{Component, ComponentRegistry};
pub use driver::{run, run_and_write, Build, ROOT_DOMAIN};
pub use error::{Error, Result};
