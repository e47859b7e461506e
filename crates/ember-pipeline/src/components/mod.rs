//! Built-in components.

pub mod core;
pub mod logger;
pub mod wifi;
