//! Document value model and schema validation engine.
//!
//! This crate owns the leaf layers of the configuration-to-code pipeline:
//! the typed value model a document is made of ([`value`], [`time`], [`net`],
//! [`lambda`], [`ident`]) and the declarative validator combinators that turn
//! raw documents into typed ones ([`schema`]).

pub mod error;
pub mod ident;
pub mod lambda;
pub mod net;
pub mod schema;
pub mod time;
pub mod value;

pub use error::{Invalid, ValidationErrors};
pub use ident::Ident;
pub use lambda::{Lambda, LambdaSegment};
pub use net::{HexInt, Ipv4, MacAddr};
pub use time::{TimePeriod, TimeUnit};
pub use value::{ConfigValue, DocRange, PathKey, ValueKind};
