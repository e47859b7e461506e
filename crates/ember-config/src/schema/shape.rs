//! Structural self-descriptions of validators.
//!
//! Every [`Validator`](super::Validator) carries a [`Shape`] describing what
//! it accepts. External tooling walks shapes to produce machine-readable
//! schemas without executing any component code.

use serde::{Deserialize, Serialize};

/// Structural description of a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    String,
    StringStrict,
    Boolean,
    Integer,
    Float,
    PositiveInt,
    HexInt,
    TimePeriod,
    Ipv4,
    Mac,
    Lambda,
    OneOf {
        choices: Vec<String>,
        ignore_case: bool,
    },
    Enum {
        choices: Vec<String>,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    List(Box<Shape>),
    Templatable(Box<Shape>),
    UseId {
        type_tag: String,
    },
    DeclareId {
        type_tag: String,
    },
    All(Vec<Shape>),
    Any(Vec<Shape>),
    Map {
        keys: Vec<KeyShape>,
        allow_extra: bool,
    },
    TypedDispatch {
        key: String,
        variants: Vec<(String, Shape)>,
    },
    /// A validator with no structural description (custom closures).
    Opaque(String),
}

/// How a schema key participates in a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyRequirement {
    Required,
    Optional { has_default: bool },
    GeneratedId { type_tag: String },
    Inclusive { group: String },
    Exclusive { group: String },
    Conditional { requires: String },
}

/// Description of one key in a mapping schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyShape {
    pub name: String,
    pub requirement: KeyRequirement,
    pub value: Shape,
}
