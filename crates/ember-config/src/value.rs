//! Recursive document value model.
//!
//! A configuration document is a tree of [`ConfigValue`]s. Before validation
//! the tree holds only the plain YAML-shaped kinds (null, bool, int, float,
//! string, list, map); validators progressively replace raw values with the
//! typed kinds (time period, hex int, addresses, lambda, ident) so that after
//! a successful pass no raw user string remains where a typed value is
//! expected.
//!
//! Every value can carry an optional [`DocRange`] pointing at the place in
//! the source document it came from. Ranges ride along for diagnostics only:
//! value equality ignores them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ident::Ident;
use crate::lambda::Lambda;
use crate::net::{HexInt, Ipv4, MacAddr};
use crate::time::TimePeriod;

/// Source coordinates of a value in the input document.
///
/// Lines and columns are 1-based, matching editor conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    /// Path of the document this value came from.
    pub document: String,
}

impl fmt::Display for DocRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.document, self.start_line, self.start_col)
    }
}

/// One step in a key path from the document root to a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Key(k) => write!(f, "{}", k),
            PathKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// The kind of a document value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(IndexMap<String, ConfigValue>),
    // Typed values produced by validation.
    TimePeriod(TimePeriod),
    HexInt(HexInt),
    Ipv4(Ipv4),
    Mac(MacAddr),
    Lambda(Lambda),
    Id(Ident),
}

/// A document value: a [`ValueKind`] plus an optional source range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue {
    pub kind: ValueKind,
    pub range: Option<DocRange>,
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        // Ranges are diagnostics metadata, not part of the value.
        self.kind == other.kind
    }
}

impl ConfigValue {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind, range: None }
    }

    pub fn with_range(mut self, range: DocRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn bool(b: bool) -> Self {
        Self::new(ValueKind::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Self::new(ValueKind::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Self::new(ValueKind::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ValueKind::String(s.into()))
    }

    pub fn list(items: Vec<ConfigValue>) -> Self {
        Self::new(ValueKind::List(items))
    }

    pub fn map(entries: IndexMap<String, ConfigValue>) -> Self {
        Self::new(ValueKind::Map(entries))
    }

    pub fn empty_map() -> Self {
        Self::new(ValueKind::Map(IndexMap::new()))
    }

    pub fn ident(id: Ident) -> Self {
        Self::new(ValueKind::Id(id))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Int(i) => Some(i),
            ValueKind::HexInt(h) => i64::try_from(h.0).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Float(f) => Some(f),
            ValueKind::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match &self.kind {
            ValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match &self.kind {
            ValueKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, ConfigValue>> {
        match &mut self.kind {
            ValueKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ValueKind::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_time_period(&self) -> Option<&TimePeriod> {
        match &self.kind {
            ValueKind::TimePeriod(tp) => Some(tp),
            _ => None,
        }
    }

    /// Fetch a nested map entry by key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Short lowercase name of this value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Int(_) => "integer",
            ValueKind::Float(_) => "float",
            ValueKind::String(_) => "string",
            ValueKind::List(_) => "list",
            ValueKind::Map(_) => "mapping",
            ValueKind::TimePeriod(_) => "time period",
            ValueKind::HexInt(_) => "hex integer",
            ValueKind::Ipv4(_) => "IPv4 address",
            ValueKind::Mac(_) => "MAC address",
            ValueKind::Lambda(_) => "lambda",
            ValueKind::Id(_) => "id",
        }
    }

    /// Visit every value in the tree, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ConfigValue)) {
        visit(self);
        match &self.kind {
            ValueKind::List(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            ValueKind::Map(map) => {
                for value in map.values() {
                    value.walk(visit);
                }
            }
            _ => {}
        }
    }

    /// Visit every value in the tree mutably, depth first.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut ConfigValue)) {
        visit(self);
        match &mut self.kind {
            ValueKind::List(items) => {
                for item in items {
                    item.walk_mut(visit);
                }
            }
            ValueKind::Map(map) => {
                for value in map.values_mut() {
                    value.walk_mut(visit);
                }
            }
            _ => {}
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::int(i)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_range() {
        let plain = ConfigValue::string("abc");
        let ranged = ConfigValue::string("abc").with_range(DocRange {
            start_line: 3,
            start_col: 1,
            end_line: 3,
            end_col: 4,
            document: "dev.yaml".to_string(),
        });
        assert_eq!(plain, ranged);
    }

    #[test]
    fn test_accessors() {
        let v = ConfigValue::int(42);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_float(), Some(42.0));
        assert_eq!(v.as_str(), None);
        assert_eq!(v.kind_name(), "integer");
    }

    #[test]
    fn test_nested_get() {
        let mut inner = IndexMap::new();
        inner.insert("board".to_string(), ConfigValue::string("nodemcuv2"));
        let doc = ConfigValue::map(inner);
        assert_eq!(doc.get("board").and_then(|v| v.as_str()), Some("nodemcuv2"));
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn test_walk_visits_all() {
        let mut map = IndexMap::new();
        map.insert(
            "a".to_string(),
            ConfigValue::list(vec![ConfigValue::int(1), ConfigValue::int(2)]),
        );
        let doc = ConfigValue::map(map);
        let mut count = 0;
        doc.walk(&mut |_| count += 1);
        // root map + list + two ints
        assert_eq!(count, 4);
    }
}
