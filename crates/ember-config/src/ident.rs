//! Symbolic identifiers for declared entities.
//!
//! An [`Ident`] names an entity in the generated code. Names supplied by the
//! user are manual and kept verbatim; auto-generated names are derived from
//! the declared type and disambiguated lazily, once the full set of used
//! names is known.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A symbolic name for a declared or referenced entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    name: Option<String>,
    /// Target-language type this id resolves to, e.g. `logger::Logger`.
    type_tag: Option<String>,
    is_manual: bool,
    is_declaration: bool,
}

impl Ident {
    /// A declaration-site id. `name` is `None` for auto-generated ids.
    pub fn declare(name: Option<&str>, type_tag: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            type_tag: Some(type_tag.to_string()),
            is_manual: name.is_some(),
            is_declaration: true,
        }
    }

    /// A use-site id referring to a declaration elsewhere.
    pub fn use_site(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            type_tag: None,
            is_manual: true,
            is_declaration: false,
        }
    }

    /// A use-site id carrying the type the referring component expects.
    pub fn use_site_typed(name: &str, type_tag: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            type_tag: Some(type_tag.to_string()),
            is_manual: true,
            is_declaration: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    pub fn set_type_tag(&mut self, type_tag: &str) {
        self.type_tag = Some(type_tag.to_string());
    }

    pub fn is_manual(&self) -> bool {
        self.is_manual
    }

    pub fn is_declaration(&self) -> bool {
        self.is_declaration
    }

    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// Finalize this id's name against the set of names already in use.
    ///
    /// Manual names are returned verbatim; collision checking against other
    /// resolutions and the reserved set is the caller's responsibility since
    /// only the caller can produce a proper diagnostic. Auto-generated names
    /// derive a lower-snake-case base from the type tag and append `_2`,
    /// `_3`, ... until unused.
    pub fn resolve(&mut self, used: &IndexSet<String>) -> &str {
        if self.name.is_none() {
            let base = snake_base(self.type_tag.as_deref().unwrap_or("var"));
            self.name = Some(ensure_unique(&base, used));
        }
        self.name.as_deref().unwrap_or_default()
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ident {}

impl Hash for Ident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or(""))
    }
}

/// Derive an identifier base from a target-language type.
fn snake_base(type_tag: &str) -> String {
    let lowered = type_tag.replace("::", "_").to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "var".to_string()
    } else {
        cleaned
    }
}

/// Append `_2`, `_3`, ... until the name is unused.
fn ensure_unique(base: &str, used: &IndexSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_name_kept_verbatim() {
        let mut id = Ident::declare(Some("my_led"), "gpio::Output");
        assert!(id.is_manual());
        assert!(id.is_declaration());
        let used = IndexSet::new();
        assert_eq!(id.resolve(&used), "my_led");
    }

    #[test]
    fn test_auto_name_from_type() {
        let mut id = Ident::declare(None, "logger::Logger");
        assert!(!id.is_manual());
        let used = IndexSet::new();
        assert_eq!(id.resolve(&used), "logger_logger");
    }

    #[test]
    fn test_auto_name_disambiguation() {
        let mut used = IndexSet::new();
        used.insert("logger_logger".to_string());
        used.insert("logger_logger_2".to_string());
        let mut id = Ident::declare(None, "logger::Logger");
        assert_eq!(id.resolve(&used), "logger_logger_3");
    }

    #[test]
    fn test_type_with_template_arguments() {
        let used = IndexSet::new();
        let mut id = Ident::declare(None, "sensor::Filter<float>");
        assert_eq!(id.resolve(&used), "sensor_filterfloat");
    }

    #[test]
    fn test_equality_by_name() {
        let decl = Ident::declare(Some("x"), "ns::T");
        let use_ = Ident::use_site("x");
        assert_eq!(decl, use_);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut used = IndexSet::new();
        used.insert("logger_logger".to_string());
        let mut id = Ident::declare(None, "logger::Logger");
        assert_eq!(id.resolve(&used), "logger_logger_2");
        // Second resolution must not re-derive.
        assert_eq!(id.resolve(&used), "logger_logger_2");
    }
}
