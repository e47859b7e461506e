//! Identifier and variable registry.
//!
//! Maps resolved id names to handles: opaque target-language expressions
//! referring to declared entities (usually a pointer to an instance). Tasks
//! register handles as they declare variables; forward references suspend on
//! the scheduler until the handle appears.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use ember_config::Ident;

use crate::error::{Error, Result};

/// C++ keywords and runtime names generated identifiers must not shadow.
pub const RESERVED_NAMES: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "class", "compl", "concept", "const", "constexpr", "const_cast",
    "continue", "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum",
    "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
    "operator", "or", "or_eq", "private", "protected", "public", "register", "reinterpret_cast",
    "requires", "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast",
    "struct", "switch", "template", "this", "thread_local", "throw", "true", "try", "typedef",
    "typeid", "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t",
    "while", "xor", "xor_eq",
    // Names of objects the generated translation unit always declares.
    "App", "setup", "loop",
];

/// An opaque expression referring to a declared entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    expr: String,
    /// Whether members are reached with `->` (pointer) or `.` (value).
    arrow: bool,
}

impl Handle {
    pub fn pointer(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            arrow: true,
        }
    }

    pub fn value(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            arrow: false,
        }
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn is_pointer(&self) -> bool {
        self.arrow
    }

    /// The expression followed by its member-access operator, for lambda
    /// substitution of `id(x).member`.
    pub fn accessor(&self) -> String {
        if self.arrow {
            format!("{}->", self.expr)
        } else {
            format!("{}.", self.expr)
        }
    }

    /// A member access expression on this handle.
    pub fn member(&self, name: &str) -> String {
        format!("{}{}", self.accessor(), name)
    }
}

/// Registry of declared variables, keyed by resolved id name.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    variables: IndexMap<String, (Ident, Handle)>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the handle for a resolved declaration id.
    ///
    /// Duplicate registration is fatal: two components would be fighting
    /// over the same generated symbol.
    pub fn register(&mut self, id: Ident, handle: Handle) -> Result<()> {
        let Some(name) = id.name() else {
            return Err(Error::UnresolvedId(String::new()));
        };
        if self.variables.contains_key(name) {
            return Err(Error::DuplicateId(name.to_string()));
        }
        debug!(id = %name, type_tag = ?id.type_tag(), "registered variable");
        self.variables.insert(name.to_string(), (id, handle));
        Ok(())
    }

    /// Synchronous lookup; succeeds only when already registered.
    pub fn lookup(&self, name: &str) -> Option<&Handle> {
        self.variables.get(name).map(|(_, handle)| handle)
    }

    /// Lookup returning the canonical id alongside the handle, for callers
    /// that need the resolved type.
    pub fn lookup_full(&self, name: &str) -> Option<(&Ident, &Handle)> {
        self.variables.get(name).map(|(id, handle)| (id, handle))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }
}

/// Whether a name may not be used as a generated identifier.
pub fn is_reserved(name: &str, loaded_domains: &IndexSet<String>) -> bool {
    RESERVED_NAMES.contains(&name) || loaded_domains.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(name: &str) -> Ident {
        Ident::declare(Some(name), "ns::Type")
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = VariableRegistry::new();
        reg.register(resolved("led"), Handle::pointer("led")).unwrap();
        assert_eq!(reg.lookup("led").unwrap().expr(), "led");
        assert!(reg.lookup("other").is_none());

        let (id, handle) = reg.lookup_full("led").unwrap();
        assert_eq!(id.type_tag(), Some("ns::Type"));
        assert!(handle.is_pointer());
    }

    #[test]
    fn test_duplicate_registration_fatal() {
        let mut reg = VariableRegistry::new();
        reg.register(resolved("led"), Handle::pointer("led")).unwrap();
        let err = reg
            .register(resolved("led"), Handle::pointer("led2"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(name) if name == "led"));
    }

    #[test]
    fn test_handle_accessors() {
        let ptr = Handle::pointer("sens");
        assert_eq!(ptr.member("state"), "sens->state");
        let val = Handle::value("cfg");
        assert_eq!(val.member("port"), "cfg.port");
    }

    #[test]
    fn test_reserved_names() {
        let mut loaded = IndexSet::new();
        loaded.insert("wifi".to_string());
        assert!(is_reserved("class", &loaded));
        assert!(is_reserved("wifi", &loaded));
        assert!(!is_reserved("my_led", &loaded));
    }
}
