//! Component protocol.
//!
//! A component owns one top-level stanza domain: it validates the stanza,
//! declares what other domains it needs or excludes, and contributes a
//! generation task. Components are discovered through an explicit
//! [`ComponentRegistry`] keyed by domain name.

use indexmap::IndexMap;

use ember_codegen::scheduler::StartFn;
use ember_config::schema::Validator;
use ember_config::{ConfigValue, ValidationErrors};

pub trait Component {
    /// The top-level document key this component owns.
    fn domain(&self) -> &'static str;

    /// Stanza validator. `None` accepts the stanza untouched.
    fn schema(&self) -> Option<Validator> {
        None
    }

    /// Domains that must be configured for this component to work.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Domains implicitly added (as empty stanzas) when absent.
    fn auto_load(&self) -> &'static [&'static str] {
        &[]
    }

    /// Domains that must not be configured alongside this one.
    fn conflicts_with(&self) -> &'static [&'static str] {
        &[]
    }

    /// Generation priority; higher runs earlier. Default 0.
    fn priority(&self) -> f64 {
        0.0
    }

    /// Whether the stanza may be a list of independent instances.
    fn multi_conf(&self) -> bool {
        false
    }

    /// Hook run over the whole validated document in the final pass.
    fn final_validate(&self, _document: &ConfigValue) -> Result<(), ValidationErrors> {
        Ok(())
    }

    /// Build the generation task for one validated stanza.
    fn to_code(&self, config: ConfigValue) -> StartFn;
}

/// Explicit domain-name-keyed component lookup.
#[derive(Default)]
pub struct ComponentRegistry {
    components: IndexMap<&'static str, Box<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in components.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::components::core::CoreComponent));
        registry.register(Box::new(crate::components::logger::LoggerComponent));
        registry.register(Box::new(crate::components::wifi::WifiComponent));
        registry
    }

    pub fn register(&mut self, component: Box<dyn Component>) {
        self.components.insert(component.domain(), component);
    }

    pub fn get(&self, domain: &str) -> Option<&dyn Component> {
        self.components.get(domain).map(|c| c.as_ref())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.components.contains_key(domain)
    }

    pub fn domains(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.keys().copied()
    }
}
