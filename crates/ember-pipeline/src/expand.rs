//! Dependency expansion.
//!
//! Walks the document's top-level domains to a fixed point, synthesizing
//! empty stanzas for every `auto_load` entry, then checks that all declared
//! dependencies are present and no conflicting pair is configured.

use tracing::debug;

use ember_config::ConfigValue;

use crate::component::ComponentRegistry;
use crate::error::{Error, Result};

/// Expand `auto_load` domains to a fixed point, then verify dependency and
/// conflict declarations.
pub fn expand(document: &mut ConfigValue, registry: &ComponentRegistry) -> Result<()> {
    // Every top-level key must name a known component before anything else.
    let domains: Vec<String> = top_level_domains(document);
    for domain in &domains {
        if !registry.contains(domain) {
            return Err(Error::UnknownComponent(domain.clone()));
        }
    }

    loop {
        let mut added: Vec<&'static str> = Vec::new();
        for domain in top_level_domains(document) {
            let component = registry
                .get(&domain)
                .ok_or_else(|| Error::UnknownComponent(domain.clone()))?;
            for &auto in component.auto_load() {
                if document.get(auto).is_none() && !added.contains(&auto) {
                    debug!(%domain, auto, "auto-loading component");
                    added.push(auto);
                }
            }
        }
        if added.is_empty() {
            break;
        }
        let map = document
            .as_map_mut()
            .expect("document root is a mapping after preload");
        for auto in added {
            if !registry.contains(auto) {
                return Err(Error::UnknownComponent(auto.to_string()));
            }
            map.insert(auto.to_string(), ConfigValue::empty_map());
        }
    }

    for domain in top_level_domains(document) {
        let component = registry
            .get(&domain)
            .ok_or_else(|| Error::UnknownComponent(domain.clone()))?;
        for &dependency in component.dependencies() {
            if document.get(dependency).is_none() {
                return Err(Error::MissingDependency {
                    domain,
                    dependency: dependency.to_string(),
                });
            }
        }
        for &other in component.conflicts_with() {
            if document.get(other).is_some() {
                return Err(Error::Conflict {
                    domain,
                    other: other.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn top_level_domains(document: &ConfigValue) -> Vec<String> {
    document
        .as_map()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}
