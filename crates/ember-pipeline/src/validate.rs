//! Document validation and id resolution.
//!
//! Normal validation runs each component's schema over its own stanza in
//! dependency order, replacing the stanza with the validated result; the
//! final pass runs each component's whole-document hook. Id resolution then
//! fixes every declaration to a unique C++ name: manual names first (any
//! collision is fatal), auto names after, disambiguated against everything
//! already taken.

use indexmap::IndexSet;
use tracing::debug;

use ember_codegen::{is_reserved, CoreContext};
use ember_config::{ConfigValue, Invalid, PathKey, ValidationErrors, ValueKind};

use crate::component::ComponentRegistry;
use crate::error::{Error, Result};

/// Top-level domains ordered so that every component's dependencies come
/// before it, ties broken by document order.
pub fn dependency_order(document: &ConfigValue, registry: &ComponentRegistry) -> Vec<String> {
    let Some(map) = document.as_map() else {
        return Vec::new();
    };
    let domains: Vec<&str> = map.keys().map(String::as_str).collect();

    let mut ordered: Vec<String> = Vec::with_capacity(domains.len());
    let mut placed: IndexSet<&str> = IndexSet::new();
    while placed.len() < domains.len() {
        let mut progressed = false;
        for &domain in &domains {
            if placed.contains(domain) {
                continue;
            }
            let ready = registry.get(domain).map_or(true, |c| {
                c.dependencies()
                    .iter()
                    .all(|dep| placed.contains(*dep) || !map.contains_key(*dep))
            });
            if ready {
                placed.insert(domain);
                ordered.push(domain.to_string());
                progressed = true;
            }
        }
        if !progressed {
            // Dependency cycle: fall back to document order for the rest.
            for &domain in &domains {
                if placed.insert(domain) {
                    ordered.push(domain.to_string());
                }
            }
        }
    }
    ordered
}

/// Normal validation pass: apply each component's schema to its stanza and
/// replace the stanza with the result. Errors across stanzas are batched.
pub fn validate_document(document: &mut ConfigValue, registry: &ComponentRegistry) -> Result<()> {
    let order = dependency_order(document, registry);
    let mut errors = ValidationErrors::new();

    for domain in order {
        let Some(component) = registry.get(&domain) else {
            return Err(Error::UnknownComponent(domain));
        };
        let Some(schema) = component.schema() else {
            continue;
        };
        let map = document
            .as_map_mut()
            .expect("document root is a mapping after preload");
        let stanza = map
            .get_mut(&domain)
            .expect("ordered domain exists in document");
        let raw = std::mem::replace(stanza, ConfigValue::null());

        let validated = if component.multi_conf() && matches!(raw.kind, ValueKind::List(_)) {
            let ValueKind::List(items) = raw.kind else {
                unreachable!()
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match schema.validate(item) {
                    Ok(v) => out.push(v),
                    Err(errs) => {
                        for e in errs.0 {
                            errors.push(
                                e.prepend(PathKey::Index(index))
                                    .prepend(PathKey::Key(domain.clone())),
                            );
                        }
                        out.push(ConfigValue::null());
                    }
                }
            }
            ConfigValue::list(out)
        } else {
            match schema.validate(raw) {
                Ok(v) => v,
                Err(errs) => {
                    for e in errs.0 {
                        errors.push(e.prepend(PathKey::Key(domain.clone())));
                    }
                    continue;
                }
            }
        };
        *document
            .as_map_mut()
            .expect("document root is a mapping")
            .get_mut(&domain)
            .expect("ordered domain exists in document") = validated;
        debug!(%domain, "validated stanza");
    }

    errors.into_result()?;
    Ok(())
}

/// Final validation pass: every component's whole-document hook, batched.
pub fn final_validate(document: &ConfigValue, registry: &ComponentRegistry) -> Result<()> {
    let mut errors = ValidationErrors::new();
    for domain in dependency_order(document, registry) {
        if let Some(component) = registry.get(&domain) {
            if let Err(errs) = component.final_validate(document) {
                errors.extend(errs);
            }
        }
    }
    errors.into_result()?;
    Ok(())
}

/// Resolve every declaration-site id in the document to a unique name and
/// check every use-site against the declarations.
///
/// Manual names win first; a duplicate manual name or a collision with the
/// reserved set is fatal. Auto names are derived from the type tag and
/// disambiguated afterwards.
pub fn resolve_ids(document: &mut ConfigValue, ctx: &mut CoreContext) -> Result<()> {
    let mut used: IndexSet<String> = IndexSet::new();
    let mut declared_types: Vec<(String, Option<String>)> = Vec::new();
    let mut fatal: Option<Error> = None;

    // Manual declarations claim their names verbatim.
    document.walk(&mut |value| {
        if fatal.is_some() {
            return;
        }
        if let ValueKind::Id(id) = &value.kind {
            if id.is_declaration() && id.is_manual() {
                let name = id.name().expect("manual id has a name").to_string();
                if is_reserved(&name, ctx.loaded_integrations()) {
                    fatal = Some(ember_codegen::Error::ReservedId(name).into());
                } else if !used.insert(name.clone()) {
                    fatal = Some(ember_codegen::Error::DuplicateId(name).into());
                } else {
                    declared_types.push((name, id.type_tag().map(String::from)));
                }
            }
        }
    });
    if let Some(err) = fatal {
        return Err(err);
    }

    // Auto declarations derive from the type tag, disambiguated against
    // everything taken so far.
    document.walk_mut(&mut |value| {
        if let ValueKind::Id(id) = &mut value.kind {
            if id.is_declaration() && !id.is_manual() && !id.is_resolved() {
                let name = id.resolve(&used).to_string();
                used.insert(name.clone());
                declared_types.push((name, id.type_tag().map(String::from)));
            }
        }
    });

    for (name, _) in &declared_types {
        ctx.record_component_id(name);
    }

    // Use-sites must refer to a declaration; a typed use-site must agree
    // with the declared type. Untyped use-sites adopt it.
    let mut fatal: Option<Error> = None;
    document.walk_mut(&mut |value| {
        if fatal.is_some() {
            return;
        }
        match &mut value.kind {
            ValueKind::Id(id) if !id.is_declaration() => {
                let name = id.name().expect("use-site id has a name").to_string();
                let Some((_, declared)) = declared_types.iter().find(|(n, _)| *n == name) else {
                    fatal = Some(ember_codegen::Error::UnresolvedId(name).into());
                    return;
                };
                match (id.type_tag(), declared.as_deref()) {
                    (Some(used_tag), Some(decl_tag)) if used_tag != decl_tag => {
                        fatal = Some(Error::IdTypeMismatch {
                            name,
                            declared: decl_tag.to_string(),
                            used: used_tag.to_string(),
                        });
                    }
                    (None, Some(decl_tag)) => {
                        let decl_tag = decl_tag.to_string();
                        id.set_type_tag(&decl_tag);
                    }
                    _ => {}
                }
            }
            ValueKind::Lambda(lambda) => {
                for required in lambda.required_ids() {
                    let name = required.name().unwrap_or_default();
                    if !declared_types.iter().any(|(n, _)| n == name) {
                        fatal = Some(
                            ember_codegen::Error::UnresolvedId(name.to_string()).into(),
                        );
                        return;
                    }
                }
            }
            _ => {}
        }
    });
    if let Some(err) = fatal {
        return Err(err);
    }
    Ok(())
}

/// Build the "missing root section" diagnostic.
pub fn missing_root_error(root: &str) -> Error {
    Error::Validation(
        Invalid::new(format!(
            "configuration must contain a '{root}:' section with name, platform and board"
        ))
        .into(),
    )
}
