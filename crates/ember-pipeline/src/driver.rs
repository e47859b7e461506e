//! Pipeline driver.
//!
//! Runs the whole build: preload of the root stanza, dependency expansion,
//! both validation passes, id resolution, generation, and serialization.
//! Every step can fail; nothing touches the filesystem until the entire run
//! has succeeded.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ember_codegen::{Artifacts, CoreContext, Scheduler};
use ember_config::{ConfigValue, Invalid, ValueKind};

use crate::component::ComponentRegistry;
use crate::components::core::pio_platform;
use crate::error::{Error, Result};
use crate::{expand, validate};

/// Domain of the mandatory root stanza.
pub const ROOT_DOMAIN: &str = "core";

/// A finished build: the context and the rendered artifacts.
#[derive(Debug)]
pub struct Build {
    pub context: CoreContext,
    pub artifacts: Artifacts,
}

impl Build {
    /// Write the artifacts under the build path.
    pub fn write(&self) -> Result<()> {
        self.artifacts.write(&self.context)?;
        Ok(())
    }
}

/// Run the pipeline end to end. Renders the artifacts but writes nothing;
/// call [`Build::write`] (or [`run_and_write`]) to commit them.
pub fn run(
    registry: &ComponentRegistry,
    config_path: &Path,
    mut document: ConfigValue,
    build_path_override: Option<PathBuf>,
) -> Result<Build> {
    // 1. Preload: the root stanza fixes the build identity before anything
    // else runs.
    let root = document
        .get(ROOT_DOMAIN)
        .ok_or_else(|| validate::missing_root_error(ROOT_DOMAIN))?
        .clone();
    let root_component = registry
        .get(ROOT_DOMAIN)
        .ok_or_else(|| Error::UnknownComponent(ROOT_DOMAIN.to_string()))?;
    let preload = match root_component.schema() {
        Some(schema) => schema.validate(root)?,
        None => root,
    };

    let text = |key: &str| -> String {
        preload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let name = text("name");
    let platform = text("platform");
    let board = text("board");
    let pio = pio_platform(&platform).ok_or_else(|| {
        Error::Validation(Invalid::new(format!("unsupported platform '{platform}'")).into())
    })?;

    let build_path = build_path_override
        .or_else(|| {
            preload
                .get("build_path")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| default_build_path(config_path, &name));
    debug!(%name, %platform, %board, build_path = %build_path.display(), "preloaded");

    let mut ctx = CoreContext::new(&name, pio, "arduino", config_path, build_path);
    ctx.set_board(&board);
    if let Some(friendly) = preload.get("friendly_name").and_then(|v| v.as_str()) {
        ctx.set_friendly_name(friendly);
    }

    // 2. Dependency expansion.
    expand::expand(&mut document, registry)?;
    let domains: Vec<String> = document
        .as_map()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    for domain in &domains {
        ctx.mark_loaded(domain);
    }

    // 3–4. Validation, normal then final.
    validate::validate_document(&mut document, registry)?;
    validate::final_validate(&document, registry)?;

    // 5. Id resolution over the validated document.
    validate::resolve_ids(&mut document, &mut ctx)?;
    ctx.set_document(document.clone());

    // 6. Enqueue generation tasks.
    let mut scheduler = Scheduler::new();
    if let Some(map) = document.as_map() {
        for (domain, stanza) in map {
            let component = registry
                .get(domain)
                .ok_or_else(|| Error::UnknownComponent(domain.clone()))?;
            if component.multi_conf() {
                if let ValueKind::List(items) = &stanza.kind {
                    for item in items {
                        scheduler.enqueue(domain, component.priority(), component.to_code(item.clone()));
                    }
                    continue;
                }
            }
            scheduler.enqueue(domain, component.priority(), component.to_code(stanza.clone()));
        }
    }

    // 7. Run to quiescence.
    scheduler.flush(&mut ctx)?;

    // 8. Render.
    let artifacts = Artifacts::render(&ctx);
    info!(%name, "build generated");
    Ok(Build {
        context: ctx,
        artifacts,
    })
}

/// [`run`], then write the artifacts under the build path.
pub fn run_and_write(
    registry: &ComponentRegistry,
    config_path: &Path,
    document: ConfigValue,
    build_path_override: Option<PathBuf>,
) -> Result<Build> {
    let build = run(registry, config_path, document, build_path_override)?;
    build.write()?;
    Ok(build)
}

fn default_build_path(config_path: &Path, name: &str) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".ember")
        .join("build")
        .join(name)
}
