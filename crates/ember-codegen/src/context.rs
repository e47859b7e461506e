//! Shared build context.
//!
//! A [`CoreContext`] accumulates everything the generation phase produces:
//! ordered statements for `setup()`, global declarations, preprocessor
//! defines, build flags, library requirements, PlatformIO options, and the
//! variable registry. One context lives for exactly one build and is passed
//! explicitly to every generation task.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use ember_config::{ConfigValue, Ident};

use crate::error::{Error, Result};
use crate::expr::Statement;
use crate::registry::{Handle, VariableRegistry};

/// A preprocessor define emitted into `defines.h`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "#define {} {}", self.name, v),
            None => write!(f, "#define {}", self.name),
        }
    }
}

/// A platform library requirement, deduplicated by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub version: Option<String>,
    pub repository: Option<String>,
}

impl Library {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        repository: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            repository,
        }
    }

    /// Dedup key: the bare library name without a registry vendor prefix.
    fn key(&self) -> String {
        match self.name.rsplit_once('/') {
            Some((_, bare)) => bare.to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(repo) = &self.repository {
            write!(f, "{}={}", self.name, repo)
        } else if let Some(version) = &self.version {
            write!(f, "{}@{}", self.name, version)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// A raw `platformio.ini` option contributed by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PioOption {
    /// Scalar option; a later write replaces an earlier one.
    Str(String),
    /// Multi-value option; later writes append.
    List(Vec<String>),
}

/// Accumulated state of one firmware build.
#[derive(Debug)]
pub struct CoreContext {
    name: String,
    friendly_name: Option<String>,
    address: Option<String>,
    board: String,
    target_platform: String,
    target_framework: String,
    framework_version: Option<String>,
    config_path: PathBuf,
    build_path: PathBuf,

    document: ConfigValue,
    loaded_integrations: IndexSet<String>,
    component_ids: IndexSet<String>,

    main_statements: Vec<Statement>,
    global_statements: Vec<Statement>,
    defines: IndexSet<Define>,
    build_flags: IndexSet<String>,
    libraries: Vec<Library>,
    platformio_options: IndexMap<String, PioOption>,
    variables: VariableRegistry,
}

impl CoreContext {
    pub fn new(
        name: impl Into<String>,
        target_platform: impl Into<String>,
        target_framework: impl Into<String>,
        config_path: impl Into<PathBuf>,
        build_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            friendly_name: None,
            address: None,
            board: String::new(),
            target_platform: target_platform.into(),
            target_framework: target_framework.into(),
            framework_version: None,
            config_path: config_path.into(),
            build_path: build_path.into(),
            document: ConfigValue::empty_map(),
            loaded_integrations: IndexSet::new(),
            component_ids: IndexSet::new(),
            main_statements: Vec::new(),
            global_statements: Vec::new(),
            defines: IndexSet::new(),
            build_flags: IndexSet::new(),
            libraries: Vec::new(),
            platformio_options: IndexMap::new(),
            variables: VariableRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn friendly_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }

    pub fn set_friendly_name(&mut self, friendly_name: impl Into<String>) {
        self.friendly_name = Some(friendly_name.into());
    }

    /// Network address the node is reachable at. Defaults to `<name>.local`
    /// until a network component sets it.
    pub fn address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format!("{}.local", self.name))
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn set_board(&mut self, board: impl Into<String>) {
        self.board = board.into();
    }

    pub fn target_platform(&self) -> &str {
        &self.target_platform
    }

    pub fn target_framework(&self) -> &str {
        &self.target_framework
    }

    pub fn framework_version(&self) -> Option<&str> {
        self.framework_version.as_deref()
    }

    pub fn set_framework_version(&mut self, version: impl Into<String>) {
        self.framework_version = Some(version.into());
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    pub fn document(&self) -> &ConfigValue {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ConfigValue {
        &mut self.document
    }

    pub fn set_document(&mut self, document: ConfigValue) {
        self.document = document;
    }

    pub fn loaded_integrations(&self) -> &IndexSet<String> {
        &self.loaded_integrations
    }

    pub fn mark_loaded(&mut self, domain: &str) {
        self.loaded_integrations.insert(domain.to_string());
    }

    /// Resolved declaration-site ids, in resolution order.
    pub fn component_ids(&self) -> &IndexSet<String> {
        &self.component_ids
    }

    pub fn record_component_id(&mut self, name: &str) -> bool {
        self.component_ids.insert(name.to_string())
    }

    /// Append a statement to `setup()`.
    pub fn add(&mut self, statement: Statement) {
        self.main_statements.push(statement);
    }

    /// Append a file-scope declaration ahead of `setup()`.
    pub fn add_global(&mut self, statement: Statement) {
        self.global_statements.push(statement);
    }

    pub fn main_statements(&self) -> &[Statement] {
        &self.main_statements
    }

    pub fn global_statements(&self) -> &[Statement] {
        &self.global_statements
    }

    /// Record a define. Returns false when it was already present.
    pub fn add_define(&mut self, define: Define) -> bool {
        self.defines.insert(define)
    }

    pub fn defines(&self) -> &IndexSet<Define> {
        &self.defines
    }

    pub fn add_build_flag(&mut self, flag: impl Into<String>) -> bool {
        self.build_flags.insert(flag.into())
    }

    pub fn build_flags(&self) -> &IndexSet<String> {
        &self.build_flags
    }

    /// Record a library requirement, merging with any same-named one.
    ///
    /// A repository pin always wins over a bare name; two different
    /// repositories or two different version pins for the same library are
    /// build errors.
    pub fn add_library(&mut self, library: Library) -> Result<&Library> {
        let key = library.key();
        let existing = self
            .libraries
            .iter()
            .position(|other| other.key() == key);

        let Some(idx) = existing else {
            debug!(library = %library, "adding library");
            self.libraries.push(library);
            return Ok(self.libraries.last().unwrap());
        };

        let slot = &mut self.libraries[idx];
        if let Some(repo) = &library.repository {
            match &slot.repository {
                Some(existing_repo) if existing_repo != repo => {
                    return Err(Error::LibraryRepositoryConflict {
                        name: slot.name.clone(),
                        existing: existing_repo.clone(),
                        new: repo.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    // Repository pin supersedes a plain registry entry.
                    *slot = library;
                }
            }
            return Ok(&self.libraries[idx]);
        }

        if slot.repository.is_some() {
            // Existing repository pin covers the plain request.
            return Ok(&self.libraries[idx]);
        }
        match (&slot.version, &library.version) {
            (Some(a), Some(b)) if a != b => Err(Error::LibraryVersionConflict {
                name: slot.name.clone(),
                existing: a.clone(),
                new: b.clone(),
            }),
            (None, Some(_)) => {
                slot.version = library.version;
                Ok(&self.libraries[idx])
            }
            _ => Ok(&self.libraries[idx]),
        }
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    /// Set or extend a raw `platformio.ini` option.
    ///
    /// Scalar values replace the previous value; list values concatenate
    /// after it.
    pub fn add_platformio_option(&mut self, key: impl Into<String>, value: PioOption) {
        let key = key.into();
        match (self.platformio_options.get_mut(&key), value) {
            (Some(PioOption::List(existing)), PioOption::List(mut new)) => {
                existing.append(&mut new);
            }
            (slot, value) => {
                if let Some(slot) = slot {
                    *slot = value;
                } else {
                    self.platformio_options.insert(key, value);
                }
            }
        }
    }

    pub fn platformio_options(&self) -> &IndexMap<String, PioOption> {
        &self.platformio_options
    }

    /// Register a declared id's C++ handle. The id must already be resolved.
    pub fn register_variable(&mut self, id: Ident, handle: Handle) -> Result<()> {
        self.variables.register(id, handle)
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    /// Clear everything accumulated during a run, keeping the build target
    /// identity (name, platform, paths).
    pub fn reset(&mut self) {
        self.document = ConfigValue::empty_map();
        self.loaded_integrations.clear();
        self.component_ids.clear();
        self.main_statements.clear();
        self.global_statements.clear();
        self.defines.clear();
        self.build_flags.clear();
        self.libraries.clear();
        self.platformio_options.clear();
        self.variables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CoreContext {
        CoreContext::new("dev", "test_platform", "arduino", "cfg.yaml", "build/dev")
    }

    #[test]
    fn test_define_display() {
        assert_eq!(Define::flag("USE_WIFI").to_string(), "#define USE_WIFI");
        assert_eq!(
            Define::value("EMBER_VERSION", "\"1.0\"").to_string(),
            "#define EMBER_VERSION \"1.0\""
        );
    }

    #[test]
    fn test_defines_dedup() {
        let mut ctx = ctx();
        assert!(ctx.add_define(Define::flag("USE_LOGGER")));
        assert!(!ctx.add_define(Define::flag("USE_LOGGER")));
        assert_eq!(ctx.defines().len(), 1);
    }

    #[test]
    fn test_library_display() {
        assert_eq!(Library::new("ArduinoJson", None, None).to_string(), "ArduinoJson");
        assert_eq!(
            Library::new("ArduinoJson", Some("6.18.5".into()), None).to_string(),
            "ArduinoJson@6.18.5"
        );
        assert_eq!(
            Library::new("Improv", None, Some("https://example.com/improv.git".into()))
                .to_string(),
            "Improv=https://example.com/improv.git"
        );
    }

    #[test]
    fn test_library_version_adopted() {
        let mut ctx = ctx();
        ctx.add_library(Library::new("ArduinoJson", None, None)).unwrap();
        ctx.add_library(Library::new("ArduinoJson", Some("6.18.5".into()), None))
            .unwrap();
        assert_eq!(ctx.libraries().len(), 1);
        assert_eq!(ctx.libraries()[0].version.as_deref(), Some("6.18.5"));
    }

    #[test]
    fn test_library_version_conflict() {
        let mut ctx = ctx();
        ctx.add_library(Library::new("ArduinoJson", Some("6.18.5".into()), None))
            .unwrap();
        let err = ctx
            .add_library(Library::new("ArduinoJson", Some("5.0.0".into()), None))
            .unwrap_err();
        assert!(matches!(err, Error::LibraryVersionConflict { .. }));
    }

    #[test]
    fn test_library_repository_wins() {
        let mut ctx = ctx();
        ctx.add_library(Library::new("Improv", Some("1.0.0".into()), None))
            .unwrap();
        ctx.add_library(Library::new(
            "Improv",
            None,
            Some("https://example.com/improv.git".into()),
        ))
        .unwrap();
        assert_eq!(ctx.libraries().len(), 1);
        assert!(ctx.libraries()[0].repository.is_some());
    }

    #[test]
    fn test_library_vendor_prefix_same_key() {
        let mut ctx = ctx();
        ctx.add_library(Library::new("vendor/Improv", None, None)).unwrap();
        ctx.add_library(Library::new("Improv", None, None)).unwrap();
        assert_eq!(ctx.libraries().len(), 1);
    }

    #[test]
    fn test_pio_scalar_replaces() {
        let mut ctx = ctx();
        ctx.add_platformio_option("board_build.flash_mode", PioOption::Str("dio".into()));
        ctx.add_platformio_option("board_build.flash_mode", PioOption::Str("qio".into()));
        assert_eq!(
            ctx.platformio_options()["board_build.flash_mode"],
            PioOption::Str("qio".into())
        );
    }

    #[test]
    fn test_pio_list_concatenates() {
        let mut ctx = ctx();
        ctx.add_platformio_option("extra_scripts", PioOption::List(vec!["pre.py".into()]));
        ctx.add_platformio_option("extra_scripts", PioOption::List(vec!["post.py".into()]));
        assert_eq!(
            ctx.platformio_options()["extra_scripts"],
            PioOption::List(vec!["pre.py".into(), "post.py".into()])
        );
    }

    #[test]
    fn test_friendly_name_falls_back_to_name() {
        let mut ctx = ctx();
        assert_eq!(ctx.friendly_name(), "dev");
        ctx.set_friendly_name("Living Room");
        assert_eq!(ctx.friendly_name(), "Living Room");
    }
}
