//! Output serialization.
//!
//! Renders the three build artifacts from a finished [`CoreContext`] and
//! writes them under the build directory. Rendering is pure string work so
//! the pipeline can keep the filesystem untouched until the entire build has
//! succeeded.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::context::{CoreContext, PioOption};
use crate::error::Result;
use crate::expr::Statement;

const GENERATED_BANNER: &str = "// Generated file. Do not edit.";

/// The rendered artifacts of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub defines_h: String,
    pub main_cpp: String,
    pub platformio_ini: String,
}

impl Artifacts {
    /// Render all outputs from the context. No filesystem access.
    pub fn render(ctx: &CoreContext) -> Self {
        Self {
            defines_h: render_defines(ctx),
            main_cpp: render_main(ctx),
            platformio_ini: render_platformio(ctx),
        }
    }

    /// Write the artifacts under the context's build path.
    pub fn write(&self, ctx: &CoreContext) -> Result<()> {
        let src = ctx.build_path().join("src");
        fs::create_dir_all(&src)?;
        write_if_changed(src.join("defines.h"), &self.defines_h)?;
        write_if_changed(src.join("main.cpp"), &self.main_cpp)?;
        write_if_changed(ctx.build_path().join("platformio.ini"), &self.platformio_ini)?;
        info!(build_path = %ctx.build_path().display(), "wrote build files");
        Ok(())
    }
}

fn write_if_changed(path: PathBuf, content: &str) -> Result<()> {
    if let Ok(existing) = fs::read_to_string(&path) {
        if existing == content {
            return Ok(());
        }
    }
    fs::write(path, content)?;
    Ok(())
}

fn render_defines(ctx: &CoreContext) -> String {
    let mut lines: Vec<String> = ctx.defines().iter().map(|d| d.to_string()).collect();
    lines.sort();
    let mut out = String::new();
    out.push_str(GENERATED_BANNER);
    out.push_str("\n#pragma once\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn render_main(ctx: &CoreContext) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_BANNER);
    out.push('\n');
    out.push_str("#include \"defines.h\"\n");

    // Includes are hoisted to the top regardless of when a task added them.
    let is_include = |s: &&Statement| matches!(s, Statement::Include { .. });
    for stmt in ctx.global_statements().iter().filter(is_include) {
        out.push_str(&stmt.to_string());
        out.push('\n');
    }
    for stmt in ctx.main_statements().iter().filter(is_include) {
        out.push_str(&stmt.to_string());
        out.push('\n');
    }
    out.push('\n');

    for stmt in ctx.global_statements() {
        if matches!(stmt, Statement::Include { .. }) {
            continue;
        }
        out.push_str(&stmt.to_string());
        out.push('\n');
    }

    out.push_str("\nvoid setup() {\n");
    for stmt in ctx.main_statements() {
        if matches!(stmt, Statement::Include { .. }) {
            continue;
        }
        out.push_str("  ");
        out.push_str(&stmt.to_string());
        out.push('\n');
    }
    out.push_str("}\n\nvoid loop() {\n}\n");
    out
}

fn render_platformio(ctx: &CoreContext) -> String {
    let mut out = String::new();
    out.push_str("; Generated file. Do not edit.\n");
    out.push_str(&format!("[env:{}]\n", ctx.name()));
    out.push_str(&format!("platform = {}\n", ctx.target_platform()));
    if !ctx.board().is_empty() {
        out.push_str(&format!("board = {}\n", ctx.board()));
    }
    match ctx.framework_version() {
        Some(version) => {
            out.push_str(&format!(
                "framework = {}@{}\n",
                ctx.target_framework(),
                version
            ));
        }
        None => out.push_str(&format!("framework = {}\n", ctx.target_framework())),
    }

    if !ctx.libraries().is_empty() {
        out.push_str("lib_deps =\n");
        for lib in ctx.libraries() {
            out.push_str(&format!("    {}\n", lib));
        }
    }
    if !ctx.build_flags().is_empty() {
        let mut flags: Vec<&str> = ctx.build_flags().iter().map(String::as_str).collect();
        flags.sort();
        out.push_str("build_flags =\n");
        for flag in flags {
            out.push_str(&format!("    {}\n", flag));
        }
    }
    for (key, value) in ctx.platformio_options() {
        match value {
            PioOption::Str(v) => out.push_str(&format!("{} = {}\n", key, v)),
            PioOption::List(items) => {
                out.push_str(&format!("{} =\n", key));
                for item in items {
                    out.push_str(&format!("    {}\n", item));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Define, Library};
    use crate::expr::Expression;

    fn ctx() -> CoreContext {
        CoreContext::new("dev", "espressif32", "arduino", "cfg.yaml", "build/dev")
    }

    #[test]
    fn test_defines_sorted() {
        let mut ctx = ctx();
        ctx.add_define(Define::flag("USE_WIFI"));
        ctx.add_define(Define::flag("USE_LOGGER"));
        let header = render_defines(&ctx);
        let wifi = header.find("USE_WIFI").unwrap();
        let logger = header.find("USE_LOGGER").unwrap();
        assert!(logger < wifi);
        assert!(header.contains("#pragma once"));
    }

    #[test]
    fn test_main_structure() {
        let mut ctx = ctx();
        ctx.add_global(Statement::raw("logger::Logger app_logger;"));
        ctx.add(Statement::include("logger/logger.h"));
        ctx.add(Statement::expr(Expression::call(
            "app_logger.pre_setup",
            vec![],
        )));
        let main = render_main(&ctx);
        let include = main.find("#include \"logger/logger.h\"").unwrap();
        let global = main.find("logger::Logger app_logger;").unwrap();
        let setup = main.find("void setup() {").unwrap();
        let call = main.find("  app_logger.pre_setup();").unwrap();
        assert!(include < global);
        assert!(global < setup);
        assert!(setup < call);
        assert!(main.contains("void loop() {\n}"));
    }

    #[test]
    fn test_platformio_sections() {
        let mut ctx = ctx();
        ctx.set_board("esp32dev");
        ctx.add_library(Library::new("ArduinoJson", Some("6.18.5".into()), None))
            .unwrap();
        ctx.add_build_flag("-DUSE_CUSTOM");
        ctx.add_platformio_option("board_build.flash_mode", PioOption::Str("dio".into()));
        let ini = render_platformio(&ctx);
        assert!(ini.contains("[env:dev]"));
        assert!(ini.contains("platform = espressif32"));
        assert!(ini.contains("board = esp32dev"));
        assert!(ini.contains("framework = arduino"));
        assert!(ini.contains("    ArduinoJson@6.18.5"));
        assert!(ini.contains("    -DUSE_CUSTOM"));
        assert!(ini.contains("board_build.flash_mode = dio"));
    }

    #[test]
    fn test_framework_version_pins() {
        let mut ctx = ctx();
        ctx.set_framework_version("2.0.9");
        let ini = render_platformio(&ctx);
        assert!(ini.contains("framework = arduino@2.0.9"));
    }

    #[test]
    fn test_render_is_pure() {
        let ctx = ctx();
        let a = Artifacts::render(&ctx);
        let b = Artifacts::render(&ctx);
        assert_eq!(a, b);
    }
}
