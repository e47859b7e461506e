//! Root component: the mandatory `core:` stanza.
//!
//! Owns the build identity (node name, target platform, board) and the
//! escape hatches that tune the generated project file directly.

use ember_codegen::scheduler::StartFn;
use ember_codegen::{Define, Expression, Handle, Resume, Statement};
use ember_config::schema::{self, Schema, Shape, Validator};
use ember_config::{ConfigValue, Ident, Invalid};

use crate::component::Component;

/// Supported target platforms and their PlatformIO platform names.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("esp32", "espressif32"),
    ("esp8266", "espressif8266"),
    ("rp2040", "raspberrypi"),
    ("host", "native"),
];

/// PlatformIO platform name for a configured platform.
pub fn pio_platform(platform: &str) -> Option<&'static str> {
    PLATFORMS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, pio)| *pio)
}

fn platform_names() -> Vec<&'static str> {
    PLATFORMS.iter().map(|(name, _)| *name).collect()
}

/// Any mapping of scalar or list values, passed through untouched.
fn raw_options() -> Validator {
    Validator::new(Shape::Opaque("raw options mapping".into()), |value| {
        if value.as_map().is_some() {
            Ok(value)
        } else {
            Err(Invalid::new(format!("expected a mapping, got {}", value.kind_name()))
                .with_range(value.range.clone())
                .into())
        }
    })
}

pub struct CoreComponent;

impl Component for CoreComponent {
    fn domain(&self) -> &'static str {
        "core"
    }

    fn schema(&self) -> Option<Validator> {
        Some(
            Schema::new()
                .required("name", schema::string())
                .required("platform", schema::one_of(&platform_names()))
                .required("board", schema::string())
                .optional("friendly_name", schema::string())
                .optional("build_path", schema::string())
                .optional("platformio_options", raw_options())
                .optional("includes", schema::ensure_list(schema::string()))
                .into_validator(),
        )
    }

    fn priority(&self) -> f64 {
        100.0
    }

    fn to_code(&self, config: ConfigValue) -> StartFn {
        Box::new(move |ctx| {
            for include in config
                .get("includes")
                .and_then(|v| v.as_list())
                .unwrap_or_default()
            {
                if let Some(path) = include.as_str() {
                    ctx.add(Statement::include(path));
                }
            }

            ctx.add(Statement::expr(Expression::call(
                "App.pre_setup",
                vec![
                    Expression::string(ctx.name()),
                    Expression::string(ctx.friendly_name()),
                ],
            )));
            ctx.register_variable(
                Ident::declare(Some("app"), "Application"),
                Handle::value("App"),
            )?;

            ctx.add_define(Define::value(
                "ESPHOME_BOARD",
                Expression::string(ctx.board()).to_string(),
            ));

            if let Some(options) = config
                .get("platformio_options")
                .and_then(|v| v.as_map())
                .cloned()
            {
                for (key, value) in options {
                    ctx.add_platformio_option(key, pio_option(&value));
                }
            }
            Ok(Resume::Done)
        })
    }
}

fn pio_option(value: &ConfigValue) -> ember_codegen::PioOption {
    match value.as_list() {
        Some(items) => ember_codegen::PioOption::List(
            items.iter().map(scalar_text).collect(),
        ),
        None => ember_codegen::PioOption::Str(scalar_text(value)),
    }
}

fn scalar_text(value: &ConfigValue) -> String {
    if let Some(s) = value.as_str() {
        s.to_string()
    } else if let Some(b) = value.as_bool() {
        b.to_string()
    } else if let Some(i) = value.as_int() {
        i.to_string()
    } else if let Some(f) = value.as_float() {
        f.to_string()
    } else {
        String::new()
    }
}
