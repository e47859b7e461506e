//! Serial logger component.

use ember_codegen::scheduler::StartFn;
use ember_codegen::{Define, Expression, Handle, Resume, Statement};
use ember_config::schema::{self, Schema, Shape, Validator};
use ember_config::{ConfigValue, Invalid, PathKey, ValidationErrors};

use crate::component::Component;

const LOG_LEVELS: &[&str] = &[
    "NONE",
    "ERROR",
    "WARN",
    "INFO",
    "DEBUG",
    "VERBOSE",
    "VERY_VERBOSE",
];

/// Mapping of tag name to log level.
fn logs_map() -> Validator {
    let level = schema::one_of_ignore_case(LOG_LEVELS);
    Validator::new(Shape::Opaque("tag to level mapping".into()), move |value| {
        let Some(map) = value.as_map() else {
            return Err(Invalid::new(format!(
                "expected a mapping of tag to level, got {}",
                value.kind_name()
            ))
            .with_range(value.range.clone())
            .into());
        };
        let mut errors = ValidationErrors::new();
        let mut out = indexmap::IndexMap::new();
        for (tag, entry) in map {
            match level.validate(entry.clone()) {
                Ok(v) => {
                    out.insert(tag.clone(), v);
                }
                Err(errs) => {
                    for e in errs.0 {
                        errors.push(e.prepend(PathKey::Key(tag.clone())));
                    }
                }
            }
        }
        errors.into_result()?;
        Ok(ConfigValue::map(out))
    })
}

pub struct LoggerComponent;

impl Component for LoggerComponent {
    fn domain(&self) -> &'static str {
        "logger"
    }

    fn schema(&self) -> Option<Validator> {
        Some(
            Schema::new()
                .generate_id("id", "logger::Logger")
                .optional_default("baud_rate", schema::positive_int(), ConfigValue::int(115200))
                .optional_default(
                    "level",
                    schema::one_of_ignore_case(LOG_LEVELS),
                    ConfigValue::string("DEBUG"),
                )
                .optional("logs", logs_map())
                .into_validator(),
        )
    }

    fn priority(&self) -> f64 {
        90.0
    }

    fn to_code(&self, config: ConfigValue) -> StartFn {
        Box::new(move |ctx| {
            let id = config
                .get("id")
                .and_then(|v| v.as_ident())
                .cloned()
                .ok_or_else(|| ember_codegen::Error::component("logger", "missing id"))?;
            let name = id
                .name()
                .ok_or_else(|| ember_codegen::Error::component("logger", "unresolved id"))?
                .to_string();
            let baud = config.get("baud_rate").and_then(|v| v.as_int()).unwrap_or(115200);
            let level = config
                .get("level")
                .and_then(|v| v.as_str())
                .unwrap_or("DEBUG")
                .to_string();

            ctx.add(Statement::include("logger/logger.h"));
            ctx.add(Statement::Declaration {
                type_tag: "logger::Logger".to_string(),
                pointer: true,
                name: name.clone(),
                rhs: Expression::call("new logger::Logger", vec![Expression::int(baud)]),
            });
            let handle = Handle::pointer(name.clone());
            ctx.add(Statement::expr(Expression::call(
                handle.member("pre_setup"),
                vec![],
            )));

            if let Some(logs) = config.get("logs").and_then(|v| v.as_map()) {
                for (tag, entry) in logs {
                    let tag_level = entry.as_str().unwrap_or("DEBUG");
                    ctx.add(Statement::expr(Expression::call(
                        handle.member("set_log_level"),
                        vec![
                            Expression::string(tag.as_str()),
                            Expression::raw(format!("ESPHOME_LOG_LEVEL_{}", tag_level)),
                        ],
                    )));
                }
            }

            ctx.add_define(Define::flag("USE_LOGGER"));
            ctx.add_define(Define::value(
                "ESPHOME_LOG_LEVEL",
                format!("ESPHOME_LOG_LEVEL_{}", level),
            ));
            ctx.register_variable(id, handle)?;
            Ok(Resume::Done)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_defaults_applied() {
        let schema = LoggerComponent.schema().unwrap();
        let validated = schema.validate(ConfigValue::empty_map()).unwrap();
        assert_eq!(validated.get("baud_rate").unwrap().as_int(), Some(115200));
        assert_eq!(validated.get("level").unwrap().as_str(), Some("DEBUG"));
        let id = validated.get("id").unwrap().as_ident().unwrap();
        assert!(id.is_declaration());
        assert!(!id.is_manual());
    }

    #[test]
    fn test_level_case_insensitive() {
        let schema = LoggerComponent.schema().unwrap();
        let mut map = IndexMap::new();
        map.insert("level".to_string(), ConfigValue::string("verbose"));
        let validated = schema.validate(ConfigValue::map(map)).unwrap();
        assert_eq!(validated.get("level").unwrap().as_str(), Some("VERBOSE"));
    }

    #[test]
    fn test_logs_rejects_bad_level() {
        let schema = LoggerComponent.schema().unwrap();
        let mut logs = IndexMap::new();
        logs.insert("wifi".to_string(), ConfigValue::string("LOUD"));
        let mut map = IndexMap::new();
        map.insert("logs".to_string(), ConfigValue::map(logs));
        let err = schema.validate(ConfigValue::map(map)).unwrap_err();
        assert!(err.0[0].path_string().contains("logs"));
    }

    #[test]
    fn test_manual_id_kept() {
        let schema = LoggerComponent.schema().unwrap();
        let mut map = IndexMap::new();
        map.insert("id".to_string(), ConfigValue::string("my_logger"));
        let validated = schema.validate(ConfigValue::map(map)).unwrap();
        let id = validated.get("id").unwrap().as_ident().unwrap();
        assert_eq!(id.name(), Some("my_logger"));
        assert!(id.is_manual());
    }

    #[test]
    fn test_to_code_emits_setup() {
        use ember_codegen::CoreContext;
        let schema = LoggerComponent.schema().unwrap();
        let mut validated = schema.validate(ConfigValue::empty_map()).unwrap();
        // Resolve the generated id the way the pipeline would.
        let mut used = indexmap::IndexSet::new();
        if let ember_config::ValueKind::Id(id) =
            &mut validated.as_map_mut().unwrap().get_mut("id").unwrap().kind
        {
            id.resolve(&used);
            used.insert("logger_logger".to_string());
        }

        let mut ctx = CoreContext::new("dev", "espressif32", "arduino", "c.yaml", "b");
        let task = LoggerComponent.to_code(validated);
        assert!(matches!(task(&mut ctx).unwrap(), Resume::Done));
        let body: Vec<String> = ctx.main_statements().iter().map(|s| s.to_string()).collect();
        assert!(body.contains(&"logger::Logger *logger_logger = new logger::Logger(115200);".to_string()));
        assert!(body.contains(&"logger_logger->pre_setup();".to_string()));
        assert!(ctx.variables().contains("logger_logger"));
    }
}
