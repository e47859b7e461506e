//! YAML front end.
//!
//! Converts a parsed `serde_yaml` document into the pipeline's value model.
//! The loader is deliberately narrow: it maps the YAML data model onto
//! [`ConfigValue`] and leaves every domain-specific interpretation to the
//! schema engine.

use indexmap::IndexMap;
use serde_yaml::Value;

use ember_config::{ConfigValue, Invalid, ValidationErrors};

/// Convert a YAML value into a [`ConfigValue`] tree.
pub fn from_yaml(value: Value) -> Result<ConfigValue, ValidationErrors> {
    match value {
        Value::Null => Ok(ConfigValue::null()),
        Value::Bool(b) => Ok(ConfigValue::bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ConfigValue::int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(ConfigValue::float(f))
            } else {
                Err(Invalid::new(format!("number out of range: {n}")).into())
            }
        }
        Value::String(s) => Ok(ConfigValue::string(s)),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_yaml(item)?);
            }
            Ok(ConfigValue::list(out))
        }
        Value::Mapping(entries) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                let key = scalar_key(&key)?;
                out.insert(key, from_yaml(entry)?);
            }
            Ok(ConfigValue::map(out))
        }
        Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn scalar_key(key: &Value) -> Result<String, ValidationErrors> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Invalid::new(format!(
            "mapping keys must be scalars, got {other:?}"
        ))
        .into()),
    }
}
