//! Mapping schemas built from key descriptors.
//!
//! Keys are not plain strings: each one carries its requirement metadata
//! (required, optional with default, generated id, group membership) next
//! to the validator for its value. Unknown keys are rejected unless the
//! schema allows extras. All key errors in one pass are batched so users
//! see every problem at once.

use indexmap::{IndexMap, IndexSet};

use crate::error::{Invalid, ValidationErrors};
use crate::ident::Ident;
use crate::schema::shape::{KeyRequirement, KeyShape, Shape};
use crate::schema::{declare_id, Validator};
use crate::value::{ConfigValue, PathKey, ValueKind};

#[derive(Debug, Clone)]
enum KeyKind {
    Required,
    Optional { default: Option<ConfigValue> },
    GenerateId { type_tag: String },
    Inclusive { group: String },
    Exclusive { group: String, required: bool },
    Conditional { requires: String },
}

#[derive(Clone)]
struct SchemaEntry {
    name: String,
    kind: KeyKind,
    validator: Validator,
}

/// A mapping validator assembled from key descriptors.
#[derive(Clone, Default)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
    allow_extra: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key must be present.
    pub fn required(mut self, name: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Required,
            validator,
        });
        self
    }

    /// The key may be absent.
    pub fn optional(mut self, name: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Optional { default: None },
            validator,
        });
        self
    }

    /// The key may be absent; when it is, the default is inserted.
    pub fn optional_default(
        mut self,
        name: &str,
        validator: Validator,
        default: ConfigValue,
    ) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Optional {
                default: Some(default),
            },
            validator,
        });
        self
    }

    /// The key declares an id of the given type; a missing key produces an
    /// auto-generated declaration.
    pub fn generate_id(mut self, name: &str, type_tag: &str) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::GenerateId {
                type_tag: type_tag.to_string(),
            },
            validator: declare_id(type_tag),
        });
        self
    }

    /// Keys in the same inclusive group must be given together.
    pub fn inclusive(mut self, name: &str, group: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Inclusive {
                group: group.to_string(),
            },
            validator,
        });
        self
    }

    /// At most one key of the same exclusive group may be given.
    pub fn exclusive(mut self, name: &str, group: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Exclusive {
                group: group.to_string(),
                required: false,
            },
            validator,
        });
        self
    }

    /// Exactly one key of the same exclusive group must be given.
    pub fn exclusive_required(mut self, name: &str, group: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Exclusive {
                group: group.to_string(),
                required: true,
            },
            validator,
        });
        self
    }

    /// The key is only allowed while `requires` is also present.
    pub fn conditional(mut self, name: &str, requires: &str, validator: Validator) -> Self {
        self.entries.push(SchemaEntry {
            name: name.to_string(),
            kind: KeyKind::Conditional {
                requires: requires.to_string(),
            },
            validator,
        });
        self
    }

    /// Pass unknown keys through unvalidated instead of rejecting them.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Append another schema's keys to this one.
    pub fn extend(mut self, other: Schema) -> Self {
        self.entries.extend(other.entries);
        self.allow_extra |= other.allow_extra;
        self
    }

    fn shape(&self) -> Shape {
        let keys = self
            .entries
            .iter()
            .map(|e| KeyShape {
                name: e.name.clone(),
                requirement: match &e.kind {
                    KeyKind::Required => KeyRequirement::Required,
                    KeyKind::Optional { default } => KeyRequirement::Optional {
                        has_default: default.is_some(),
                    },
                    KeyKind::GenerateId { type_tag } => KeyRequirement::GeneratedId {
                        type_tag: type_tag.clone(),
                    },
                    KeyKind::Inclusive { group } => KeyRequirement::Inclusive {
                        group: group.clone(),
                    },
                    KeyKind::Exclusive { group, .. } => KeyRequirement::Exclusive {
                        group: group.clone(),
                    },
                    KeyKind::Conditional { requires } => KeyRequirement::Conditional {
                        requires: requires.clone(),
                    },
                },
                value: e.validator.shape().clone(),
            })
            .collect();
        Shape::Map {
            keys,
            allow_extra: self.allow_extra,
        }
    }

    pub fn validate(&self, value: ConfigValue) -> Result<ConfigValue, ValidationErrors> {
        let range = value.range.clone();
        let input = match value.kind {
            // A bare `domain:` stanza is an empty mapping.
            ValueKind::Null => IndexMap::new(),
            ValueKind::Map(m) => m,
            _ => {
                return Err(Invalid::new(format!(
                    "expected mapping, got {}",
                    value.kind_name()
                ))
                .with_range(range)
                .into());
            }
        };

        let mut out: IndexMap<String, ConfigValue> = IndexMap::new();
        let mut errors = ValidationErrors::new();

        // A key that was given but failed validation is still present; it
        // must not also be reported as missing, nor be defaulted over.
        let given: IndexSet<String> = input.keys().cloned().collect();

        for (key, item) in input {
            let Some(entry) = self.entries.iter().find(|e| e.name == key) else {
                if self.allow_extra {
                    out.insert(key, item);
                } else {
                    errors.push(
                        Invalid::new(format!("unknown key '{}'", key))
                            .with_range(item.range.clone())
                            .prepend(PathKey::Key(key.clone())),
                    );
                }
                continue;
            };
            match entry.validator.validate(item) {
                Ok(validated) => {
                    out.insert(key, validated);
                }
                Err(batch) => {
                    for e in batch.0 {
                        errors.push(e.prepend(PathKey::Key(key.clone())));
                    }
                }
            }
        }

        // Missing-key handling: defaults, generated ids, required errors.
        for entry in &self.entries {
            if given.contains(&entry.name) {
                continue;
            }
            match &entry.kind {
                KeyKind::Required => {
                    errors.push(
                        Invalid::new(format!("required key '{}' is missing", entry.name))
                            .with_range(range.clone())
                            .prepend(PathKey::Key(entry.name.clone())),
                    );
                }
                KeyKind::Optional {
                    default: Some(default),
                } => {
                    out.insert(entry.name.clone(), default.clone());
                }
                KeyKind::GenerateId { type_tag } => {
                    out.insert(
                        entry.name.clone(),
                        ConfigValue::ident(Ident::declare(None, type_tag)),
                    );
                }
                _ => {}
            }
        }

        self.check_groups(&out, &range, &mut errors);
        errors.into_result()?;
        Ok(ConfigValue::map(out))
    }

    fn check_groups(
        &self,
        out: &IndexMap<String, ConfigValue>,
        range: &Option<crate::value::DocRange>,
        errors: &mut ValidationErrors,
    ) {
        let mut inclusive: IndexMap<&str, (Vec<&str>, Vec<&str>)> = IndexMap::new();
        let mut exclusive: IndexMap<&str, (Vec<&str>, bool)> = IndexMap::new();

        for entry in &self.entries {
            match &entry.kind {
                KeyKind::Inclusive { group } => {
                    let slot = inclusive.entry(group).or_default();
                    if out.contains_key(&entry.name) {
                        slot.0.push(&entry.name);
                    } else {
                        slot.1.push(&entry.name);
                    }
                }
                KeyKind::Exclusive { group, required } => {
                    let slot = exclusive.entry(group).or_insert((Vec::new(), false));
                    if out.contains_key(&entry.name) {
                        slot.0.push(&entry.name);
                    }
                    slot.1 |= *required;
                }
                KeyKind::Conditional { requires } => {
                    if out.contains_key(&entry.name) && !out.contains_key(requires) {
                        errors.push(
                            Invalid::new(format!(
                                "'{}' can only be used together with '{}'",
                                entry.name, requires
                            ))
                            .with_range(range.clone()),
                        );
                    }
                }
                _ => {}
            }
        }

        for (group, (present, absent)) in inclusive {
            if !present.is_empty() && !absent.is_empty() {
                errors.push(
                    Invalid::new(format!(
                        "keys {} of group '{}' must be given together (missing {})",
                        present.join(", "),
                        group,
                        absent.join(", ")
                    ))
                    .with_range(range.clone()),
                );
            }
        }
        for (group, (present, required)) in exclusive {
            if present.len() > 1 {
                errors.push(
                    Invalid::new(format!(
                        "keys {} of group '{}' are mutually exclusive",
                        present.join(", "),
                        group
                    ))
                    .with_range(range.clone()),
                );
            } else if required && present.is_empty() {
                errors.push(
                    Invalid::new(format!("one key of group '{}' must be given", group))
                        .with_range(range.clone()),
                );
            }
        }
    }

    pub fn into_validator(self) -> Validator {
        let shape = self.shape();
        Validator::new(shape, move |value| self.validate(value))
    }
}

/// Promote a scalar to `{key: input}` before validating with the schema.
pub fn maybe_simple_value(schema: Schema, key: &str) -> Validator {
    let key = key.to_string();
    let shape = schema.shape();
    Validator::new(shape, move |value| {
        let promoted = match &value.kind {
            ValueKind::Map(_) | ValueKind::Null => value,
            _ => {
                let mut map = IndexMap::new();
                map.insert(key.clone(), value);
                ConfigValue::map(map)
            }
        };
        schema.validate(promoted)
    })
}

/// Dispatch on a discriminator field to a per-variant schema.
pub fn typed_schema(variants: Vec<(&str, Schema)>, key: &str) -> Validator {
    let key = key.to_string();
    let variants: Vec<(String, Schema)> = variants
        .into_iter()
        .map(|(name, schema)| (name.to_lowercase(), schema))
        .collect();
    let shape = Shape::TypedDispatch {
        key: key.clone(),
        variants: variants
            .iter()
            .map(|(name, schema)| (name.clone(), schema.shape()))
            .collect(),
    };
    Validator::new(shape, move |value| {
        let range = value.range.clone();
        let Some(map) = value.as_map() else {
            return Err(Invalid::new(format!(
                "expected mapping, got {}",
                value.kind_name()
            ))
            .with_range(range)
            .into());
        };
        let Some(tag_value) = map.get(&key) else {
            return Err(Invalid::new(format!("'{}' is required", key))
                .with_range(range)
                .prepend(PathKey::Key(key.clone()))
                .into());
        };
        let Some(tag) = tag_value.as_str() else {
            return Err(Invalid::new(format!(
                "expected string for '{}', got {}",
                key,
                tag_value.kind_name()
            ))
            .with_range(tag_value.range.clone())
            .prepend(PathKey::Key(key.clone()))
            .into());
        };
        let tag = tag.to_lowercase();
        match variants.iter().find(|(name, _)| *name == tag) {
            Some((_, schema)) => schema.validate(value),
            None => {
                let options: Vec<&str> = variants.iter().map(|(n, _)| n.as_str()).collect();
                Err(Invalid::new(format!(
                    "unknown type '{}'; must be one of {}",
                    tag,
                    options.join(", ")
                ))
                .with_range(range)
                .prepend(PathKey::Key(key.clone()))
                .into())
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{integer, one_of, string};

    fn sample_map(pairs: &[(&str, ConfigValue)]) -> ConfigValue {
        let mut map = IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        ConfigValue::map(map)
    }

    #[test]
    fn test_required_and_default() {
        let schema = Schema::new()
            .required("name", string())
            .optional_default("baud_rate", integer(), ConfigValue::int(115200));

        let out = schema
            .validate(sample_map(&[("name", ConfigValue::string("dev1"))]))
            .unwrap();
        assert_eq!(out.get("name").unwrap().as_str(), Some("dev1"));
        assert_eq!(out.get("baud_rate").unwrap().as_int(), Some(115200));

        let err = schema.validate(ConfigValue::empty_map()).unwrap_err();
        assert!(err.to_string().contains("required key 'name'"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let schema = Schema::new().optional("a", integer());
        let err = schema
            .validate(sample_map(&[("b", ConfigValue::int(1))]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown key 'b'"));

        let lenient = Schema::new().optional("a", integer()).allow_extra();
        assert!(lenient
            .validate(sample_map(&[("b", ConfigValue::int(1))]))
            .is_ok());
    }

    #[test]
    fn test_errors_batched_with_paths() {
        let schema = Schema::new()
            .required("a", integer())
            .required("b", one_of(&["x", "y"]));
        let err = schema
            .validate(sample_map(&[
                ("a", ConfigValue::string("nope")),
                ("b", ConfigValue::string("z")),
            ]))
            .unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert_eq!(err.0[0].path_string(), "a");
        assert_eq!(err.0[1].path_string(), "b");
    }

    #[test]
    fn test_invalid_required_key_not_reported_missing() {
        let schema = Schema::new().required("a", integer());
        let err = schema
            .validate(sample_map(&[("a", ConfigValue::string("nope"))]))
            .unwrap_err();
        assert_eq!(err.0.len(), 1);
        assert_eq!(err.0[0].path_string(), "a");
        assert!(!err.to_string().contains("missing"));
    }

    #[test]
    fn test_missing_key_error_carries_path() {
        let schema = Schema::new().required("ssid", string());
        let err = schema.validate(ConfigValue::empty_map()).unwrap_err();
        assert_eq!(err.0[0].path_string(), "ssid");
    }

    #[test]
    fn test_generate_id_inserted() {
        let schema = Schema::new().generate_id("id", "logger::Logger");
        let out = schema.validate(ConfigValue::null()).unwrap();
        let id = out.get("id").unwrap().as_ident().unwrap();
        assert!(id.is_declaration());
        assert!(!id.is_manual());

        // A supplied name becomes a manual declaration.
        let out = schema
            .validate(sample_map(&[("id", ConfigValue::string("my_log"))]))
            .unwrap();
        let id = out.get("id").unwrap().as_ident().unwrap();
        assert!(id.is_manual());
        assert_eq!(id.name(), Some("my_log"));
    }

    #[test]
    fn test_inclusive_group() {
        let schema = Schema::new()
            .inclusive("static_ip", "manual_ip", string())
            .inclusive("gateway", "manual_ip", string());
        let err = schema
            .validate(sample_map(&[("static_ip", ConfigValue::string("10.0.0.2"))]))
            .unwrap_err();
        assert!(err.to_string().contains("must be given together"));

        assert!(schema
            .validate(sample_map(&[
                ("static_ip", ConfigValue::string("10.0.0.2")),
                ("gateway", ConfigValue::string("10.0.0.1")),
            ]))
            .is_ok());
    }

    #[test]
    fn test_exclusive_group() {
        let schema = Schema::new()
            .exclusive("ssid", "network", string())
            .exclusive("networks", "network", string());
        let err = schema
            .validate(sample_map(&[
                ("ssid", ConfigValue::string("a")),
                ("networks", ConfigValue::string("b")),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_exclusive_required_group() {
        let schema = Schema::new().exclusive_required("pin", "output", integer());
        let err = schema.validate(ConfigValue::empty_map()).unwrap_err();
        assert!(err.to_string().contains("one key of group 'output'"));
    }

    #[test]
    fn test_conditional_key() {
        let schema = Schema::new()
            .optional("fast_connect", integer())
            .conditional("bssid", "fast_connect", string());
        let err = schema
            .validate(sample_map(&[("bssid", ConfigValue::string("x"))]))
            .unwrap_err();
        assert!(err.to_string().contains("together with 'fast_connect'"));
    }

    #[test]
    fn test_validation_idempotent() {
        let schema = Schema::new()
            .required("name", string())
            .optional_default("interval", integer(), ConfigValue::int(60))
            .generate_id("id", "ns::Type");
        let input = sample_map(&[("name", ConfigValue::string("dev"))]);
        let once = schema.validate(input).unwrap();
        let twice = schema.validate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_maybe_simple_value() {
        let schema = Schema::new()
            .required("level", one_of(&["debug", "info"]))
            .optional("baud", integer());
        let v = maybe_simple_value(schema, "level");
        let out = v.validate(ConfigValue::string("debug")).unwrap();
        assert_eq!(out.get("level").unwrap().as_str(), Some("debug"));
    }

    #[test]
    fn test_typed_schema_dispatch() {
        let v = typed_schema(
            vec![
                (
                    "static",
                    Schema::new()
                        .required("type", string())
                        .required("ip", string()),
                ),
                ("dhcp", Schema::new().required("type", string())),
            ],
            "type",
        );
        let out = v
            .validate(sample_map(&[
                ("type", ConfigValue::string("STATIC")),
                ("ip", ConfigValue::string("10.0.0.2")),
            ]))
            .unwrap();
        assert!(out.get("ip").is_some());

        let err = v
            .validate(sample_map(&[("type", ConfigValue::string("magic"))]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown type 'magic'"));
    }
}
