//! Declarative validator combinators.
//!
//! A validator is a function from an input value to either a validated
//! (possibly re-typed) value or a batch of path-annotated invalidities,
//! plus a structural [`Shape`] for schema extraction. Validators compose:
//! leaves re-type scalars, [`all`]/[`any`] combine, and
//! [`Schema`](map::Schema) validates whole mappings with key descriptors.

mod map;
mod shape;

pub use map::{maybe_simple_value, typed_schema, Schema};
pub use shape::{KeyRequirement, KeyShape, Shape};

use std::sync::Arc;

use crate::error::{Invalid, ValidationErrors};
use crate::ident::Ident;
use crate::lambda::Lambda;
use crate::net::{HexInt, Ipv4, MacAddr};
use crate::time::TimePeriod;
use crate::value::{ConfigValue, PathKey, ValueKind};

type RunFn = Arc<dyn Fn(ConfigValue) -> Result<ConfigValue, ValidationErrors> + Send + Sync>;

/// A composable validation step.
#[derive(Clone)]
pub struct Validator {
    run: RunFn,
    shape: Shape,
}

impl Validator {
    pub fn new(
        shape: Shape,
        run: impl Fn(ConfigValue) -> Result<ConfigValue, ValidationErrors> + Send + Sync + 'static,
    ) -> Self {
        Self {
            run: Arc::new(run),
            shape,
        }
    }

    pub fn validate(&self, value: ConfigValue) -> Result<ConfigValue, ValidationErrors> {
        (self.run)(value)
    }

    /// Structural description, for extraction tooling.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

fn invalid(value: &ConfigValue, message: String) -> ValidationErrors {
    Invalid::new(message).with_range(value.range.clone()).into()
}

/// Accept a string; integers and floats are coerced to their text form.
pub fn string() -> Validator {
    Validator::new(Shape::String, |value| match &value.kind {
        ValueKind::String(_) => Ok(value),
        ValueKind::Int(i) => Ok(ConfigValue::string(i.to_string())),
        ValueKind::Float(f) => Ok(ConfigValue::string(f.to_string())),
        _ => Err(invalid(
            &value,
            format!("expected string, got {}", value.kind_name()),
        )),
    })
}

/// Accept only a string, with no coercion.
pub fn string_strict() -> Validator {
    Validator::new(Shape::StringStrict, |value| match &value.kind {
        ValueKind::String(_) => Ok(value),
        _ => Err(invalid(
            &value,
            format!("expected string (no coercion), got {}", value.kind_name()),
        )),
    })
}

/// Accept a boolean or a common textual spelling of one.
pub fn boolean() -> Validator {
    Validator::new(Shape::Boolean, |value| match &value.kind {
        ValueKind::Bool(_) => Ok(value),
        ValueKind::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "enable" => Ok(ConfigValue::bool(true)),
            "false" | "no" | "off" | "disable" => Ok(ConfigValue::bool(false)),
            _ => Err(invalid(&value, format!("expected boolean, got '{}'", s))),
        },
        _ => Err(invalid(
            &value,
            format!("expected boolean, got {}", value.kind_name()),
        )),
    })
}

fn parse_int(value: &ConfigValue) -> Result<i64, ValidationErrors> {
    match &value.kind {
        ValueKind::Int(i) => Ok(*i),
        ValueKind::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        ValueKind::String(s) => {
            let trimmed = s.trim();
            let parsed = if let Some(hex) = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
            {
                i64::from_str_radix(hex, 16).ok()
            } else {
                trimmed.parse::<i64>().ok()
            };
            parsed.ok_or_else(|| invalid(value, format!("expected integer, got '{}'", s)))
        }
        _ => Err(invalid(
            value,
            format!("expected integer, got {}", value.kind_name()),
        )),
    }
}

/// Accept an integer; integral floats and numeric strings are coerced.
pub fn integer() -> Validator {
    Validator::new(Shape::Integer, |value| {
        parse_int(&value).map(ConfigValue::int)
    })
}

/// Accept a float; integers and numeric strings are coerced.
pub fn float() -> Validator {
    Validator::new(Shape::Float, |value| match &value.kind {
        ValueKind::Float(_) => Ok(value),
        ValueKind::Int(i) => Ok(ConfigValue::float(*i as f64)),
        ValueKind::String(s) => s
            .trim()
            .parse::<f64>()
            .map(ConfigValue::float)
            .map_err(|_| invalid(&value, format!("expected float, got '{}'", s))),
        _ => Err(invalid(
            &value,
            format!("expected float, got {}", value.kind_name()),
        )),
    })
}

/// A non-negative integer.
pub fn positive_int() -> Validator {
    Validator::new(Shape::PositiveInt, |value| {
        let i = parse_int(&value)?;
        if i < 0 {
            return Err(invalid(&value, format!("must not be negative, got {}", i)));
        }
        Ok(ConfigValue::int(i))
    })
}

/// An integer re-typed to render as hexadecimal in emitted code.
pub fn hex_int() -> Validator {
    Validator::new(Shape::HexInt, |value| {
        if let ValueKind::HexInt(_) = value.kind {
            return Ok(value);
        }
        let i = parse_int(&value)?;
        if i < 0 {
            return Err(invalid(
                &value,
                format!("hex integer must not be negative, got {}", i),
            ));
        }
        Ok(ConfigValue::new(ValueKind::HexInt(HexInt(i as u64))))
    })
}

/// Accept one of the enumerated string values.
pub fn one_of(choices: &[&str]) -> Validator {
    one_of_impl(choices, false)
}

/// Accept one of the enumerated string values, ignoring case. The canonical
/// spelling from the choice list replaces the input.
pub fn one_of_ignore_case(choices: &[&str]) -> Validator {
    one_of_impl(choices, true)
}

fn one_of_impl(choices: &[&str], ignore_case: bool) -> Validator {
    let choices: Vec<String> = choices.iter().map(|s| s.to_string()).collect();
    let shape = Shape::OneOf {
        choices: choices.clone(),
        ignore_case,
    };
    Validator::new(shape, move |value| {
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected one of {}, got {}", choices.join(", "), value.kind_name()),
            ));
        };
        let found = choices.iter().find(|c| {
            if ignore_case {
                c.eq_ignore_ascii_case(s)
            } else {
                c.as_str() == s
            }
        });
        match found {
            Some(canonical) => Ok(ConfigValue::string(canonical.clone())),
            None => Err(invalid(
                &value,
                format!("'{}' is not one of {}", s, choices.join(", ")),
            )),
        }
    })
}

/// Map accepted strings to target-language enum expressions.
pub fn enum_map(pairs: &[(&str, &str)]) -> Validator {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let shape = Shape::Enum {
        choices: pairs.iter().map(|(k, _)| k.clone()).collect(),
    };
    Validator::new(shape, move |value| {
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected enum string, got {}", value.kind_name()),
            ));
        };
        // Idempotence: an already-mapped tag passes through.
        if pairs.iter().any(|(_, tag)| tag == s) {
            return Ok(value);
        }
        match pairs.iter().find(|(k, _)| k.eq_ignore_ascii_case(s)) {
            Some((_, tag)) => Ok(ConfigValue::string(tag.clone())),
            None => {
                let options: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                Err(invalid(
                    &value,
                    format!("'{}' is not one of {}", s, options.join(", ")),
                ))
            }
        }
    })
}

/// Inclusive numeric range check over integers and floats.
pub fn range(min: Option<f64>, max: Option<f64>) -> Validator {
    Validator::new(Shape::Range { min, max }, move |value| {
        let Some(n) = value.as_float() else {
            return Err(invalid(
                &value,
                format!("expected number, got {}", value.kind_name()),
            ));
        };
        if let Some(min) = min {
            if n < min {
                return Err(invalid(&value, format!("value {} is below minimum {}", n, min)));
            }
        }
        if let Some(max) = max {
            if n > max {
                return Err(invalid(&value, format!("value {} is above maximum {}", n, max)));
            }
        }
        Ok(value)
    })
}

/// Coerce a scalar or list into a list, validating every element.
///
/// Null becomes the empty list; element errors carry their index in the path.
pub fn ensure_list(inner: Validator) -> Validator {
    let shape = Shape::List(Box::new(inner.shape().clone()));
    Validator::new(shape, move |value| {
        let items = match value.kind {
            ValueKind::Null => Vec::new(),
            ValueKind::List(items) => items,
            _ => vec![value],
        };
        let mut out = Vec::with_capacity(items.len());
        let mut errors = ValidationErrors::new();
        for (i, item) in items.into_iter().enumerate() {
            match inner.validate(item) {
                Ok(v) => out.push(v),
                Err(batch) => {
                    for e in batch.0 {
                        errors.push(e.prepend(PathKey::Index(i)));
                    }
                }
            }
        }
        errors.into_result()?;
        Ok(ConfigValue::list(out))
    })
}

/// Accept a lambda expression.
pub fn lambda() -> Validator {
    Validator::new(Shape::Lambda, |value| match value.kind {
        ValueKind::Lambda(_) => Ok(value),
        ValueKind::String(s) => Ok(ConfigValue::new(ValueKind::Lambda(Lambda::new(s)))),
        _ => Err(invalid(
            &value,
            format!("expected lambda, got {}", value.kind_name()),
        )),
    })
}

/// Accept either a lambda expression or an inner-validated value.
pub fn templatable(inner: Validator) -> Validator {
    let shape = Shape::Templatable(Box::new(inner.shape().clone()));
    Validator::new(shape, move |value| {
        if matches!(value.kind, ValueKind::Lambda(_)) {
            return Ok(value);
        }
        inner.validate(value)
    })
}

/// A time period written like `250ms`, `2.5s`, `1min`, or a bare integer of
/// milliseconds.
pub fn time_period() -> Validator {
    Validator::new(Shape::TimePeriod, |value| {
        if let ValueKind::TimePeriod(_) = value.kind {
            return Ok(value);
        }
        if let Some(i) = value.as_int() {
            if i < 0 {
                return Err(invalid(&value, "time period must not be negative".to_string()));
            }
            return Ok(ConfigValue::new(ValueKind::TimePeriod(
                TimePeriod::from_milliseconds(i),
            )));
        }
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected time period, got {}", value.kind_name()),
            ));
        };
        parse_time_period(s)
            .map(|tp| ConfigValue::new(ValueKind::TimePeriod(tp)))
            .map_err(|msg| invalid(&value, msg))
    })
}

fn parse_time_period(text: &str) -> Result<TimePeriod, String> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| format!("time period '{}' is missing a unit", trimmed))?;
    let (num, unit) = trimmed.split_at(split);
    let quantity: f64 = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid time quantity '{}'", num))?;
    let mut parts = [None, None, None, None, None, None];
    let slot = match unit.trim() {
        "us" => 0,
        "ms" => 1,
        "s" | "sec" => 2,
        "min" => 3,
        "h" => 4,
        "d" => 5,
        other => return Err(format!("unknown time unit '{}'", other)),
    };
    parts[slot] = Some(quantity);
    let [us, ms, s, min, h, d] = parts;
    TimePeriod::new(us, ms, s, min, h, d).map_err(|e| e.to_string())
}

/// An IPv4 address in dotted-decimal notation.
pub fn ipv4() -> Validator {
    Validator::new(Shape::Ipv4, |value| {
        if let ValueKind::Ipv4(_) = value.kind {
            return Ok(value);
        }
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected IPv4 address, got {}", value.kind_name()),
            ));
        };
        Ipv4::parse(s)
            .map(|ip| ConfigValue::new(ValueKind::Ipv4(ip)))
            .map_err(|msg| invalid(&value, msg))
    })
}

/// A MAC address in colon-separated hex notation.
pub fn mac_address() -> Validator {
    Validator::new(Shape::Mac, |value| {
        if let ValueKind::Mac(_) = value.kind {
            return Ok(value);
        }
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected MAC address, got {}", value.kind_name()),
            ));
        };
        MacAddr::parse(s)
            .map(|mac| ConfigValue::new(ValueKind::Mac(mac)))
            .map_err(|msg| invalid(&value, msg))
    })
}

fn valid_ident_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The input must be a textual identifier referring to a declaration of the
/// given target-language type.
pub fn use_id(type_tag: &str) -> Validator {
    let type_tag = type_tag.to_string();
    let shape = Shape::UseId {
        type_tag: type_tag.clone(),
    };
    Validator::new(shape, move |value| {
        if let ValueKind::Id(id) = &value.kind {
            if !id.is_declaration() {
                return Ok(value);
            }
        }
        let Some(s) = value.as_str() else {
            return Err(invalid(
                &value,
                format!("expected id, got {}", value.kind_name()),
            ));
        };
        if !valid_ident_name(s) {
            return Err(invalid(
                &value,
                format!("'{}' is not a valid id (lowercase, digits and underscores)", s),
            ));
        }
        Ok(ConfigValue::ident(Ident::use_site_typed(s, &type_tag)))
    })
}

/// The input introduces a new identifier of the given type. A supplied name
/// is manual and kept verbatim; a missing name is auto-generated later.
pub fn declare_id(type_tag: &str) -> Validator {
    let type_tag = type_tag.to_string();
    let shape = Shape::DeclareId {
        type_tag: type_tag.clone(),
    };
    Validator::new(shape, move |value| {
        if let ValueKind::Id(id) = &value.kind {
            if id.is_declaration() {
                return Ok(value);
            }
        }
        match &value.kind {
            ValueKind::Null => Ok(ConfigValue::ident(Ident::declare(None, &type_tag))),
            ValueKind::String(s) => {
                if !valid_ident_name(s) {
                    return Err(invalid(
                        &value,
                        format!("'{}' is not a valid id (lowercase, digits and underscores)", s),
                    ));
                }
                Ok(ConfigValue::ident(Ident::declare(Some(s), &type_tag)))
            }
            _ => Err(invalid(
                &value,
                format!("expected id, got {}", value.kind_name()),
            )),
        }
    })
}

/// Apply validators in order, feeding each output to the next and
/// short-circuiting on the first invalidity.
pub fn all(validators: Vec<Validator>) -> Validator {
    let shape = Shape::All(validators.iter().map(|v| v.shape().clone()).collect());
    Validator::new(shape, move |mut value| {
        for v in &validators {
            value = v.validate(value)?;
        }
        Ok(value)
    })
}

/// Try validators in order, succeeding on the first valid result. When none
/// succeed, all collected errors are reported.
pub fn any(validators: Vec<Validator>) -> Validator {
    let shape = Shape::Any(validators.iter().map(|v| v.shape().clone()).collect());
    Validator::new(shape, move |value| {
        let mut errors = ValidationErrors::new();
        for v in &validators {
            match v.validate(value.clone()) {
                Ok(out) => return Ok(out),
                Err(batch) => errors.extend(batch),
            }
        }
        Err(errors)
    })
}
