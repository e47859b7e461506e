//! Abstract C++ expressions and statements.
//!
//! Components never concatenate target-language strings directly; they build
//! [`Expression`]s and [`Statement`]s, which the writer serializes. The
//! `Display` forms here define the exact text of generated firmware sources.

use std::fmt;

use ember_config::{HexInt, TimePeriod, TimeUnit};

/// A C++ expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Verbatim target-language text.
    Raw(String),
    /// A string literal, escaped on render.
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    /// `base(arg, arg, ...)`
    Call {
        base: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn raw(text: impl Into<String>) -> Self {
        Expression::Raw(text.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expression::StringLit(text.into())
    }

    pub fn int(i: i64) -> Self {
        Expression::IntLit(i)
    }

    pub fn float(f: f64) -> Self {
        Expression::FloatLit(f)
    }

    pub fn bool(b: bool) -> Self {
        Expression::BoolLit(b)
    }

    pub fn call(base: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            base: base.into(),
            args,
        }
    }

    /// Lower a time period to an integer literal in the given unit.
    pub fn time(period: &TimePeriod, unit: TimeUnit) -> Self {
        Expression::IntLit(period.total_in(unit))
    }

    pub fn hex(value: HexInt) -> Self {
        Expression::Raw(value.to_string())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Raw(text) => write!(f, "{}", text),
            Expression::StringLit(s) => write!(f, "{}", cpp_string_escape(s)),
            Expression::IntLit(i) => {
                // Suffix so large constants keep their width in C++.
                if *i > u32::MAX as i64 {
                    write!(f, "{}ULL", i)
                } else if *i > i32::MAX as i64 {
                    write!(f, "{}UL", i)
                } else if *i < i32::MIN as i64 {
                    write!(f, "{}LL", i)
                } else {
                    write!(f, "{}", i)
                }
            }
            Expression::FloatLit(x) => write!(f, "{:?}f", x),
            Expression::BoolLit(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Expression::Call { base, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", base, rendered.join(", "))
            }
        }
    }
}

/// A statement in the emitted setup body or at file scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Verbatim line(s), no terminator added.
    Raw(String),
    /// An expression terminated with `;`.
    Expression(Expression),
    /// `type name = rhs;` or `type *name = rhs;`
    Declaration {
        type_tag: String,
        pointer: bool,
        name: String,
        rhs: Expression,
    },
    /// `#include "path"` or `#include <path>`; hoisted to the top of the
    /// translation unit by the writer.
    Include { path: String, system: bool },
}

impl Statement {
    pub fn raw(text: impl Into<String>) -> Self {
        Statement::Raw(text.into())
    }

    pub fn expr(expression: Expression) -> Self {
        Statement::Expression(expression)
    }

    pub fn include(path: impl Into<String>) -> Self {
        Statement::Include {
            path: path.into(),
            system: false,
        }
    }

    pub fn include_system(path: impl Into<String>) -> Self {
        Statement::Include {
            path: path.into(),
            system: true,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Raw(text) => write!(f, "{}", text),
            Statement::Expression(e) => write!(f, "{};", e),
            Statement::Declaration {
                type_tag,
                pointer,
                name,
                rhs,
            } => {
                let star = if *pointer { "*" } else { "" };
                write!(f, "{} {}{} = {};", type_tag, star, name, rhs)
            }
            Statement::Include { path, system } => {
                if *system {
                    write!(f, "#include <{}>", path)
                } else {
                    write!(f, "#include \"{}\"", path)
                }
            }
        }
    }
}

/// Escape a string into a C++ double-quoted literal.
///
/// Non-printable and non-ASCII bytes use octal escapes, which are immune to
/// the hex-escape maximal-munch problem when followed by hex digits.
pub fn cpp_string_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for byte in input.as_bytes() {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(*byte as char),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_literal_suffixes() {
        assert_eq!(Expression::int(42).to_string(), "42");
        assert_eq!(Expression::int(3_000_000_000).to_string(), "3000000000UL");
        assert_eq!(Expression::int(5_000_000_000).to_string(), "5000000000ULL");
        assert_eq!(Expression::int(-3_000_000_000).to_string(), "-3000000000LL");
        assert_eq!(Expression::int(-1).to_string(), "-1");
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(Expression::float(0.5).to_string(), "0.5f");
        // Integral floats keep their decimal point; `1f` is not valid C++.
        assert_eq!(Expression::float(1.0).to_string(), "1.0f");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(Expression::string("abc").to_string(), "\"abc\"");
        assert_eq!(
            Expression::string("a\"b\\c\n").to_string(),
            "\"a\\\"b\\\\c\\012\""
        );
    }

    #[test]
    fn test_call_rendering() {
        let call = Expression::call(
            "App.set_name",
            vec![Expression::string("dev1"), Expression::int(2)],
        );
        assert_eq!(call.to_string(), "App.set_name(\"dev1\", 2)");
    }

    #[test]
    fn test_time_lowering() {
        let tp = TimePeriod::from_seconds(2);
        assert_eq!(
            Expression::time(&tp, TimeUnit::Milliseconds).to_string(),
            "2000"
        );
    }

    #[test]
    fn test_statement_rendering() {
        let s = Statement::Declaration {
            type_tag: "logger::Logger".to_string(),
            pointer: true,
            name: "logger_logger".to_string(),
            rhs: Expression::call("new logger::Logger", vec![Expression::int(115200)]),
        };
        assert_eq!(
            s.to_string(),
            "logger::Logger *logger_logger = new logger::Logger(115200);"
        );

        assert_eq!(
            Statement::expr(Expression::call("App.setup", vec![])).to_string(),
            "App.setup();"
        );
        assert_eq!(
            Statement::include("defines.h").to_string(),
            "#include \"defines.h\""
        );
        assert_eq!(
            Statement::include_system("vector").to_string(),
            "#include <vector>"
        );
    }
}
