//! Lambda expressions: target-language code with id-references.
//!
//! User-supplied C++ snippets may refer to configured entities through
//! `id(some_name)`. The scanner splits the source into plain-text segments
//! and id-reference segments so the code generator can substitute resolved
//! variable expressions. References inside `//` and `/* */` comments and
//! inside string or character literals are ignored, and `id(...)` embedded
//! in a longer identifier (`valid(x)`) is not a reference.
//!
//! Parsing happens once at construction; replacing the source re-parses.

use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ident::Ident;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LambdaToken {
    /// `id( name )` with an optional trailing `.` for member access.
    #[regex(r"id\(\s*[a-zA-Z_][a-zA-Z0-9_]*\s*\)\.?")]
    IdRef,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    StringLit,

    #[regex(r"'(?:[^'\\\n]|\\.)'")]
    CharLit,

    /// Identifier runs, so `valid(x)` never lexes as `val` + `id(x)`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,

    #[regex(r"[^a-zA-Z_]", priority = 1)]
    Other,
}

/// One piece of a scanned lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaSegment {
    /// Verbatim source text.
    Text(String),
    /// An `id(name)` reference to substitute at generation time.
    IdRef {
        name: String,
        /// True when the reference was written `id(name).` (value access).
        member_access: bool,
    },
}

/// A C++ lambda body plus its scanned id-reference list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    source: String,
    segments: Vec<LambdaSegment>,
    requires: Vec<Ident>,
}

impl Lambda {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let (segments, requires) = scan(&source);
        Self {
            source,
            segments,
            requires,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the source text, re-scanning segments and references.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        let (segments, requires) = scan(&self.source);
        self.segments = segments;
        self.requires = requires;
    }

    pub fn segments(&self) -> &[LambdaSegment] {
        &self.segments
    }

    /// Use-site idents for every `id(name)` reference, in source order.
    pub fn required_ids(&self) -> &[Ident] {
        &self.requires
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn scan(source: &str) -> (Vec<LambdaSegment>, Vec<Ident>) {
    let mut segments = Vec::new();
    let mut requires = Vec::new();
    let mut text = String::new();

    let mut lexer = LambdaToken::lexer(source);
    while let Some(token) = lexer.next() {
        let slice = lexer.slice();
        match token {
            Ok(LambdaToken::IdRef) => {
                if !text.is_empty() {
                    segments.push(LambdaSegment::Text(std::mem::take(&mut text)));
                }
                let member_access = slice.ends_with('.');
                let inner = slice
                    .trim_end_matches('.')
                    .trim_start_matches("id(")
                    .trim_end_matches(')')
                    .trim();
                requires.push(Ident::use_site(inner));
                segments.push(LambdaSegment::IdRef {
                    name: inner.to_string(),
                    member_access,
                });
            }
            // Comments and literals stay verbatim but hide references.
            Ok(_) | Err(_) => text.push_str(slice),
        }
    }
    if !text.is_empty() {
        segments.push(LambdaSegment::Text(text));
    }

    (segments, requires)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(lambda: &Lambda) -> Vec<&str> {
        lambda
            .required_ids()
            .iter()
            .filter_map(|id| id.name())
            .collect()
    }

    #[test]
    fn test_simple_reference() {
        let lambda = Lambda::new("return id(my_sensor)->state;");
        assert_eq!(names(&lambda), vec!["my_sensor"]);
        assert_eq!(
            lambda.segments()[1],
            LambdaSegment::IdRef {
                name: "my_sensor".to_string(),
                member_access: false,
            }
        );
    }

    #[test]
    fn test_member_access_reference() {
        let lambda = Lambda::new("float v = id(supply).voltage;");
        assert_eq!(names(&lambda), vec!["supply"]);
        assert!(matches!(
            &lambda.segments()[1],
            LambdaSegment::IdRef { member_access: true, .. }
        ));
    }

    #[test]
    fn test_reference_in_comment_ignored() {
        let lambda = Lambda::new("// id(ignored)\nreturn id(real);");
        assert_eq!(names(&lambda), vec!["real"]);

        let lambda = Lambda::new("/* id(a) */ id(b)");
        assert_eq!(names(&lambda), vec!["b"]);
    }

    #[test]
    fn test_reference_in_string_ignored() {
        let lambda = Lambda::new(r#"log("id(fake)"); return id(real);"#);
        assert_eq!(names(&lambda), vec!["real"]);
    }

    #[test]
    fn test_embedded_id_is_not_reference() {
        let lambda = Lambda::new("valid(x) + grid(y)");
        assert!(names(&lambda).is_empty());
        assert_eq!(lambda.segments().len(), 1);
    }

    #[test]
    fn test_whitespace_inside_call() {
        let lambda = Lambda::new("id(  spaced_out  )");
        assert_eq!(names(&lambda), vec!["spaced_out"]);
    }

    #[test]
    fn test_set_source_rescans() {
        let mut lambda = Lambda::new("id(first)");
        assert_eq!(names(&lambda), vec!["first"]);
        lambda.set_source("id(second) + id(third)");
        assert_eq!(names(&lambda), vec!["second", "third"]);
        assert_eq!(lambda.source(), "id(second) + id(third)");
    }

    #[test]
    fn test_multiple_references_in_order() {
        let lambda = Lambda::new("id(a) + id(b) * id(c)");
        assert_eq!(names(&lambda), vec!["a", "b", "c"]);
    }
}
