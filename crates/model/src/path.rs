//! Request path templates with `:placeholder` segments.
//!
//! A template such as `/users/:user_id/comments/:id` is filled from a
//! parameter map. Each placeholder is looked up under its own name and under
//! the leading-underscore alias (`_user_id`); the value used is removed from
//! the map so it is not sent again as a query or body parameter.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use crate::errors::{ResourceError, Result};
use crate::fields::value_to_string;
use crate::types::{is_blank, Params};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template. Placeholders are `:` followed by a letter or `_`,
    /// then `[A-Za-z0-9_]*`; so `:3000` in a URL stays literal.
    pub fn parse(template: impl Into<String>) -> Self {
        let source = template.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            let starts_placeholder = c == ':'
                && chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_');
            if !starts_placeholder {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let mut name = String::new();
            while let Some(n) = chars.peek().copied() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    name.push(n);
                    chars.next();
                } else {
                    break;
                }
            }
            segments.push(Segment::Placeholder(name));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { source, segments }
    }

    /// The template text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Fills every placeholder from `params`, consuming the values used.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Path`] naming the first placeholder with no non-blank
    /// value under either `name` or `_name`.
    pub fn render(&self, params: &mut Params) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = take_value(params, name).ok_or_else(|| ResourceError::Path {
                        parameter: name.clone(),
                        path: self.source.clone(),
                    })?;
                    out.push_str(&escape_segment(&value_to_string(&value)));
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn take_value(params: &mut Params, name: &str) -> Option<Value> {
    let alias = format!("_{name}");
    for key in [name, alias.as_str()] {
        if params.get(key).is_some_and(|v| !is_blank(v)) {
            return params.remove(key);
        }
    }
    None
}

/// Characters escaped inside one path segment (RFC 3986 `pchar` complement,
/// plus `/` and `%`).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encodes one path segment value. Spaces become `%20`, never `+`.
pub fn escape_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Joins a base path and a suffix with exactly one `/` between them.
pub fn join(base: &str, suffix: &str) -> String {
    match (base.ends_with('/'), suffix.starts_with('/')) {
        (true, true) => format!("{base}{}", &suffix[1..]),
        (false, false) if !suffix.is_empty() => format!("{base}/{suffix}"),
        _ => format!("{base}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn renders_and_consumes_placeholders() {
        let template = PathTemplate::parse("/users/:user_id/comments/:id");
        let mut p = params(json!({"user_id": 1, "id": "abc", "approved": true}));
        assert_eq!(template.render(&mut p).unwrap(), "/users/1/comments/abc");
        assert_eq!(Value::Object(p), json!({"approved": true}));
    }

    #[test]
    fn underscore_alias_is_accepted() {
        let template = PathTemplate::parse("/users/:user_id/comments");
        let mut p = params(json!({"_user_id": 4}));
        assert_eq!(template.render(&mut p).unwrap(), "/users/4/comments");
        assert!(p.is_empty());
    }

    #[test]
    fn missing_or_blank_placeholder_is_a_path_error() {
        let template = PathTemplate::parse("/users/:id");
        let err = template.render(&mut Params::new()).unwrap_err();
        assert!(matches!(err, ResourceError::Path { ref parameter, .. } if parameter == "id"));
        let err = template.render(&mut params(json!({"id": null}))).unwrap_err();
        assert!(err.is_path_error());
    }

    #[test]
    fn values_are_escaped() {
        let template = PathTemplate::parse("/search/:term");
        let mut p = params(json!({"term": "a b/c"}));
        assert_eq!(template.render(&mut p).unwrap(), "/search/a%20b%2Fc");
    }

    #[test]
    fn plus_and_unreserved_characters_survive_escaping() {
        assert_eq!(escape_segment("a+b"), "a+b");
        assert_eq!(escape_segment("v1.2-x_y~z"), "v1.2-x_y~z");
        assert_eq!(escape_segment("50%?"), "50%25%3F");
        assert_eq!(escape_segment("café"), "caf%C3%A9");
    }

    #[test]
    fn url_ports_are_not_placeholders() {
        let template = PathTemplate::parse("http://localhost:3000/users/:id");
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn join_normalizes_slashes() {
        assert_eq!(join("/users/1", "/comments"), "/users/1/comments");
        assert_eq!(join("/users/1/", "/comments"), "/users/1/comments");
        assert_eq!(join("/users", "popular"), "/users/popular");
        assert_eq!(join("/users", ""), "/users");
    }
}
