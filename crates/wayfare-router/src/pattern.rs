//! Path pattern compilation and matching.

use std::mem;

use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// Matches exactly one path segment.
const SEGMENT: &str = "([^/]+)";
/// Matches the remainder of the path, slashes included.
const WILDCARD: &str = "(.*)";
const TRAILING_SLASH: &str = "/?";

/// A piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Literal text, matched verbatim.
    Literal(String),
    /// A `:name` parameter (one path segment).
    Param(String),
    /// A `:name*` parameter (rest of the path).
    Wildcard(String),
}

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
    /// Whether a trailing `/` is tolerated.
    trailing_slash: bool,
}

impl PathPattern {
    /// Compiles a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Parameter, matches a single path segment
    /// - `/files/:path*` - Wildcard parameter, matches the rest of the path
    ///
    /// A parameter name runs until the next `/` or the end of the pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use wayfare_router::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/posts/:id/comments/:comment_id", false).unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn compile(pattern: &str, trailing_slash: bool) -> Result<Self> {
        let mut segments = Vec::new();
        let mut param_names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            if c != ':' {
                literal.push(c);
                continue;
            }

            let mut name = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if next == '/' {
                    break;
                }
                name.push(next);
                chars.next();
            }

            let (name, wildcard) = match name.strip_suffix('*') {
                Some(stripped) => (stripped.to_string(), true),
                None => (name, false),
            };

            if name.is_empty() {
                return Err(RouterError::EmptyParameterName {
                    pattern: pattern.to_string(),
                    position,
                });
            }

            if let Some(first) = param_names.iter().position(|k| *k == name) {
                return Err(RouterError::DuplicateParameterKey {
                    pattern: pattern.to_string(),
                    key: name,
                    first: first + 1,
                    second: param_names.len() + 1,
                });
            }

            if !literal.is_empty() {
                segments.push(PathSegment::Literal(mem::take(&mut literal)));
            }
            param_names.push(name.clone());
            segments.push(if wildcard {
                PathSegment::Wildcard(name)
            } else {
                PathSegment::Param(name)
            });
        }

        if !literal.is_empty() {
            segments.push(PathSegment::Literal(literal));
        }

        let mut regex_str = String::from("^");
        for segment in &segments {
            match segment {
                PathSegment::Literal(s) => regex_str.push_str(&regex::escape(s)),
                PathSegment::Param(_) => regex_str.push_str(SEGMENT),
                PathSegment::Wildcard(_) => regex_str.push_str(WILDCARD),
            }
        }
        if trailing_slash {
            regex_str.push_str(TRAILING_SLASH);
        }
        regex_str.push('$');

        let regex = Regex::new(&regex_str).map_err(|source| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            param_names,
            trailing_slash,
        })
    }

    /// Attempts to match an escaped request path against this pattern.
    ///
    /// Returns extracted parameters if the path matches. Patterns without
    /// parameters are compared by string equality before the regex runs.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        if self.is_literal() && self.pattern == path {
            return Some(PathParams::new());
        }

        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();
        for (name, value) in self.param_names.iter().zip(caps.iter().skip(1)) {
            if let Some(value) = value {
                params.insert(name.clone(), value.as_str());
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names in the order they appear.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns `true` if the pattern has no parameters.
    pub fn is_literal(&self) -> bool {
        self.param_names.is_empty()
    }

    /// Returns `true` if a trailing `/` is tolerated.
    pub fn trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// The generated matcher expression.
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }
}
