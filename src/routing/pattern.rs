//! Path template compilation and matching.
//!
//! # Template Syntax
//! ```text
//! /:name    one required segment of [A-Za-z0-9_-]+, captured as `name`
//! *         one or more of any character, captured by position
//! /*?       optional tail (zero or more characters), captured by position
//! other     literal
//! ```
//!
//! # Design Decisions
//! - Templates without dynamic markers compare by string equality
//! - Dynamic templates compile to one anchored regex
//! - A dynamic match is only declared when captures were produced
//! - Repeated `/` in the subject collapse before matching

use std::fmt;

use regex::{Regex, RegexBuilder};

use super::error::RoutingError;

/// Key of an extracted parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// A `:name` segment.
    Name(String),
    /// The n-th wildcard, counted from 0.
    Index(usize),
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Name(name) => f.write_str(name),
            ParamKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(usize),
    OptionalWildcard(usize),
}

impl Segment {
    fn is_dynamic(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal,
    Dynamic { regex: Regex, keys: Vec<ParamKey> },
}

/// Result of testing a path against a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub is_match: bool,
    /// Raw (still percent-encoded) captures in declaration order.
    pub params: Vec<(ParamKey, String)>,
}

impl MatchResult {
    fn miss() -> Self {
        Self::default()
    }
}

/// An immutable compiled template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    case_insensitive: bool,
    segments: Vec<Segment>,
    matcher: Matcher,
}

impl PathPattern {
    /// Compile `template`.
    pub fn compile(template: &str, case_insensitive: bool) -> Result<Self, RoutingError> {
        let segments = parse_segments(template);

        let matcher = if segments.iter().any(Segment::is_dynamic) {
            let mut source = String::from("^");
            let mut keys = Vec::new();
            for segment in &segments {
                match segment {
                    Segment::Literal(text) => source.push_str(&regex::escape(text)),
                    Segment::Param(name) => {
                        source.push_str("/([A-Za-z0-9_-]+)");
                        keys.push(ParamKey::Name(name.clone()));
                    }
                    Segment::Wildcard(i) => {
                        source.push_str("(.+)");
                        keys.push(ParamKey::Index(*i));
                    }
                    Segment::OptionalWildcard(i) => {
                        source.push_str("/?(.*)");
                        keys.push(ParamKey::Index(*i));
                    }
                }
            }
            source.push('$');

            let regex = RegexBuilder::new(&source)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|source| RoutingError::Pattern {
                    template: template.to_string(),
                    source,
                })?;
            Matcher::Dynamic { regex, keys }
        } else {
            Matcher::Literal
        };

        Ok(Self {
            template: template.to_string(),
            case_insensitive,
            segments,
            matcher,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.matcher, Matcher::Dynamic { .. })
    }

    /// Test `path` (no query component) against this pattern.
    pub fn matches(&self, path: &str) -> MatchResult {
        let path = collapse_separators(path);

        match &self.matcher {
            Matcher::Literal => {
                let hit = if self.case_insensitive {
                    path.to_lowercase() == self.template.to_lowercase()
                } else {
                    path == self.template
                };
                MatchResult {
                    is_match: hit,
                    params: Vec::new(),
                }
            }
            Matcher::Dynamic { regex, keys } => {
                let Some(caps) = regex.captures(&path) else {
                    return MatchResult::miss();
                };
                let params: Vec<(ParamKey, String)> = keys
                    .iter()
                    .enumerate()
                    .filter_map(|(i, key)| {
                        caps.get(i + 1)
                            .map(|m| (key.clone(), m.as_str().to_string()))
                    })
                    .collect();
                MatchResult {
                    is_match: !params.is_empty(),
                    params,
                }
            }
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
            && self.case_insensitive == other.case_insensitive
            && self.segments == other.segments
    }
}

impl Eq for PathPattern {}

/// Collapse runs of `/` into one.
pub fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut wildcards = 0;
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("/:") {
            let len = after.find(|c: char| !is_ident(c)).unwrap_or(after.len());
            if len > 0 {
                flush(&mut literal, &mut segments);
                segments.push(Segment::Param(after[..len].to_string()));
                rest = &after[len..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix("/*?") {
            flush(&mut literal, &mut segments);
            segments.push(Segment::OptionalWildcard(wildcards));
            wildcards += 1;
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix('*') {
            flush(&mut literal, &mut segments);
            segments.push(Segment::Wildcard(wildcards));
            wildcards += 1;
            rest = after;
            continue;
        }
        literal.push(c);
        rest = &rest[c.len_utf8()..];
    }
    flush(&mut literal, &mut segments);
    segments
}
