//! Public path patterns.
//!
//! # Responsibilities
//! - Parse `publicPath` values into literal and wildcard segments
//! - Normalize wildcard spellings (`*`, `{name+}`) to one form
//! - Match concrete request paths and capture the wildcard remainder
//!
//! # Design Decisions
//! - Matching is segment-wise and case-sensitive
//! - Empty segments are ignored, so `/a/` and `/a` are the same path
//! - Request segments are percent-decoded before comparison; a segment that
//!   does not decode to UTF-8 is compared as sent
//! - A wildcard consumes at least one segment, like a greedy `{proxy+}`

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Name reported in `pathParameters` for a bare `*` wildcard.
pub const DEFAULT_WILDCARD_NAME: &str = "proxy";

/// Sorts after every character a literal segment can contain.
const WILDCARD_SORT_MARKER: char = char::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path must start with '/'")]
    MissingLeadingSlash,

    #[error("wildcard may only appear as the final segment")]
    WildcardNotFinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Wildcard(String),
}

/// A parsed public path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

/// Result of matching a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Wildcard name and the captured remainder, if the pattern has one.
    pub wildcard: Option<(String, String)>,
}

fn wildcard_name(segment: &str) -> Option<&str> {
    if segment == "*" {
        return Some(DEFAULT_WILDCARD_NAME);
    }
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix("+}"))
        .filter(|name| !name.is_empty())
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            match wildcard_name(part) {
                Some(_) if i + 1 != parts.len() => return Err(PatternError::WildcardNotFinal),
                Some(name) => segments.push(Segment::Wildcard(name.to_string())),
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard(_)))
    }

    /// Canonical spelling with every wildcard written as `*`.
    pub fn normalized(&self) -> String {
        self.render(|_| "*".to_string())
    }

    /// Spelling used in the event's `resource` field (`{proxy+}` style).
    pub fn resource(&self) -> String {
        self.render(|name| format!("{{{}+}}", name))
    }

    /// Key whose lexicographic order puts more specific paths first.
    pub fn specificity_key(&self) -> String {
        self.render(|_| WILDCARD_SORT_MARKER.to_string())
    }

    fn render(&self, wildcard: impl Fn(&str) -> String) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Wildcard(name) => out.push_str(&wildcard(name)),
            }
        }
        out
    }

    /// Match a concrete request path. The wildcard remainder is returned
    /// decoded.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let parts: Vec<Cow<'_, str>> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(i).map(|p| p.as_ref()) != Some(lit.as_str()) {
                        return None;
                    }
                }
                Segment::Wildcard(name) => {
                    if parts.len() <= i {
                        return None;
                    }
                    return Some(PathMatch {
                        wildcard: Some((name.clone(), parts[i..].join("/"))),
                    });
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(PathMatch { wildcard: None })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}
