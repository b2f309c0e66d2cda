//! Route pattern fragments.
//!
//! Every node in a chained route owns a pattern fragment. A chain matches a
//! request path when the fragments from root to endpoint, matched one after
//! another, consume every path segment.

use crate::params::Params;
use thiserror::Error;

/// Kind of a pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "user", "edit")
    Static,
    /// Named parameter (e.g., "{id}")
    Param(String),
    /// Catch-all wildcard (e.g., "*path"), always the last segment
    Wildcard(String),
}

/// One segment of a pattern fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// The segment as written in the pattern
    pub raw: String,
    /// What the segment matches
    pub kind: SegmentKind,
}

/// Errors raised while parsing a pattern fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A `{}` or `*` segment without a name.
    #[error("empty parameter name in pattern '{pattern}'")]
    EmptyParamName {
        /// The offending pattern.
        pattern: String,
    },

    /// A segment with unbalanced or embedded braces.
    #[error("invalid segment '{segment}' in pattern '{pattern}'")]
    InvalidSegment {
        /// The offending pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
    },

    /// A wildcard segment followed by further segments.
    #[error("wildcard must be the last segment in pattern '{pattern}'")]
    WildcardNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// The same parameter name used twice.
    #[error("parameter '{name}' appears twice in pattern '{pattern}'")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated parameter name.
        name: String,
    },
}

/// A parsed pattern fragment such as `user/{id}` or `files/*path`.
///
/// # Example
///
/// ```rust
/// use sigroute_router::{split_path, Params, Pattern};
///
/// let pattern = Pattern::parse("user/{id}").unwrap();
/// let path = split_path("/user/42/edit");
/// let mut params = Params::new();
///
/// let next = pattern.match_at(&path, 0, &mut params);
/// assert_eq!(next, Some(2));
/// assert_eq!(params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses a pattern fragment. Leading, trailing and repeated slashes are
    /// ignored, so `""`, `"/"` and `"//"` all parse to the empty pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let mut segments: Vec<Segment> = Vec::new();

        for part in split_path(raw) {
            if segments
                .last()
                .is_some_and(|s| matches!(s.kind, SegmentKind::Wildcard(_)))
            {
                return Err(PatternError::WildcardNotLast {
                    pattern: raw.to_string(),
                });
            }

            let kind = if let Some(inner) = part.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .ok_or_else(|| invalid_segment(raw, part))?;
                if name.contains(['{', '}']) {
                    return Err(invalid_segment(raw, part));
                }
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                SegmentKind::Wildcard(name.to_string())
            } else if part.contains(['{', '}']) {
                return Err(invalid_segment(raw, part));
            } else {
                SegmentKind::Static
            };

            if let SegmentKind::Param(name) | SegmentKind::Wildcard(name) = &kind {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName {
                        pattern: raw.to_string(),
                    });
                }
                if segments.iter().any(|s| s.param_name() == Some(name)) {
                    return Err(PatternError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
            }

            segments.push(Segment {
                raw: part.to_string(),
                kind,
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern consumes no path segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if the pattern ends in a catch-all wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .last()
            .is_some_and(|s| matches!(s.kind, SegmentKind::Wildcard(_)))
    }

    /// Returns the names of the parameters this pattern binds, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::param_name).map(String::as_str)
    }

    /// Matches the pattern against `path` starting at segment `offset`.
    ///
    /// On success returns the offset just past the consumed segments and
    /// leaves the bound parameters in `params`. On failure returns `None` and
    /// `params` is left exactly as it was.
    pub fn match_at(&self, path: &[&str], offset: usize, params: &mut Params) -> Option<usize> {
        let mark = params.len();
        let mut cursor = offset;

        for segment in &self.segments {
            match &segment.kind {
                SegmentKind::Static => {
                    if path.get(cursor) != Some(&segment.raw.as_str()) {
                        params.truncate(mark);
                        return None;
                    }
                    cursor += 1;
                }
                SegmentKind::Param(name) => {
                    let Some(value) = path.get(cursor) else {
                        params.truncate(mark);
                        return None;
                    };
                    params.push(name.clone(), *value);
                    cursor += 1;
                }
                SegmentKind::Wildcard(name) => {
                    if cursor >= path.len() {
                        params.truncate(mark);
                        return None;
                    }
                    params.push(name.clone(), path[cursor..].join("/"));
                    cursor = path.len();
                }
            }
        }

        Some(cursor)
    }
}

impl Segment {
    /// Returns the parameter name for param and wildcard segments.
    #[must_use]
    pub fn param_name(&self) -> Option<&String> {
        match &self.kind {
            SegmentKind::Static => None,
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Splits a request path into its non-empty segments.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn invalid_segment(pattern: &str, segment: &str) -> PatternError {
    PatternError::InvalidSegment {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    }
}
