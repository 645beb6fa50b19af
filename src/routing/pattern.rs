//! Path pattern parsing.
//!
//! # Grammar
//! - `literal` matches one segment exactly (case-sensitive)
//! - `{name}` matches one segment and captures it as `name`
//! - `*` matches one segment without capturing
//! - `**` (last segment only) matches zero or more remaining segments
//!
//! Empty segments are ignored, so `/a//b/` and `/a/b` are the same pattern.

use std::fmt;

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    catch_all: bool,
}

impl PathPattern {
    /// Parse a pattern, returning a human-readable reason on failure.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err("pattern must start with '/'".to_string());
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut catch_all = false;
        let mut names: Vec<&str> = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            if *part == "**" {
                if i != parts.len() - 1 {
                    return Err("'**' is only allowed as the last segment".to_string());
                }
                catch_all = true;
            } else if *part == "*" {
                segments.push(Segment::Wildcard);
            } else if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty()
                    || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(format!("invalid variable name '{}'", name));
                }
                if names.contains(&name) {
                    return Err(format!("variable '{}' captured twice", name));
                }
                names.push(name);
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}', '*']) {
                return Err(format!("segment '{}' mixes literal text with a wildcard", part));
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            catch_all,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern ends in `**`.
    pub fn is_prefix(&self) -> bool {
        self.catch_all
    }

    /// Number of segments before any `**`.
    pub fn prefix_len(&self) -> usize {
        self.segments.len()
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Canonical form used for uniqueness checks: variable names are erased
    /// because `/u/{id}` and `/u/{name}` match exactly the same paths.
    pub fn normalized(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Param(_) | Segment::Wildcard => out.push('*'),
            }
        }
        if self.catch_all {
            out.push_str("/**");
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split off the next non-empty segment of `path`.
///
/// Returns the segment and the remaining tail (which keeps its leading `/`).
pub(crate) fn next_segment(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.find('/') {
        Some(i) => Some((&trimmed[..i], &trimmed[i..])),
        None => Some((trimmed, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix_pattern() {
        let p = PathPattern::parse("/service01/**").unwrap();
        assert!(p.is_prefix());
        assert_eq!(p.prefix_len(), 1);
        assert_eq!(p.segments(), &[Segment::Literal("service01".into())]);
    }

    #[test]
    fn test_parse_variables() {
        let p = PathPattern::parse("/users/{id}/posts/*").unwrap();
        assert!(!p.is_prefix());
        assert_eq!(p.prefix_len(), 4);
        assert_eq!(p.literal_count(), 2);
        assert_eq!(p.normalized(), "/users/*/posts/*");
    }

    #[test]
    fn test_root_patterns() {
        assert_eq!(PathPattern::parse("/").unwrap().normalized(), "/");
        let all = PathPattern::parse("/**").unwrap();
        assert!(all.is_prefix());
        assert_eq!(all.prefix_len(), 0);
        assert_eq!(all.normalized(), "/**");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(PathPattern::parse("service").is_err());
        assert!(PathPattern::parse("/a/**/b").is_err());
        assert!(PathPattern::parse("/a/{}").is_err());
        assert!(PathPattern::parse("/a/{id}/{id}").is_err());
        assert!(PathPattern::parse("/a/b*").is_err());
    }

    #[test]
    fn test_next_segment() {
        assert_eq!(next_segment("/a/b"), Some(("a", "/b")));
        assert_eq!(next_segment("//a"), Some(("a", "")));
        assert_eq!(next_segment("/"), None);
        assert_eq!(next_segment(""), None);
    }
}
