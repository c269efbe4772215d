//! Path pattern matching.
//!
//! # Responsibilities
//! - Match one request path against one registered pattern
//! - Capture `:name` segments and a trailing `*name` wildcard
//! - Classify patterns as static or dynamic at registration
//!
//! # Design Decisions
//! - Segment-wise comparison after trimming leading/trailing `/`
//! - No percent-decoding and no query handling here
//! - No prefix matching outside the explicit wildcard

use std::collections::HashMap;

/// Returns true if any segment of `pattern` is a `:param` or `*wildcard`.
pub fn is_dynamic(pattern: &str) -> bool {
    segments(pattern).any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

/// Checks a pattern at registration time.
///
/// Rejects empty parameter names and wildcards that are not the final segment.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    let parts: Vec<&str> = segments(pattern).collect();
    for (index, segment) in parts.iter().enumerate() {
        if let Some(name) = segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')) {
            if name.is_empty() {
                return Err(format!("empty parameter name in pattern '{pattern}'"));
            }
        }
        if segment.starts_with('*') && index + 1 != parts.len() {
            return Err(format!("wildcard must be the last segment in pattern '{pattern}'"));
        }
    }
    Ok(())
}

/// Matches `path` against `pattern`, returning the captured parameters.
///
/// A `*name` segment captures the remaining path segments joined by `/` and
/// ends the match immediately. Without a wildcard both sides must have the
/// same number of segments.
pub fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = segments(pattern).collect();
    let path_parts: Vec<&str> = segments(path).collect();
    let mut params = HashMap::new();

    for (index, expected) in pattern_parts.iter().enumerate() {
        let actual = path_parts.get(index)?;

        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), (*actual).to_string());
        } else if let Some(name) = expected.strip_prefix('*') {
            params.insert(name.to_string(), path_parts[index..].join("/"));
            return Some(params);
        } else if expected != actual {
            return None;
        }
    }

    (pattern_parts.len() == path_parts.len()).then_some(params)
}

fn segments(value: &str) -> std::str::Split<'_, char> {
    value.trim_matches('/').split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_capture() {
        let params = match_pattern("/products/:id", "/products/42").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["id"], "42");

        assert!(match_pattern("/products/:id", "/products/42/extra").is_none());
        assert!(match_pattern("/products/:id", "/products").is_none());
    }

    #[test]
    fn test_wildcard_capture() {
        let params = match_pattern("/uploads/*rest", "/uploads/a/b/c").unwrap();
        assert_eq!(params["rest"], "a/b/c");

        let single = match_pattern("/uploads/*rest", "/uploads/a").unwrap();
        assert_eq!(single["rest"], "a");

        // the wildcard needs at least one segment to bind to
        assert!(match_pattern("/uploads/*rest", "/uploads").is_none());
    }

    #[test]
    fn test_literal_segments() {
        assert!(match_pattern("/users/:id/posts", "/users/7/posts").is_some());
        assert!(match_pattern("/users/:id/posts", "/users/7/comments").is_none());
        assert!(match_pattern("/a/b", "a/b/").is_some());
        assert!(match_pattern("/", "/").unwrap().is_empty());
    }

    #[test]
    fn test_no_decoding() {
        let params = match_pattern("/files/:name", "/files/a%20b").unwrap();
        assert_eq!(params["name"], "a%20b");
    }

    #[test]
    fn test_is_dynamic() {
        assert!(is_dynamic("/products/:id"));
        assert!(is_dynamic("/static/*filepath"));
        assert!(!is_dynamic("/products"));
        assert!(!is_dynamic("/"));
        assert!(!is_dynamic("/weird:colon"));
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("/products/:id").is_ok());
        assert!(validate_pattern("/files/*path").is_ok());
        assert!(validate_pattern("/files/:").is_err());
        assert!(validate_pattern("/files/*path/more").is_err());
    }
}
