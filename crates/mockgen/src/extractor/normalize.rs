//! URL normalization for extracted endpoints.

use regex::Regex;
use std::sync::OnceLock;

/// Token every template interpolation is replaced with.
pub const PARAM_PLACEHOLDER: &str = ":id";

/// How the URL was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// `'...'` or `"..."`; interpolation markers are not expanded
    Quoted,
    /// JavaScript template literal; `${expr}` is expanded
    Template,
}

static INTERPOLATION_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_interpolation_regex() -> &'static Regex {
    INTERPOLATION_REGEX.get_or_init(|| Regex::new(r"\$\{[^{}`]*\}").unwrap())
}

/// Normalize a URL captured from source.
///
/// - `${expr}` inside template literals becomes [`PARAM_PLACEHOLDER`]
/// - declared path parameters (`{id}`, `{id:\d+}`, `<id>`, `<int:id>`) become `:id`
/// - absolute URLs keep only their path
///
/// Returns `None` when the URL is empty or still carries an interpolation or
/// template marker that could not be resolved.
pub fn normalize_url(raw: &str, kind: LiteralKind) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let expanded = match kind {
        LiteralKind::Template => get_interpolation_regex()
            .replace_all(trimmed, PARAM_PLACEHOLDER)
            .into_owned(),
        LiteralKind::Quoted => trimmed.to_string(),
    };

    if expanded.contains("${")
        || expanded.contains("{{")
        || expanded.contains('`')
        || expanded.chars().any(char::is_whitespace)
    {
        return None;
    }

    let path = strip_origin(&expanded);
    let (path, suffix) = split_query(path);

    let mut segments = Vec::new();
    for segment in path.split('/') {
        segments.push(normalize_segment(segment)?);
    }
    let normalized = format!("{}{}", segments.join("/"), suffix);

    if normalized.is_empty() {
        return None;
    }
    Some(normalized)
}

/// Drop `scheme://host[:port]` from absolute URLs.
fn strip_origin(url: &str) -> &str {
    let rest = if let Some(pos) = url.find("://") {
        &url[pos + 3..]
    } else if let Some(rest) = url.strip_prefix("//") {
        rest
    } else {
        return url;
    };

    match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "/",
    }
}

fn split_query(url: &str) -> (&str, &str) {
    match url.find(|c: char| c == '?' || c == '#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    }
}

/// Rewrite a declared parameter segment to `:name`.
///
/// Returns `None` for a segment that still contains bracket characters after
/// rewriting.
fn normalize_segment(segment: &str) -> Option<String> {
    let param = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        // {id:\d+} (actix) and {id:int} style constraints
        .map(|inner| inner.split(':').next().unwrap_or(inner))
        .or_else(|| {
            segment
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                // <int:id> (Flask) and <path..> (Rocket)
                .map(|inner| inner.rsplit(':').next().unwrap_or(inner))
                .map(|name| name.trim_end_matches('.'))
        });

    let normalized = match param {
        Some(name) if is_identifier(name) => format!(":{name}"),
        Some(_) => return None,
        None => segment.to_string(),
    };

    if normalized.contains(|c: char| matches!(c, '{' | '}' | '<' | '>')) {
        return None;
    }
    Some(normalized)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_interpolation() {
        assert_eq!(
            normalize_url("/users/${id}", LiteralKind::Template).as_deref(),
            Some("/users/:id")
        );
        assert_eq!(
            normalize_url("/users/${user.id}/posts/${postId}", LiteralKind::Template).as_deref(),
            Some("/users/:id/posts/:id")
        );
    }

    #[test]
    fn test_quoted_interpolation_is_dropped() {
        assert_eq!(normalize_url("/users/${id}", LiteralKind::Quoted), None);
        assert_eq!(normalize_url("/users/{{id}}", LiteralKind::Quoted), None);
    }

    #[test]
    fn test_nested_interpolation_is_dropped() {
        assert_eq!(normalize_url("/a/${f({x})}", LiteralKind::Template), None);
    }

    #[test]
    fn test_declared_parameters() {
        assert_eq!(
            normalize_url("/users/{id}", LiteralKind::Quoted).as_deref(),
            Some("/users/:id")
        );
        assert_eq!(
            normalize_url("/users/{id:\\d+}", LiteralKind::Quoted).as_deref(),
            Some("/users/:id")
        );
        assert_eq!(
            normalize_url("/users/<int:user_id>", LiteralKind::Quoted).as_deref(),
            Some("/users/:user_id")
        );
        assert_eq!(
            normalize_url("/files/<path..>", LiteralKind::Quoted).as_deref(),
            Some("/files/:path")
        );
        assert_eq!(
            normalize_url("/users/:id", LiteralKind::Quoted).as_deref(),
            Some("/users/:id")
        );
    }

    #[test]
    fn test_absolute_urls_keep_path() {
        assert_eq!(
            normalize_url("https://api.example.com/v1/users", LiteralKind::Quoted).as_deref(),
            Some("/v1/users")
        );
        assert_eq!(
            normalize_url("http://localhost:8080", LiteralKind::Quoted).as_deref(),
            Some("/")
        );
        assert_eq!(
            normalize_url("//cdn.example.com/a?b=1", LiteralKind::Quoted).as_deref(),
            Some("/a?b=1")
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_url("", LiteralKind::Quoted), None);
        assert_eq!(normalize_url("   ", LiteralKind::Quoted), None);
        assert_eq!(normalize_url("hello world", LiteralKind::Quoted), None);
        assert_eq!(normalize_url("/a/{b", LiteralKind::Quoted), None);
    }
}
