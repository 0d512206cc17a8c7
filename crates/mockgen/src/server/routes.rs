//! Route table built from a mock bundle, and path matching.
//!
//! Matching is segment-wise: a pattern matches a path when both have the
//! same number of non-empty segments and each pattern segment is either a
//! `:param` or textually equal to the path segment. The table is searched in
//! bundle order and the first match wins, so `/a/:x` listed before `/a/b`
//! shadows it.

use crate::bundle::{split_route_key, MockBundle, ResponseDefinition};

/// Prefix marking a parameter segment in a route pattern.
pub const PARAM_MARKER: char = ':';

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Whether `pattern` matches the request `path`.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = segments(pattern);
    let mut path_segments = segments(path);
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p.starts_with(PARAM_MARKER) || p == s => continue,
            _ => return false,
        }
    }
}

/// Percent-decode a request path and drop empty segments, so `/todos/`
/// and `//todos` both become `/todos`. Undecodable input is used as-is.
///
/// The result keys the state store as well as matching, so every spelling
/// of a path that matches a route shares one log.
pub fn normalize_request_path(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    format!("/{}", segments(&decoded).collect::<Vec<_>>().join("/"))
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// Key as written in the bundle
    pub key: String,
    /// Pattern matched against request paths
    pub pattern: String,
    pub definition: ResponseDefinition,
}

impl Route {
    pub fn new(key: impl Into<String>, definition: ResponseDefinition) -> Self {
        let key = key.into();
        let pattern = split_route_key(&key).1.to_string();
        Self {
            key,
            pattern,
            definition,
        }
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.definition.method.eq_ignore_ascii_case(method) && pattern_matches(&self.pattern, path)
    }
}

/// Ordered list of routes; order is match priority.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Build a table preserving the bundle's key order.
    pub fn from_bundle(bundle: &MockBundle) -> Self {
        Self::new(
            bundle
                .entries()
                .iter()
                .map(|(key, definition)| Route::new(key.clone(), definition.clone()))
                .collect(),
        )
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route matching the method and path.
    pub fn find(&self, method: &str, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }

    /// First stateful route whose pattern matches the path, for any method.
    pub fn find_stateful(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.definition.stateful && pattern_matches(&route.pattern, path))
    }
}
