//! Persisted artifacts: the endpoints bundle and the mock bundle.
//!
//! Both are pretty-printed JSON under `.mockgen/`. The mock bundle is a JSON
//! object whose key order is significant, so it is kept as an ordered list of
//! `(route key, definition)` pairs rather than a map.

use crate::extractor::Endpoint;
use crate::generator::MockGenerator;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Methods recognized as a `"METHOD pattern"` route key prefix.
const ROUTE_KEY_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Errors reading or writing a bundle file.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to access bundle {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed bundle {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| BundleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    let io_err = |source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| BundleError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}

// ============================================================================
// Endpoints bundle
// ============================================================================

/// One endpoint as persisted in `endpoints.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub file: String,
    pub line: usize,
    pub url: String,
    pub method: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl From<&Endpoint> for EndpointRecord {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            file: endpoint.file.clone(),
            line: endpoint.line,
            url: endpoint.url.clone(),
            method: endpoint.method.clone(),
            location: endpoint.location(),
            raw: Some(endpoint.raw_match.clone()),
        }
    }
}

impl EndpointRecord {
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint {
            file: self.file.clone(),
            line: self.line,
            url: self.url.clone(),
            method: self.method.clone(),
            raw_match: self.raw.clone().unwrap_or_default(),
        }
    }
}

/// Records for `endpoints.json`, sorted by file, line, method and URL.
pub fn endpoint_records(endpoints: &[Endpoint]) -> Vec<EndpointRecord> {
    let mut records: Vec<EndpointRecord> = endpoints.iter().map(EndpointRecord::from).collect();
    records.sort_by(|a, b| {
        (&a.file, a.line, &a.method, &a.url).cmp(&(&b.file, b.line, &b.method, &b.url))
    });
    records
}

pub fn write_endpoints<P: AsRef<Path>>(path: P, endpoints: &[Endpoint]) -> Result<(), BundleError> {
    write_json(path.as_ref(), &endpoint_records(endpoints))
}

pub fn read_endpoints<P: AsRef<Path>>(path: P) -> Result<Vec<Endpoint>, BundleError> {
    let records: Vec<EndpointRecord> = read_json(path.as_ref())?;
    Ok(records.iter().map(EndpointRecord::to_endpoint).collect())
}

// ============================================================================
// Response definitions
// ============================================================================

fn default_method() -> String {
    "GET".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Canned response for one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDefinition {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// One is picked at random per request. Each entry is either a bare body
    /// or a `{status, headers, body}` object.
    #[serde(default, alias = "responses", skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Value>>,
    /// Mutations accumulate rendered bodies that later reads replay
    #[serde(default, skip_serializing_if = "is_false")]
    pub stateful: bool,
}

impl ResponseDefinition {
    pub fn new(method: impl Into<String>, status: u16) -> Self {
        Self {
            method: method.into(),
            status: Some(status),
            headers: None,
            body: None,
            alternatives: None,
            stateful: false,
        }
    }

    pub fn with_json_body(mut self, body: Value) -> Self {
        self.headers = Some(json_headers());
        self.body = Some(body);
        self
    }

    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }
}

/// `content-type: application/json`
pub fn json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("content-type".to_string(), "application/json".to_string())])
}

// ============================================================================
// Mock bundle
// ============================================================================

/// Strip any query string or fragment from a URL to get its route pattern.
pub fn route_pattern(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Split a bundle key into an optional method prefix and the route pattern.
///
/// `"POST /users"` gives `(Some("POST"), "/users")`; `"/users"` gives
/// `(None, "/users")`.
pub fn split_route_key(key: &str) -> (Option<&str>, &str) {
    if let Some((method, pattern)) = key.split_once(' ') {
        if ROUTE_KEY_METHODS.contains(&method) {
            return (Some(method), pattern.trim_start());
        }
    }
    (None, key)
}

/// Ordered mapping from route key to response definition, as stored in
/// `mock.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockBundle {
    entries: Vec<(String, ResponseDefinition)>,
}

impl MockBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(String, ResponseDefinition)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ResponseDefinition> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, definition)| definition)
    }

    /// Append a raw entry. A duplicate key replaces the earlier value in place,
    /// matching JSON object semantics.
    pub fn push(&mut self, key: impl Into<String>, definition: ResponseDefinition) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = definition,
            None => self.entries.push((key, definition)),
        }
    }

    /// Insert a definition for a route pattern.
    ///
    /// The first definition for a pattern is keyed by the bare pattern; a
    /// different method for the same pattern is keyed `"METHOD pattern"`.
    /// Returns the key used, or `None` when the pattern already has a
    /// definition for this method.
    pub fn insert_route(&mut self, pattern: &str, definition: ResponseDefinition) -> Option<String> {
        let taken = self.entries.iter().any(|(key, existing)| {
            split_route_key(key).1 == pattern && existing.method == definition.method
        });
        if taken {
            return None;
        }

        let key = if self.get(pattern).is_none() {
            pattern.to_string()
        } else {
            format!("{} {}", definition.method, pattern)
        };
        self.entries.push((key.clone(), definition));
        Some(key)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        read_json(path.as_ref())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), BundleError> {
        write_json(path.as_ref(), self)
    }
}

impl Serialize for MockBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, definition) in &self.entries {
            map.serialize_entry(key, definition)?;
        }
        map.end()
    }
}

struct MockBundleVisitor;

impl<'de> Visitor<'de> for MockBundleVisitor {
    type Value = MockBundle;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping route patterns to response definitions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MockBundle, A::Error> {
        let mut bundle = MockBundle::new();
        while let Some((key, definition)) = access.next_entry::<String, ResponseDefinition>()? {
            bundle.push(key, definition);
        }
        Ok(bundle)
    }
}

impl<'de> Deserialize<'de> for MockBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MockBundleVisitor)
    }
}

/// Generate one definition per endpoint, in endpoint order.
pub fn build_mock_bundle(endpoints: &[Endpoint], generator: &mut MockGenerator) -> MockBundle {
    let mut bundle = MockBundle::new();
    for endpoint in endpoints {
        let pattern = route_pattern(&endpoint.url);
        let definition = generator.generate(endpoint);
        if bundle.insert_route(&pattern, definition).is_none() {
            debug!(
                "Skipping duplicate route {} {} from {}",
                endpoint.method,
                pattern,
                endpoint.location()
            );
        }
    }
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint(file: &str, line: usize, method: &str, url: &str) -> Endpoint {
        Endpoint {
            file: file.to_string(),
            line,
            url: url.to_string(),
            method: method.to_string(),
            raw_match: format!("{method} {url}"),
        }
    }

    #[test]
    fn test_bundle_preserves_key_order() {
        let json = r#"{
            "/z": {"method": "GET", "body": 1},
            "/a": {"method": "GET", "body": 2},
            "/m": {"method": "POST", "status": 201}
        }"#;
        let bundle: MockBundle = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = bundle.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["/z", "/a", "/m"]);

        let reserialized = serde_json::to_string(&bundle).unwrap();
        let z = reserialized.find("/z").unwrap();
        let a = reserialized.find("/a").unwrap();
        assert!(z < a);
    }

    #[test]
    fn test_definition_defaults_and_alias() {
        let json = r#"{"/x": {"responses": [{"ok": true}], "stateful": true}}"#;
        let bundle: MockBundle = serde_json::from_str(json).unwrap();
        let definition = bundle.get("/x").unwrap();
        assert_eq!(definition.method, "GET");
        assert_eq!(definition.status, None);
        assert_eq!(definition.alternatives, Some(vec![json!({"ok": true})]));
        assert!(definition.stateful);
    }

    #[test]
    fn test_definition_serialization_omits_empty_fields() {
        let definition = ResponseDefinition::new("DELETE", 204);
        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value, json!({"method": "DELETE", "status": 204}));
    }

    #[test]
    fn test_insert_route_collisions() {
        let mut bundle = MockBundle::new();
        assert_eq!(
            bundle.insert_route("/users", ResponseDefinition::new("GET", 200)),
            Some("/users".to_string())
        );
        assert_eq!(
            bundle.insert_route("/users", ResponseDefinition::new("POST", 201)),
            Some("POST /users".to_string())
        );
        assert_eq!(
            bundle.insert_route("/users", ResponseDefinition::new("GET", 200)),
            None
        );
        assert_eq!(
            bundle.insert_route("/users", ResponseDefinition::new("POST", 201)),
            None
        );
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_split_route_key() {
        assert_eq!(split_route_key("POST /users"), (Some("POST"), "/users"));
        assert_eq!(split_route_key("/users"), (None, "/users"));
        assert_eq!(split_route_key("post /users"), (None, "post /users"));
    }

    #[test]
    fn test_route_pattern() {
        assert_eq!(route_pattern("/users?page=1"), "/users");
        assert_eq!(route_pattern("/users#top"), "/users");
        assert_eq!(route_pattern("?x=1"), "/");
    }

    #[test]
    fn test_endpoint_records_sorted() {
        let endpoints = vec![
            endpoint("b.ts", 1, "GET", "/b"),
            endpoint("a.ts", 9, "GET", "/z"),
            endpoint("a.ts", 2, "POST", "/y"),
            endpoint("a.ts", 2, "GET", "/y"),
        ];
        let records = endpoint_records(&endpoints);
        let order: Vec<_> = records
            .iter()
            .map(|r| (r.file.as_str(), r.line, r.method.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("a.ts", 2, "GET"), ("a.ts", 2, "POST"), ("a.ts", 9, "GET"), ("b.ts", 1, "GET")]
        );
        assert_eq!(records[0].location, "a.ts:2");
    }

    #[test]
    fn test_endpoints_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".mockgen/endpoints.json");
        let endpoints = vec![endpoint("src/api.ts", 3, "GET", "/api/users")];

        write_endpoints(&path, &endpoints).unwrap();
        assert_eq!(read_endpoints(&path).unwrap(), endpoints);
    }

    #[test]
    fn test_malformed_bundle_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            MockBundle::from_file(&path),
            Err(BundleError::Parse { .. })
        ));
        assert!(matches!(
            MockBundle::from_file(dir.path().join("missing.json")),
            Err(BundleError::Io { .. })
        ));
    }
}
