//! OpenAPI 3 document assembly from scanned endpoints.

use crate::bundle::route_pattern;
use crate::config::DocumentFormat;
use crate::extractor::Endpoint;
use crate::generator::MockGenerator;
use crate::schema::{capitalize, ObjectSchema, SchemaNode, SchemaRegistry};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const OPENAPI_VERSION: &str = "3.0.3";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const JSON_MEDIA_TYPE: &str = "application/json";

/// Error responses attached to every operation.
const DEFAULT_ERRORS: &[(u16, &str)] = &[
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (404, "Not Found"),
    (500, "Internal Server Error"),
];

#[derive(Debug, thiserror::Error)]
pub enum OpenApiError {
    #[error("Failed to write API document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode API document as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to encode API document as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: &'static str,
    pub info: Info,
    pub servers: Vec<ServerEntry>,
    /// path -> lowercase method -> operation
    pub paths: BTreeMap<String, BTreeMap<String, Operation>>,
    pub components: Components,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerEntry {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Components {
    pub schemas: SchemaRegistry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    pub schema: ParameterSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub content: BTreeMap<String, MediaType>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseObject {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: SchemaNode,
    pub example: Value,
}

impl OpenApiDocument {
    pub fn schema(&self, name: &str) -> Option<&ObjectSchema> {
        self.components.schemas.get(name)
    }

    pub fn to_json(&self) -> Result<String, OpenApiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, OpenApiError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the document, creating parent directories.
    pub fn write<P: AsRef<Path>>(&self, path: P, format: DocumentFormat) -> Result<(), OpenApiError> {
        let path = path.as_ref();
        let contents = match format {
            DocumentFormat::Json => self.to_json()?,
            DocumentFormat::Yaml => self.to_yaml()?,
        };
        let io_err = |source| OpenApiError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, contents).map_err(io_err)
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Rewrite a route into an OpenAPI path template.
///
/// Numeric segments become `{id}`, `{id2}`, ... and `:name` segments become
/// `{name}`. Returns the path and its parameters in order.
pub fn normalize_path(url: &str) -> (String, Vec<Parameter>) {
    let pattern = route_pattern(url);
    let mut params: Vec<Parameter> = Vec::new();
    let mut segments = Vec::new();

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        let (base, kind) = if segment.bytes().all(|b| b.is_ascii_digit()) {
            ("id", "integer")
        } else if let Some(name) = segment.strip_prefix(':').filter(|n| !n.is_empty()) {
            (name, "string")
        } else {
            segments.push(segment.to_string());
            continue;
        };

        let name = unique_name(base, &params);
        segments.push(format!("{{{name}}}"));
        params.push(Parameter {
            name,
            location: "path",
            required: true,
            schema: ParameterSchema { kind },
        });
    }

    (format!("/{}", segments.join("/")), params)
}

fn unique_name(base: &str, taken: &[Parameter]) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while taken.iter().any(|p| p.name == name) {
        n += 1;
        name = format!("{base}{n}");
    }
    name
}

/// Component name for an endpoint: the last path segment with digit runs
/// replaced by `Id`, camel-cased and capitalized.
pub fn schema_name(url: &str) -> String {
    let pattern = route_pattern(url);
    let last = pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or("root");

    let mut name = String::new();
    for word in last.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut cleaned = String::new();
        let mut in_digits = false;
        for c in word.chars() {
            if c.is_ascii_digit() {
                if !in_digits {
                    cleaned.push_str("Id");
                }
                in_digits = true;
            } else {
                cleaned.push(c);
                in_digits = false;
            }
        }
        name.push_str(&capitalize(&cleaned));
    }

    if name.is_empty() {
        "Root".to_string()
    } else {
        name
    }
}

/// Build the API description for a set of endpoints.
///
/// Each endpoint contributes one operation; its example bodies come from
/// `generator`. Schema names are shared across the whole document, so the
/// first body registered under a name defines that component.
pub fn build_openapi(
    endpoints: &[Endpoint],
    generator: &mut MockGenerator,
    base_url: Option<&str>,
) -> OpenApiDocument {
    let mut schemas = SchemaRegistry::new();
    let mut paths: BTreeMap<String, BTreeMap<String, Operation>> = BTreeMap::new();

    for endpoint in endpoints {
        let (path, parameters) = normalize_path(&endpoint.url);
        let definition = generator.generate(endpoint);
        let name = schema_name(&endpoint.url);
        let method = endpoint.method.to_ascii_lowercase();

        let request_body = matches!(method.as_str(), "post" | "put" | "patch").then(|| {
            let example = definition.body.clone().unwrap_or_else(empty_object);
            RequestBody {
                content: json_content(&mut schemas, example, &format!("{name}Request")),
                required: true,
            }
        });

        let mut responses = BTreeMap::new();
        let status = definition.status.unwrap_or(200);
        responses.insert(
            status.to_string(),
            ResponseObject {
                description: format!("Mocked response for {} {}", endpoint.method, path),
                content: definition
                    .body
                    .clone()
                    .map(|body| json_content(&mut schemas, body, &name)),
            },
        );
        for (code, description) in DEFAULT_ERRORS {
            responses
                .entry(code.to_string())
                .or_insert_with(|| ResponseObject {
                    description: description.to_string(),
                    content: None,
                });
        }

        paths.entry(path.clone()).or_default().insert(
            method,
            Operation {
                summary: format!("{} {}", endpoint.method, path),
                parameters,
                request_body,
                responses,
            },
        );
    }

    let (server_url, server_description) = match base_url {
        Some(url) => (url.to_string(), "Configured base URL"),
        None => (DEFAULT_SERVER_URL.to_string(), "Local Mock Server"),
    };

    OpenApiDocument {
        openapi: OPENAPI_VERSION,
        info: Info {
            title: "MockGen API".to_string(),
            description: "Auto-generated API documentation from MockGen".to_string(),
            version: "1.0.0".to_string(),
        },
        servers: vec![ServerEntry {
            url: server_url,
            description: server_description.to_string(),
        }],
        paths,
        components: Components { schemas },
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn json_content(
    schemas: &mut SchemaRegistry,
    example: Value,
    name: &str,
) -> BTreeMap<String, MediaType> {
    let schema = schemas.infer(&example, name);
    BTreeMap::from([(JSON_MEDIA_TYPE.to_string(), MediaType { schema, example })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockGenConfig;
    use serde_json::json;

    fn endpoint(method: &str, url: &str) -> Endpoint {
        Endpoint {
            file: "src/api.ts".to_string(),
            line: 1,
            url: url.to_string(),
            method: method.to_string(),
            raw_match: String::new(),
        }
    }

    #[test]
    fn test_normalize_path() {
        let (path, params) = normalize_path("/users/123/posts/7");
        assert_eq!(path, "/users/{id}/posts/{id2}");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].schema.kind, "integer");

        let (path, params) = normalize_path("/users/:userId?expand=1");
        assert_eq!(path, "/users/{userId}");
        assert_eq!(params[0].name, "userId");
        assert_eq!(params[0].schema.kind, "string");

        let (path, params) = normalize_path("/");
        assert_eq!(path, "/");
        assert!(params.is_empty());
    }

    #[test]
    fn test_schema_name() {
        assert_eq!(schema_name("/api/users"), "Users");
        assert_eq!(schema_name("/api/users/123"), "Id");
        assert_eq!(schema_name("/api/v2"), "VId");
        assert_eq!(schema_name("/auth/forgot-password"), "ForgotPassword");
        assert_eq!(schema_name("/users/:id"), "Id");
        assert_eq!(schema_name("/"), "Root");
    }

    #[test]
    fn test_build_document() {
        let endpoints = vec![
            endpoint("GET", "/api/users"),
            endpoint("POST", "/api/users"),
            endpoint("DELETE", "/api/users/5"),
        ];
        let mut generator = MockGenerator::with_seed(None, 1);
        let doc = build_openapi(&endpoints, &mut generator, None);

        assert_eq!(doc.openapi, "3.0.3");
        assert_eq!(doc.servers[0].url, DEFAULT_SERVER_URL);

        let users = &doc.paths["/api/users"];
        assert!(users.contains_key("get"));
        let post = &users["post"];
        assert!(post.request_body.is_some());
        assert!(post.responses.contains_key("201"));
        assert!(post.responses.contains_key("500"));
        assert!(doc.schema("Users").is_some());
        assert!(doc.schema("UsersRequest").is_some());

        let delete = &doc.paths["/api/users/{id}"]["delete"];
        assert!(delete.request_body.is_none());
        assert!(delete.responses["204"].content.is_none());
        assert_eq!(delete.parameters[0].name, "id");
    }

    #[test]
    fn test_base_url_and_serialization() {
        let config = MockGenConfig {
            base_url: "https://api.example.com".to_string(),
            ..Default::default()
        };
        let mut generator = MockGenerator::with_seed(Some(&config), 1);
        let doc = build_openapi(&[endpoint("GET", "/health")], &mut generator, config.base_url());

        let value: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["servers"][0]["url"], "https://api.example.com");
        assert_eq!(
            value["paths"]["/health"]["get"]["responses"]["200"]["content"]["application/json"]
                ["schema"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Health"}})
        );
        assert!(value["paths"]["/health"]["get"].get("parameters").is_none());

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("3.0.3"));
    }

    #[test]
    fn test_write_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".mockgen/swagger.yaml");
        let mut generator = MockGenerator::with_seed(None, 1);
        let doc = build_openapi(&[endpoint("GET", "/a")], &mut generator, None);

        doc.write(&path, DocumentFormat::Yaml).unwrap();
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.get("paths").is_some());
    }
}
