// Library exports for the mockgen binary and integration tests

// ===== Discovery =====
pub mod extractor;

// ===== Mock synthesis =====
pub mod generator;
pub mod openapi;
pub mod schema;

// ===== Persisted artifacts =====
pub mod bundle;
pub mod config;
pub mod pipeline;

// ===== Mock server =====
pub mod server;

pub use bundle::{BundleError, EndpointRecord, MockBundle, ResponseDefinition};
pub use config::{ConfigError, MockGenConfig, ProjectLayout};
pub use extractor::{extract_endpoints, scan_workspace, Dialect, Endpoint, SourceFile};
pub use generator::MockGenerator;
pub use server::{MockServer, ServerError, ServerOptions, ServerStatus};
