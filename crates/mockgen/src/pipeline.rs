//! Scan, generate and document a project, reading and writing the artifacts
//! under `.mockgen/`.

use crate::bundle::{build_mock_bundle, read_endpoints, write_endpoints, BundleError, MockBundle};
use crate::config::{ConfigError, DocumentFormat, MockGenConfig, ProjectLayout};
use crate::extractor::{scan_workspace, Endpoint};
use crate::generator::MockGenerator;
use crate::openapi::{build_openapi, OpenApiError};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to create {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    OpenApi(#[from] OpenApiError),
}

fn ensure_layout(layout: &ProjectLayout) -> Result<(), PipelineError> {
    layout
        .ensure_dir()
        .map(|_| ())
        .map_err(|source| PipelineError::Layout {
            path: layout.dir(),
            source,
        })
}

/// Result of a generation step.
#[derive(Debug)]
pub struct Generated<T> {
    pub output: T,
    pub path: PathBuf,
    /// Non-fatal config problem; defaults were used
    pub config_warning: Option<ConfigError>,
}

/// Scan the project and write `endpoints.json`.
pub fn scan(layout: &ProjectLayout) -> Result<Vec<Endpoint>, PipelineError> {
    ensure_layout(layout)?;
    let endpoints = scan_workspace(layout.root());
    let path = layout.endpoints_path();
    write_endpoints(&path, &endpoints)?;
    info!("Wrote {} endpoints to {}", endpoints.len(), path.display());
    Ok(endpoints)
}

/// Endpoints from `endpoints.json`, scanning first if it does not exist.
pub fn load_or_scan(layout: &ProjectLayout) -> Result<Vec<Endpoint>, PipelineError> {
    let path = layout.endpoints_path();
    if path.exists() {
        Ok(read_endpoints(&path)?)
    } else {
        scan(layout)
    }
}

/// Generate `mock.json` from the project's endpoints.
pub fn generate(layout: &ProjectLayout) -> Result<Generated<MockBundle>, PipelineError> {
    let endpoints = load_or_scan(layout)?;
    let (config, config_warning) = MockGenConfig::load_or_init(layout.config_path());

    let mut generator = MockGenerator::new(Some(&config));
    let bundle = build_mock_bundle(&endpoints, &mut generator);
    let path = layout.mock_bundle_path();
    bundle.write(&path)?;
    info!("Wrote {} mock routes to {}", bundle.len(), path.display());

    Ok(Generated {
        output: bundle,
        path,
        config_warning,
    })
}

/// Generate the API description document.
pub fn openapi(
    layout: &ProjectLayout,
    format: DocumentFormat,
) -> Result<Generated<usize>, PipelineError> {
    let endpoints = load_or_scan(layout)?;
    let (config, config_warning) = MockGenConfig::load_or_init(layout.config_path());

    let mut generator = MockGenerator::new(Some(&config));
    let document = build_openapi(&endpoints, &mut generator, config.base_url());
    let path = layout.openapi_path(format);
    document.write(&path, format)?;
    info!(
        "Wrote API document with {} paths to {}",
        document.paths.len(),
        path.display()
    );

    Ok(Generated {
        output: document.paths.len(),
        path,
        config_warning,
    })
}
