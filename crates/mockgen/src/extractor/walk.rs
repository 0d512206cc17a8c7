//! Workspace traversal and source loading.

use super::{extract_endpoints, Dialect, Endpoint, SourceFile};
use std::path::Path;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Files larger than this are skipped.
pub const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// Directories never descended into.
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "out",
    "build",
    "target",
    ".mockgen",
];

/// Why a file contributed nothing to a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Binary or non-UTF-8 content in {0}")]
    Binary(String),
    #[error("{path} is {size} bytes, over the scan size limit")]
    TooLarge { path: String, size: u64 },
}

/// Load one file for scanning.
///
/// `display_path` is what gets recorded on its occurrences.
pub fn read_source(
    path: &Path,
    display_path: &str,
    dialect: Dialect,
) -> Result<SourceFile, ScanError> {
    let io_err = |source| ScanError::Io {
        path: display_path.to_string(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_FILE_BYTES {
        return Err(ScanError::TooLarge {
            path: display_path.to_string(),
            size,
        });
    }

    let bytes = std::fs::read(path).map_err(io_err)?;
    if bytes.contains(&0) {
        return Err(ScanError::Binary(display_path.to_string()));
    }
    let text = String::from_utf8(bytes).map_err(|_| ScanError::Binary(display_path.to_string()))?;

    Ok(SourceFile::new(display_path, text, dialect))
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Collect every scannable file under `root`, in a stable order.
///
/// Paths are recorded relative to `root` with `/` separators. Unreadable
/// files are skipped.
pub fn collect_sources(root: &Path) -> Vec<SourceFile> {
    let mut sources = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable path during scan: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(dialect) = Dialect::from_path(entry.path()) else {
            continue;
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        match read_source(entry.path(), &relative, dialect) {
            Ok(source) => sources.push(source),
            Err(e) => debug!("Skipping file: {}", e),
        }
    }

    sources
}

/// Scan a project directory and return its deduplicated endpoints.
pub fn scan_workspace(root: &Path) -> Vec<Endpoint> {
    let sources = collect_sources(root);
    let endpoints = extract_endpoints(&sources);
    info!(
        "Scanned {} files under {}, found {} endpoints",
        sources.len(),
        root.display(),
        endpoints.len()
    );
    endpoints
}
