//! Pattern-based endpoint discovery.
//!
//! The extractor is a heuristic scanner, not a parser. Each file is scanned
//! independently with an ordered list of rules for its dialect:
//!
//! - client rules (JavaScript/TypeScript): `fetch`, `axios.<verb>`, calls on
//!   axios instances and aliases, calls inside data-fetching hooks, and calls
//!   on conventionally named API-client objects
//! - server rules: Express routes, actix/axum/Rocket route declarations and
//!   FastAPI/Flask decorators
//!
//! All patterns are compiled with the `regex` crate, whose automata run in
//! time linear in the input, so adversarial source text cannot cause
//! backtracking blowups.
//!
//! ## Module Structure
//!
//! - `aliases`: file-local pre-pass collecting HTTP client aliases
//! - `normalize`: URL cleanup and template-literal normalization
//! - `rules`: the rule tables and their matchers
//! - `walk`: workspace traversal and file loading

mod aliases;
mod normalize;
mod rules;
mod walk;

pub use normalize::{normalize_url, LiteralKind, PARAM_PLACEHOLDER};
pub use walk::{collect_sources, read_source, scan_workspace, ScanError, MAX_FILE_BYTES};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Source dialect, selecting which rule table applies to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// JavaScript and TypeScript, including JSX/TSX
    JavaScript,
    Rust,
    Python,
}

impl Dialect {
    /// Pick the dialect from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => Some(Dialect::JavaScript),
            "rs" => Some(Dialect::Rust),
            "py" => Some(Dialect::Python),
            _ => None,
        }
    }
}

/// One file handed to the extractor.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path as it should be recorded on each occurrence
    pub path: String,
    pub text: String,
    pub dialect: Dialect,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            dialect,
        }
    }
}

/// One recorded HTTP call site or route declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub file: String,
    /// 1-based line of the match start
    pub line: usize,
    /// Normalized URL; may contain `:param` placeholders
    pub url: String,
    /// Uppercase HTTP verb
    pub method: String,
    /// Matched source text
    pub raw_match: String,
}

impl Endpoint {
    /// The `(file, url, method)` triple occurrences are deduplicated by.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.file, &self.url, &self.method)
    }

    /// `file:line`, as shown to users.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Extract endpoints from a batch of files.
///
/// Output order is file order, then rule order, then match position. The
/// first occurrence of each `(file, url, method)` triple wins.
pub fn extract_endpoints(files: &[SourceFile]) -> Vec<Endpoint> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut endpoints = Vec::new();

    for file in files {
        for endpoint in extract_file(file) {
            let (f, u, m) = endpoint.dedup_key();
            if seen.insert((f.to_string(), u.to_string(), m.to_string())) {
                endpoints.push(endpoint);
            }
        }
    }

    endpoints
}

/// Extract all occurrences from a single file, without deduplication.
pub fn extract_file(file: &SourceFile) -> Vec<Endpoint> {
    let aliases = match file.dialect {
        Dialect::JavaScript => aliases::collect_aliases(&file.text),
        _ => aliases::AliasSet::default(),
    };

    let mut endpoints = Vec::new();
    for rule in rules::rules_for(file.dialect) {
        for hit in rule.find(&file.text, &aliases) {
            let Some(url) = normalize_url(&hit.url, hit.kind) else {
                debug!(
                    "Dropping unnormalizable URL {:?} in {} ({})",
                    hit.url,
                    file.path,
                    rule.name()
                );
                continue;
            };
            endpoints.push(Endpoint {
                file: file.path.clone(),
                line: line_at(&file.text, hit.offset),
                url,
                method: hit.method,
                raw_match: hit.raw,
            });
        }
    }

    endpoints
}

/// Convert a byte offset into a 1-based line number.
///
/// `\n`, `\r\n` and a lone `\r` each count as one line break.
pub fn line_at(text: &str, offset: usize) -> usize {
    let bytes = &text.as_bytes()[..offset.min(text.len())];
    let mut line = 1;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => line += 1,
            b'\r' => {
                line += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    line
}
