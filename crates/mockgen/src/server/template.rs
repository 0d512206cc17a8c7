//! Placeholder substitution for stateful response bodies.
//!
//! # Supported Placeholders
//!
//! - `{{auto}}` - next value of the server's autoincrement sequence
//! - `{{body.<path>}}` - field of the parsed request body, by dotted path
//!   (`{{body.user.name}}`, `{{body.items.0}}`)
//!
//! Placeholders are replaced inside every string of the template, through
//! nested arrays and objects. All `{{auto}}` occurrences in one rendered body
//! share a single id. A missing request field renders as `null`.
//!
//! # Example
//!
//! ```json
//! {"id": "{{auto}}", "from": "{{body.name}}"}
//! ```

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::warn;

/// Regex for `{{ ... }}` placeholders
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").unwrap())
}

const OPEN_MARKER: &str = "{{";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Malformed placeholder in {0:?}")]
    Malformed(String),
    #[error("Unknown placeholder {{{{{0}}}}}")]
    UnknownPlaceholder(String),
}

/// Autoincrement id source owned by one server instance.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn new(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    #[cfg(test)]
    pub(crate) fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder<'a> {
    Auto,
    /// Dotted path below `body`; empty for the whole body
    Body(&'a str),
}

fn parse_placeholder(inner: &str) -> Result<Placeholder<'_>, TemplateError> {
    if inner == "auto" {
        return Ok(Placeholder::Auto);
    }
    let path = match inner.strip_prefix("body") {
        Some("") => return Ok(Placeholder::Body("")),
        Some(rest) => rest.strip_prefix('.'),
        None => None,
    };
    match path {
        Some(path) if !path.is_empty() && path.split('.').all(is_path_segment) => {
            Ok(Placeholder::Body(path))
        }
        _ => Err(TemplateError::UnknownPlaceholder(inner.to_string())),
    }
}

fn is_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$')
}

/// Walk the template, validating every placeholder. Returns whether
/// `{{auto}}` occurs anywhere.
fn check(template: &Value) -> Result<bool, TemplateError> {
    match template {
        Value::String(s) => {
            let mut uses_auto = false;
            for caps in get_placeholder_regex().captures_iter(s) {
                uses_auto |= parse_placeholder(&caps[1])? == Placeholder::Auto;
            }
            if get_placeholder_regex().replace_all(s, "").contains(OPEN_MARKER) {
                return Err(TemplateError::Malformed(s.clone()));
            }
            Ok(uses_auto)
        }
        Value::Array(items) => items
            .iter()
            .try_fold(false, |acc, item| Ok(check(item)? || acc)),
        Value::Object(object) => object
            .values()
            .try_fold(false, |acc, item| Ok(check(item)? || acc)),
        _ => Ok(false),
    }
}

fn lookup<'v>(request: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(request);
    }
    path.split('.').try_fold(request, |value, segment| match value {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_value(template: &Value, request: &Value, id: Option<u64>) -> Value {
    match template {
        Value::String(s) => {
            let rendered = get_placeholder_regex().replace_all(s, |caps: &Captures| {
                match parse_placeholder(&caps[1]) {
                    Ok(Placeholder::Auto) => id.map(|id| id.to_string()).unwrap_or_default(),
                    Ok(Placeholder::Body(path)) => field_text(lookup(request, path)),
                    Err(_) => caps[0].to_string(),
                }
            });
            Value::String(rendered.into_owned())
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, request, id))
                .collect(),
        ),
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, item)| (key.clone(), render_value(item, request, id)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render a body template against a parsed request body.
///
/// The template is validated before any id is drawn, so a failed render does
/// not consume one.
pub fn render_template(
    template: &Value,
    request: &Value,
    ids: &IdSequence,
) -> Result<Value, TemplateError> {
    let uses_auto = check(template)?;
    let id = uses_auto.then(|| ids.next_id());
    Ok(render_value(template, request, id))
}

/// Render a template, falling back to the unrendered template on error.
pub fn render_or_fallback(template: &Value, request: &Value, ids: &IdSequence) -> Value {
    render_template(template, request, ids).unwrap_or_else(|e| {
        warn!("Template render failed, serving it unrendered: {}", e);
        template.clone()
    })
}
