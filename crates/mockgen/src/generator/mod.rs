//! Heuristic mock response synthesis.
//!
//! Given a `(method, URL)` pair, the generator produces a [`ResponseDefinition`]:
//!
//! 1. A `responseTemplates` entry in the config for the URL wins outright.
//! 2. Otherwise the URL is classified as auth, action or CRUD and a status
//!    and body are picked for that category.
//!
//! Randomness (POST ids) comes from an owned RNG so generation can be made
//! reproducible with [`MockGenerator::with_seed`].

mod bodies;
mod classify;
mod resources;

pub use bodies::{action_body, auth_body};
pub use classify::{classify, status_for, ActionKind, AuthKind, Category};
pub use resources::{entity_id, extract_id, infer_resource_name, is_collection, mock_resource};

use crate::bundle::{json_headers, ResponseDefinition};
use crate::config::MockGenConfig;
use crate::extractor::Endpoint;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Range POST ids are drawn from.
const RANDOM_ID_RANGE: std::ops::RangeInclusive<u64> = 1..=1000;

/// Synthesizes response definitions for one generation pass.
pub struct MockGenerator<'a> {
    config: Option<&'a MockGenConfig>,
    rng: StdRng,
    now: DateTime<Utc>,
}

impl<'a> MockGenerator<'a> {
    pub fn new(config: Option<&'a MockGenConfig>) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
            now: Utc::now(),
        }
    }

    /// Deterministic generator for tests and reproducible bundles.
    pub fn with_seed(config: Option<&'a MockGenConfig>, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            now: Utc::now(),
        }
    }

    /// Fix the timestamp written into generated bodies.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn generate(&mut self, endpoint: &Endpoint) -> ResponseDefinition {
        self.generate_for(&endpoint.method, &endpoint.url)
    }

    pub fn generate_for(&mut self, method: &str, url: &str) -> ResponseDefinition {
        let method = method.to_ascii_uppercase();

        if let Some(template) = self.config.and_then(|config| config.template_for(url)) {
            return from_template(&method, template);
        }

        let category = classify(url);
        let status = status_for(&method, category);
        if method == "DELETE" {
            return ResponseDefinition::new(method, status);
        }

        let body = match category {
            Category::Auth(kind) => {
                let id = match kind {
                    AuthKind::Register => self.random_id(),
                    _ => 1,
                };
                auth_body(kind, id, self.now)
            }
            Category::Action(kind) => action_body(kind, entity_id(url), self.now),
            Category::Crud => self.crud_body(&method, url),
        };

        ResponseDefinition::new(method, status).with_json_body(body)
    }

    fn crud_body(&mut self, method: &str, url: &str) -> Value {
        let resource = infer_resource_name(url);
        match method {
            "GET" if is_collection(url) => Value::Array(vec![
                mock_resource(&resource, 1, self.now),
                mock_resource(&resource, 2, self.now),
            ]),
            "POST" => {
                let id = self.random_id();
                with_flag(mock_resource(&resource, id, self.now), "created")
            }
            "PUT" | "PATCH" => {
                with_flag(mock_resource(&resource, extract_id(url), self.now), "updated")
            }
            _ => mock_resource(&resource, extract_id(url), self.now),
        }
    }

    fn random_id(&mut self) -> u64 {
        self.rng.gen_range(RANDOM_ID_RANGE)
    }
}

fn with_flag(mut body: Value, flag: &str) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert(flag.to_string(), Value::Bool(true));
    }
    body
}

/// Build a definition from a user template.
///
/// `status`, `headers`, `alternatives` (or `responses`) and `stateful` are
/// read from the template when present. The body is the template's `body`
/// field, or the whole template when it has none.
fn from_template(method: &str, template: &Value) -> ResponseDefinition {
    let fields = template.as_object();
    let field = |name: &str| fields.and_then(|object| object.get(name));

    let status = field("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(200);

    let headers = field("headers")
        .and_then(Value::as_object)
        .map(string_headers)
        .unwrap_or_else(json_headers);

    let body = field("body").cloned().unwrap_or_else(|| template.clone());

    let alternatives = field("alternatives")
        .or_else(|| field("responses"))
        .and_then(Value::as_array)
        .cloned();

    ResponseDefinition {
        method: method.to_string(),
        status: Some(status),
        headers: Some(headers),
        body: Some(body),
        alternatives,
        stateful: field("stateful").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn string_headers(object: &Map<String, Value>) -> BTreeMap<String, String> {
    object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}
