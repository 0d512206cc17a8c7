//! Rule tables for the endpoint extractor.
//!
//! Every rule pairs an anchor pattern with a method detector and a URL
//! detector. Rules of one dialect run in table order; each rule returns its
//! hits in source order. Rules are disjoint by construction: receivers claimed
//! by one client rule are excluded from the others.

use super::aliases::{AliasSet, CLIENT_LIBRARY};
use super::normalize::LiteralKind;
use super::Dialect;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Bytes after a `fetch(` URL searched for a `method:` option.
const FETCH_OPTIONS_WINDOW: usize = 256;

/// Bytes after a data-fetching hook anchor searched for client calls.
const WRAPPER_CONTEXT_WINDOW: usize = 400;

/// `'...'`, `"..."` or a template literal, each confined to one line.
const URL_ARG: &str = r#"(?:'([^'\n]*)'|"([^"\n]*)"|`([^`\n]*)`)"#;
const QUOTED_ARG: &str = r#"(?:'([^'\n]*)'|"([^"\n]*)")"#;
const RUST_STR: &str = r#""([^"\n]*)""#;
const CLIENT_VERB: &str = "((?i:get|post|put|delete|patch|head|options))";
const SERVER_VERB: &str = "(get|post|put|delete|patch)";

const SERVER_RECEIVERS: &[&str] = &["app", "router", "server"];
const WRAPPER_NAMES: &[&str] = &[
    "api",
    "apiClient",
    "client",
    "http",
    "httpClient",
    "$http",
    "request",
];
const WRAPPER_SUFFIXES: &[&str] = &["Api", "Client", "Service"];

/// One raw match before URL normalization.
#[derive(Debug, Clone)]
pub(super) struct RawHit {
    /// Byte offset of the match start
    pub offset: usize,
    pub method: String,
    pub url: String,
    pub kind: LiteralKind,
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Rule {
    /// `fetch(url, { method })`
    Fetch,
    /// `axios.get(url)`
    AxiosDefault,
    /// `api.get(url)` where `api` is an axios instance or import alias
    AliasInstance,
    /// client calls inside `useQuery(...)`, `createAsyncThunk(...)`, ...
    WrapperContext,
    /// `apiClient.get(url)`, `userService.post(url)`, ...
    ClientWrapper,
    /// `app.get('/x', ...)`, `router.post('/x', ...)`
    ExpressRoute,
    /// actix `web::resource("/x")`
    ActixResource,
    /// actix `.route("/x", web::post())`
    ActixRoute,
    /// Rocket/actix `#[get("/x")]`
    AttributeRoute,
    /// axum `.route("/x", get(handler))`
    AxumRoute,
    /// FastAPI/Flask `@app.get("/x")`
    PythonVerbDecorator,
    /// Flask `@app.route("/x", methods=["POST"])`
    PythonRouteDecorator,
}

const JAVASCRIPT_RULES: &[Rule] = &[
    Rule::Fetch,
    Rule::AxiosDefault,
    Rule::AliasInstance,
    Rule::WrapperContext,
    Rule::ClientWrapper,
    Rule::ExpressRoute,
];

const RUST_RULES: &[Rule] = &[
    Rule::ActixResource,
    Rule::ActixRoute,
    Rule::AttributeRoute,
    Rule::AxumRoute,
];

const PYTHON_RULES: &[Rule] = &[Rule::PythonVerbDecorator, Rule::PythonRouteDecorator];

/// Rules for a dialect, in evaluation order.
pub(super) fn rules_for(dialect: Dialect) -> &'static [Rule] {
    match dialect {
        Dialect::JavaScript => JAVASCRIPT_RULES,
        Dialect::Rust => RUST_RULES,
        Dialect::Python => PYTHON_RULES,
    }
}

struct Patterns {
    fetch: Regex,
    fetch_method: Regex,
    axios_default: Regex,
    member_call: Regex,
    wrapper_anchor: Regex,
    swr_direct: Regex,
    express: Regex,
    actix_resource: Regex,
    actix_route: Regex,
    attribute: Regex,
    axum: Regex,
    py_verb: Regex,
    py_route: Regex,
    py_methods: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid extractor pattern {pattern}: {e}"))
}

fn get_patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        fetch: compile(&format!(r"\bfetch\s*\(\s*{URL_ARG}")),
        fetch_method: compile(r#"\bmethod\s*:\s*['"`]([A-Za-z]+)['"`]"#),
        axios_default: compile(&format!(
            r"\b{CLIENT_LIBRARY}\s*\.\s*{CLIENT_VERB}\s*\(\s*{URL_ARG}"
        )),
        member_call: compile(&format!(
            r"([A-Za-z_$][\w$]*)\s*\.\s*{CLIENT_VERB}\s*\(\s*{URL_ARG}"
        )),
        wrapper_anchor: compile(
            r"\b(useQuery|useMutation|useInfiniteQuery|useSWRMutation|useSWR|createAsyncThunk|queryFn|mutationFn)\b",
        ),
        swr_direct: compile(&format!(r"^\s*\(\s*{URL_ARG}")),
        express: compile(&format!(
            r"\b(app|router|server)\s*\.\s*{SERVER_VERB}\s*\(\s*{URL_ARG}"
        )),
        actix_resource: compile(&format!(r"\bweb::resource\s*\(\s*{RUST_STR}")),
        actix_route: compile(&format!(
            r"\.route\s*\(\s*{RUST_STR}\s*,\s*web::{SERVER_VERB}\s*\("
        )),
        attribute: compile(&format!(r"#\[\s*{SERVER_VERB}\s*\(\s*{RUST_STR}")),
        axum: compile(&format!(
            r"\.route\s*\(\s*{RUST_STR}\s*,\s*(?:(?:axum::)?routing::)?{SERVER_VERB}\s*\("
        )),
        py_verb: compile(&format!(
            r"@\s*[A-Za-z_][\w.]*\s*\.\s*{SERVER_VERB}\s*\(\s*{QUOTED_ARG}"
        )),
        py_route: compile(&format!(
            r"@\s*[A-Za-z_][\w.]*\s*\.\s*route\s*\(\s*{QUOTED_ARG}([^\n]*)"
        )),
        py_methods: compile(r#"\bmethods\s*=\s*[\[(]\s*['"]([A-Za-z]+)['"]"#),
    })
}

/// Where a rule reads the HTTP verb from.
#[derive(Clone, Copy)]
enum Verb {
    Group(usize),
    Fixed(&'static str),
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Fetch => "fetch",
            Rule::AxiosDefault => "axios-default",
            Rule::AliasInstance => "axios-instance",
            Rule::WrapperContext => "data-fetching-wrapper",
            Rule::ClientWrapper => "api-client-wrapper",
            Rule::ExpressRoute => "express-route",
            Rule::ActixResource => "actix-resource",
            Rule::ActixRoute => "actix-route",
            Rule::AttributeRoute => "attribute-route",
            Rule::AxumRoute => "axum-route",
            Rule::PythonVerbDecorator => "python-verb-decorator",
            Rule::PythonRouteDecorator => "python-route-decorator",
        }
    }

    /// Find this rule's hits in `text`, in source order.
    pub fn find(&self, text: &str, aliases: &AliasSet) -> Vec<RawHit> {
        let p = get_patterns();
        match self {
            Rule::Fetch => fetch_hits(text),
            Rule::AxiosDefault => capture_hits(&p.axios_default, text, Verb::Group(1), 2, 3),
            Rule::AliasInstance => member_hits(text, 0, text.len(), |receiver, _| {
                receiver != CLIENT_LIBRARY && aliases.contains(receiver)
            }),
            Rule::WrapperContext => wrapper_context_hits(text, aliases),
            Rule::ClientWrapper => member_hits(text, 0, text.len(), |receiver, url| {
                is_wrapper_name(receiver) && !aliases.contains(receiver) && looks_like_url(url)
            }),
            Rule::ExpressRoute => capture_hits(&p.express, text, Verb::Group(2), 3, 3),
            Rule::ActixResource => capture_hits(&p.actix_resource, text, Verb::Fixed("GET"), 1, 1),
            Rule::ActixRoute => capture_hits(&p.actix_route, text, Verb::Group(2), 1, 1),
            Rule::AttributeRoute => capture_hits(&p.attribute, text, Verb::Group(1), 2, 1),
            Rule::AxumRoute => capture_hits(&p.axum, text, Verb::Group(2), 1, 1),
            Rule::PythonVerbDecorator => capture_hits(&p.py_verb, text, Verb::Group(1), 2, 2),
            Rule::PythonRouteDecorator => python_route_hits(text),
        }
    }
}

/// Read the first present literal among `count` alternation groups.
///
/// The third group of [`URL_ARG`] is the template-literal form.
fn literal_at(caps: &Captures, first: usize, count: usize) -> Option<(String, LiteralKind)> {
    (first..first + count).find_map(|i| {
        caps.get(i).map(|m| {
            let kind = if i == first + 2 {
                LiteralKind::Template
            } else {
                LiteralKind::Quoted
            };
            (m.as_str().to_string(), kind)
        })
    })
}

fn capture_hits(
    regex: &Regex,
    text: &str,
    verb: Verb,
    url_first: usize,
    url_groups: usize,
) -> Vec<RawHit> {
    regex
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (url, kind) = literal_at(&caps, url_first, url_groups)?;
            let method = match verb {
                Verb::Group(i) => caps.get(i)?.as_str().to_ascii_uppercase(),
                Verb::Fixed(m) => m.to_string(),
            };
            Some(RawHit {
                offset: whole.start(),
                method,
                url,
                kind,
                raw: whole.as_str().to_string(),
            })
        })
        .collect()
}

fn fetch_hits(text: &str) -> Vec<RawHit> {
    get_patterns()
        .fetch
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (url, kind) = literal_at(&caps, 1, 3)?;
            let method = fetch_method(text, whole.end()).unwrap_or_else(|| "GET".to_string());
            Some(RawHit {
                offset: whole.start(),
                method,
                url,
                kind,
                raw: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// Look for `method: 'POST'` in the options argument following a fetch URL.
///
/// The window stops at the end of the statement or the next `fetch`.
fn fetch_method(text: &str, from: usize) -> Option<String> {
    let mut options = window(text, from, FETCH_OPTIONS_WINDOW);
    if let Some(pos) = options.find(';') {
        options = &options[..pos];
    }
    if let Some(pos) = options.find("fetch") {
        options = &options[..pos];
    }
    let caps = get_patterns().fetch_method.captures(options)?;
    Some(caps[1].to_ascii_uppercase())
}

/// `<receiver>.<verb>(url)` calls within `text[start..end]` accepted by `accept`.
fn member_hits<F>(text: &str, start: usize, end: usize, accept: F) -> Vec<RawHit>
where
    F: Fn(&str, &str) -> bool,
{
    let slice = &text[start..end];
    get_patterns()
        .member_call
        .captures_iter(slice)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let receiver = caps.get(1)?.as_str();
            let (url, kind) = literal_at(&caps, 3, 3)?;
            if !accept(receiver, &url) {
                return None;
            }
            Some(RawHit {
                offset: start + whole.start(),
                method: caps.get(2)?.as_str().to_ascii_uppercase(),
                url,
                kind,
                raw: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// Client calls on receivers no other client rule claims, found only inside
/// a bounded window after a data-fetching anchor.
fn wrapper_context_hits(text: &str, aliases: &AliasSet) -> Vec<RawHit> {
    let p = get_patterns();
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for anchor in p.wrapper_anchor.find_iter(text) {
        let start = anchor.end();
        let context = window(text, start, WRAPPER_CONTEXT_WINDOW);
        let end = start + context.len();

        if anchor.as_str() == "useSWR" {
            if let Some(caps) = p.swr_direct.captures(context) {
                if let (Some(whole), Some((url, kind))) = (caps.get(0), literal_at(&caps, 1, 3)) {
                    if looks_like_url(&url) && seen.insert(anchor.start()) {
                        hits.push(RawHit {
                            offset: anchor.start(),
                            method: "GET".to_string(),
                            url,
                            kind,
                            raw: format!("{}{}", anchor.as_str(), whole.as_str()),
                        });
                    }
                }
            }
        }

        let calls = member_hits(text, start, end, |receiver, url| {
            receiver != CLIENT_LIBRARY
                && !aliases.contains(receiver)
                && !is_wrapper_name(receiver)
                && !SERVER_RECEIVERS.contains(&receiver)
                && looks_like_url(url)
        });
        for hit in calls {
            if seen.insert(hit.offset) {
                hits.push(hit);
            }
        }
    }

    hits.sort_by_key(|hit| hit.offset);
    hits
}

fn python_route_hits(text: &str) -> Vec<RawHit> {
    let p = get_patterns();
    p.py_route
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (url, kind) = literal_at(&caps, 1, 2)?;
            let method = caps
                .get(3)
                .and_then(|tail| p.py_methods.captures(tail.as_str()))
                .map(|m| m[1].to_ascii_uppercase())
                .unwrap_or_else(|| "GET".to_string());
            Some(RawHit {
                offset: whole.start(),
                method,
                url,
                kind,
                raw: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// `text[start..start + len]`, shortened to the nearest char boundary.
fn window(text: &str, start: usize, len: usize) -> &str {
    let mut end = start.saturating_add(len).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}

fn is_wrapper_name(receiver: &str) -> bool {
    WRAPPER_NAMES.contains(&receiver)
        || WRAPPER_SUFFIXES
            .iter()
            .any(|suffix| receiver.len() > suffix.len() && receiver.ends_with(suffix))
}

/// Receivers matched by name alone also call `.get('key')` on maps and
/// caches, so their first argument must look like a URL.
fn looks_like_url(url: &str) -> bool {
    url.starts_with('/') || url.contains("://") || url.starts_with("${")
}
