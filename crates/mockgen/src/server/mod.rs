//! In-process mock HTTP server.
//!
//! This module provides:
//! - `MockServer`: bind with port fallback, serve, reload and stop
//! - `RouteTable`: ordered, first-match route lookup built from a mock bundle
//! - `StateStore`: append-only per-path log behind stateful routes
//!
//! ## Module Structure
//!
//! - `types`: errors and the lifecycle status
//! - `routes`: route table and path matching
//! - `state`: the state store
//! - `template`: `{{auto}}` / `{{body.*}}` placeholder rendering
//! - `response`: response builders with CORS headers
//! - `handler`: request handling and dispatch
//! - `core`: `MockServer` and the accept loop

mod core;
mod handler;
mod response;
mod routes;
mod state;
mod template;
mod types;


pub use core::{
    MockServer, ServerOptions, ServerShared, DEFAULT_HOST, DEFAULT_MAX_ATTEMPTS, DEFAULT_PORT,
};
pub use handler::{dispatch, parse_body};
pub use routes::{normalize_request_path, pattern_matches, Route, RouteTable, PARAM_MARKER};
pub use state::StateStore;
pub use template::{render_or_fallback, render_template, IdSequence, TemplateError};
pub use types::{ServerError, ServerStatus};
