//! Canned bodies for auth and action endpoints.

use super::classify::{ActionKind, AuthKind};
use super::resources::timestamp;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

const MOCK_TOKEN: &str = "mock-jwt-token";
const TOKEN_TTL_SECS: u64 = 3600;

pub fn auth_body(kind: AuthKind, id: u64, now: DateTime<Utc>) -> Value {
    let ts = timestamp(now);
    match kind {
        AuthKind::Login => json!({
            "token": MOCK_TOKEN,
            "refreshToken": "mock-refresh-token",
            "expiresIn": TOKEN_TTL_SECS,
            "user": {
                "id": id,
                "name": "John Doe",
                "email": "john@example.com",
            },
        }),
        AuthKind::Register => json!({
            "id": id,
            "name": "John Doe",
            "email": "john@example.com",
            "verified": false,
            "createdAt": ts,
        }),
        AuthKind::Password => json!({
            "success": true,
            "message": "Password instructions sent",
            "timestamp": ts,
        }),
        AuthKind::Generic => json!({
            "success": true,
            "token": MOCK_TOKEN,
        }),
    }
}

/// Entity-with-timestamp body for a state transition on entity `id`.
pub fn action_body(kind: ActionKind, id: u64, now: DateTime<Utc>) -> Value {
    let ts = timestamp(now);
    match kind {
        ActionKind::Activate => json!({"id": id, "status": "active", "activatedAt": ts}),
        ActionKind::Deactivate => json!({"id": id, "status": "inactive", "deactivatedAt": ts}),
        ActionKind::Approve => json!({"id": id, "status": "approved", "approvedAt": ts}),
        ActionKind::Reject => json!({
            "id": id,
            "status": "rejected",
            "reason": "Rejected by reviewer",
            "rejectedAt": ts,
        }),
        ActionKind::Publish => json!({"id": id, "status": "published", "publishedAt": ts}),
        ActionKind::Archive => json!({"id": id, "archived": true, "archivedAt": ts}),
        ActionKind::Send => json!({"id": id, "sent": true, "sentAt": ts}),
        ActionKind::Generic => json!({
            "success": true,
            "message": "Action completed successfully",
        }),
    }
}
