use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clearance::domain::UserId;

/// Tag for the operation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RequestCreated,
    RequestApproved,
    RequestRejected,
    RequestCancelled,
    PaymentRecorded,
    RequestReleased,
    RequestExpired,
    DocumentRegenerated,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestCancelled => "request_cancelled",
            Self::PaymentRecorded => "payment_recorded",
            Self::RequestReleased => "request_released",
            Self::RequestExpired => "request_expired",
            Self::DocumentRegenerated => "document_regenerated",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "request_created" => Some(Self::RequestCreated),
            "request_approved" => Some(Self::RequestApproved),
            "request_rejected" => Some(Self::RequestRejected),
            "request_cancelled" => Some(Self::RequestCancelled),
            "payment_recorded" => Some(Self::PaymentRecorded),
            "request_released" => Some(Self::RequestReleased),
            "request_expired" => Some(Self::RequestExpired),
            "document_regenerated" => Some(Self::DocumentRegenerated),
            _ => None,
        }
    }
}

/// One immutable record of who did what to which entity and when. Created
/// once by the trail, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    /// None for system-initiated actions such as the expiry sweep.
    pub actor_user_id: Option<UserId>,
    /// Denormalized at write time so history survives account deletion.
    pub actor_email: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub details: Option<String>,
    /// Caller identity, e.g. the handler or job that triggered the write.
    pub origin: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Entry as submitted by a call site; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_user_id: Option<UserId>,
    pub actor_email: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub details: Option<String>,
    pub origin: Option<String>,
}

impl NewAuditEntry {
    pub fn for_request(action: AuditAction, request_id: impl std::fmt::Display) -> Self {
        Self {
            actor_user_id: None,
            actor_email: None,
            action,
            entity_type: "ClearanceRequest".to_string(),
            entity_id: request_id.to_string(),
            old_values: None,
            new_values: None,
            details: None,
            origin: None,
        }
    }

    pub fn by(mut self, actor: &UserId) -> Self {
        self.actor_user_id = Some(actor.clone());
        self
    }

    pub fn with_transition(mut self, old: Value, new: Value) -> Self {
        self.old_values = Some(old);
        self.new_values = Some(new);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn from_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

const SENSITIVE_MARKERS: [&str; 6] = [
    "password",
    "passwordhash",
    "securitystamp",
    "concurrencystamp",
    "token",
    "secret",
];

/// Replace values under sensitive-looking keys with `"[REDACTED]"`,
/// recursively. Runs on every payload before storage so credentials can
/// never leak into the trail, whatever the call site serialized.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    let lowered = key.to_ascii_lowercase();
                    if SENSITIVE_MARKERS
                        .iter()
                        .any(|marker| lowered.contains(marker))
                        || lowered == "key"
                    {
                        (key, Value::String("[REDACTED]".to_string()))
                    } else {
                        (key, redact(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redact_masks_sensitive_keys_recursively() {
        let payload = json!({
            "status": "approved",
            "passwordHash": "hunter2",
            "nested": { "api_token": "abc", "remarks": "ok" },
            "items": [{ "secretNote": "x" }],
        });

        let redacted = redact(payload);
        assert_eq!(redacted["passwordHash"], "[REDACTED]");
        assert_eq!(redacted["nested"]["api_token"], "[REDACTED]");
        assert_eq!(redacted["nested"]["remarks"], "ok");
        assert_eq!(redacted["items"][0]["secretNote"], "[REDACTED]");
        assert_eq!(redacted["status"], "approved");
    }

    #[test]
    fn redact_leaves_scalars_untouched() {
        assert_eq!(redact(json!(42)), json!(42));
        assert_eq!(redact(json!("plain")), json!("plain"));
    }

    #[test]
    fn builder_fills_request_entry() {
        let entry = NewAuditEntry::for_request(AuditAction::RequestApproved, 12)
            .by(&UserId::new("staff-1"))
            .with_details("approved after review")
            .from_origin("clearance.process");

        assert_eq!(entry.entity_type, "ClearanceRequest");
        assert_eq!(entry.entity_id, "12");
        assert_eq!(entry.action.label(), "request_approved");
        assert_eq!(entry.origin.as_deref(), Some("clearance.process"));
    }
}
