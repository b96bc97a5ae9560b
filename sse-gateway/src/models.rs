//! Wire-level event vocabulary and typed payload schemas (spec §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recognized event type discriminators.
pub mod event_type {
    pub const MESSAGE: &str = "message";
    pub const NOTIFICATION: &str = "notification";
    pub const DATA_UPDATE: &str = "dataUpdate";
    pub const ALERT: &str = "alert";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const CONNECTED: &str = "connected";
}

/// Common envelope fields every typed payload carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEnvelope {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl PayloadEnvelope {
    pub fn new() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: "1".to_string(),
        }
    }
}

impl Default for PayloadEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

/// POST /api/sse/notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(flatten)]
    pub envelope: PayloadEnvelope,
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
    pub severity: NotificationSeverity,
}

/// POST /api/sse/data-update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdatePayload {
    #[serde(flatten)]
    pub envelope: PayloadEnvelope,
    #[serde(rename = "type")]
    pub type_: String,
    pub entity_id: String,
    pub entity_type: String,
    pub changes: serde_json::Value,
}

/// POST /api/sse/alert payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(flatten)]
    pub envelope: PayloadEnvelope,
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub category: String,
}

/// POST /api/sse/broadcast request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub event_type: Option<String>,
    pub data: serde_json::Value,
}

/// POST /api/sse/notification request body (human-supplied subset).
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    pub message: String,
    pub severity: NotificationSeverity,
}

/// POST /api/sse/data-update request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdateRequest {
    pub entity_id: String,
    pub entity_type: String,
    pub changes: serde_json::Value,
}

/// POST /api/sse/alert request body.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRequest {
    pub message: String,
    pub severity: AlertSeverity,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload_serializes_with_envelope() {
        let payload = NotificationPayload {
            envelope: PayloadEnvelope::new(),
            type_: "notification".to_string(),
            message: "hi".to_string(),
            severity: NotificationSeverity::Info,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("messageId").is_some());
        assert!(json.get("timestamp").is_some());
        assert_eq!(json.get("message").unwrap(), "hi");
    }

    #[test]
    fn test_broadcast_request_accepts_camel_case_event_type() {
        let body = serde_json::json!({"eventType": "notification", "data": {"a": 1}});
        let req: BroadcastRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.event_type.as_deref(), Some("notification"));
    }

    #[test]
    fn test_data_update_request_accepts_camel_case_fields() {
        let body = serde_json::json!({
            "entityId": "e1",
            "entityType": "order",
            "changes": {"status": "shipped"},
        });
        let req: DataUpdateRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.entity_id, "e1");
        assert_eq!(req.entity_type, "order");
    }

    #[test]
    fn test_data_update_payload_serializes_with_camel_case_fields() {
        let payload = DataUpdatePayload {
            envelope: PayloadEnvelope::new(),
            type_: "dataUpdate".to_string(),
            entity_id: "e1".to_string(),
            entity_type: "order".to_string(),
            changes: serde_json::json!({"status": "shipped"}),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("entityId").is_some());
        assert!(json.get("entityType").is_some());
    }
}
