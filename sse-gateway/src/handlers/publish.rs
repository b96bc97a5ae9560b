//! POST /api/sse/broadcast, /send/{clientId}, and the typed convenience
//! publishers (spec §6).

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{
    event_type, AlertPayload, AlertRequest, BroadcastRequest, DataUpdatePayload, DataUpdateRequest,
    NotificationPayload, NotificationRequest, PayloadEnvelope,
};
use crate::AppState;

/// Mirrors `notification-service`'s `ApiResponse<T>` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishAck {
    pub seq: i64,
    pub event_id: String,
}

pub async fn broadcast(state: web::Data<AppState>, body: web::Json<BroadcastRequest>) -> AppResult<HttpResponse> {
    let event_type = body.event_type.clone().unwrap_or_else(|| event_type::MESSAGE.to_string());
    publish_and_respond(&state, &event_type, body.data.clone(), None).await
}

pub async fn send_to_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<BroadcastRequest>,
) -> AppResult<HttpResponse> {
    let client_id = path.into_inner();
    let event_type = body.event_type.clone().unwrap_or_else(|| event_type::MESSAGE.to_string());
    publish_and_respond(&state, &event_type, body.data.clone(), Some(client_id)).await
}

pub async fn notification(
    state: web::Data<AppState>,
    body: web::Json<NotificationRequest>,
) -> AppResult<HttpResponse> {
    let payload = NotificationPayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::NOTIFICATION.to_string(),
        message: body.message.clone(),
        severity: body.severity.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::NOTIFICATION, data, None).await
}

pub async fn notification_to_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NotificationRequest>,
) -> AppResult<HttpResponse> {
    let payload = NotificationPayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::NOTIFICATION.to_string(),
        message: body.message.clone(),
        severity: body.severity.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::NOTIFICATION, data, Some(path.into_inner())).await
}

pub async fn data_update(
    state: web::Data<AppState>,
    body: web::Json<DataUpdateRequest>,
) -> AppResult<HttpResponse> {
    let payload = DataUpdatePayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::DATA_UPDATE.to_string(),
        entity_id: body.entity_id.clone(),
        entity_type: body.entity_type.clone(),
        changes: body.changes.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::DATA_UPDATE, data, None).await
}

pub async fn data_update_to_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DataUpdateRequest>,
) -> AppResult<HttpResponse> {
    let payload = DataUpdatePayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::DATA_UPDATE.to_string(),
        entity_id: body.entity_id.clone(),
        entity_type: body.entity_type.clone(),
        changes: body.changes.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::DATA_UPDATE, data, Some(path.into_inner())).await
}

pub async fn alert(state: web::Data<AppState>, body: web::Json<AlertRequest>) -> AppResult<HttpResponse> {
    let payload = AlertPayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::ALERT.to_string(),
        message: body.message.clone(),
        severity: body.severity.clone(),
        category: body.category.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::ALERT, data, None).await
}

pub async fn alert_to_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AlertRequest>,
) -> AppResult<HttpResponse> {
    let payload = AlertPayload {
        envelope: PayloadEnvelope::new(),
        type_: event_type::ALERT.to_string(),
        message: body.message.clone(),
        severity: body.severity.clone(),
        category: body.category.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    publish_and_respond(&state, event_type::ALERT, data, Some(path.into_inner())).await
}

async fn publish_and_respond(
    state: &AppState,
    event_type: &str,
    data: serde_json::Value,
    target: Option<String>,
) -> AppResult<HttpResponse> {
    let entry = state
        .publisher
        .publish(event_type, data, target)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PublishAck { seq: entry.seq, event_id: entry.event_id })))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/sse")
            .route("/broadcast", web::post().to(broadcast))
            .route("/send/{clientId}", web::post().to(send_to_client))
            .route("/notification", web::post().to(notification))
            .route("/notification/{clientId}", web::post().to(notification_to_client))
            .route("/data-update", web::post().to(data_update))
            .route("/data-update/{clientId}", web::post().to(data_update_to_client))
            .route("/alert", web::post().to(alert))
            .route("/alert/{clientId}", web::post().to(alert_to_client)),
    );
}
