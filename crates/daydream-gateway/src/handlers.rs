// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the prompt queue API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use daydream_core::{DaydreamError, HealthStatus, LikeAction, RejectReason, SubmitOutcome};
use daydream_queue::Submission;

use crate::server::GatewayState;

/// Request body for POST /prompts. `prompt` is accepted as an alias of `text`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response body for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub queue_position: i64,
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    pub window_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub action: LikeAction,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub likes: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn outcome_response(outcome: SubmitOutcome) -> Response {
    match (outcome.rejection, outcome.position, outcome.entry_id) {
        (None, Some(queue_position), Some(id)) => Json(SubmitResponse {
            success: true,
            queue_position,
            id,
        })
        .into_response(),
        (Some(RejectReason::InvalidInput), ..) => {
            error_response(StatusCode::BAD_REQUEST, "missing or invalid prompt text or seed")
        }
        (Some(RejectReason::QueueFull), ..) => {
            error_response(StatusCode::TOO_MANY_REQUESTS, "queue is full, try again later")
        }
        _ => error_response(StatusCode::SERVICE_UNAVAILABLE, "prompt queue unavailable"),
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.start_time.elapsed().as_secs();
    let (code, status) = match state.service.health().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}")),
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
        }),
    )
        .into_response()
}

/// GET /prompts?windowSize=N
///
/// The display window, the next `windowSize` pending entries and the backlog.
pub async fn get_prompts(
    State(state): State<GatewayState>,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    match state.service.snapshot(query.window_size).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            error!(error = %e, "failed to read prompt state");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to get prompt state")
        }
    }
}

/// POST /prompts
pub async fn post_prompt(
    State(state): State<GatewayState>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    let text = body.text.or(body.prompt).unwrap_or_default();
    let seed = body.seed.unwrap_or_default();
    let outcome = state
        .service
        .submit(Submission {
            text,
            seed,
            is_user: body.is_user,
            session_id: body.session_id,
        })
        .await;
    outcome_response(outcome)
}

/// PUT /prompts
///
/// Submits a random system prompt to keep the stream moving.
pub async fn put_filler(State(state): State<GatewayState>) -> Response {
    outcome_response(state.service.submit_filler().await)
}

/// POST /prompts/{id}/like
pub async fn post_like(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Option<Json<LikeRequest>>,
) -> Response {
    let action = body.map(|Json(b)| b.action).unwrap_or_default();
    match state.service.like(&id, action).await {
        Ok(likes) => Json(LikeResponse {
            success: true,
            likes,
        })
        .into_response(),
        Err(DaydreamError::NotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, format!("prompt {id} not found"))
        }
        Err(e) => {
            error!(error = %e, prompt = %id, "failed to update likes");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to like/unlike prompt")
        }
    }
}

/// GET /prompts/trending
pub async fn get_trending(State(state): State<GatewayState>) -> Response {
    match state.service.trending().await {
        Ok(prompts) => Json(prompts).into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch trending prompts");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch trending prompts")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_accepts_prompt_alias() {
        let body: SubmitRequest =
            serde_json::from_str(r#"{"prompt":"hi","seed":"s","isUser":true,"sessionId":"x"}"#)
                .unwrap();
        assert_eq!(body.text, None);
        assert_eq!(body.prompt.as_deref(), Some("hi"));
        assert!(body.is_user);
        assert_eq!(body.session_id.as_deref(), Some("x"));
    }

    #[test]
    fn like_request_defaults_to_like() {
        let body: LikeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.action, LikeAction::Like);
        let body: LikeRequest = serde_json::from_str(r#"{"action":"unlike"}"#).unwrap();
        assert_eq!(body.action, LikeAction::Unlike);
    }

    #[test]
    fn submit_response_is_camel_case() {
        let json = serde_json::to_value(SubmitResponse {
            success: true,
            queue_position: 4,
            id: "abc".into(),
        })
        .unwrap();
        assert_eq!(json["queuePosition"], 4);
    }
}
