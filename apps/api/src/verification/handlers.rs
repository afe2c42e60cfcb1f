//! Axum route handlers for eligibility verification.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::catalog::{DEFAULT_INSTITUTION, DEFAULT_MAJOR};
use crate::errors::AppError;
use crate::pipeline::VerificationOutcome;
use crate::routes::checked_session_id;
use crate::state::AppState;
use crate::verification::explain::Explanation;
use crate::verification::models::{AnalysisContext, VerificationResult};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub target_institution: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    #[serde(flatten)]
    pub outcome: VerificationOutcome,
    pub explanation: Explanation,
}

#[derive(Debug, Serialize)]
pub struct LastVerificationResponse {
    pub result: VerificationResult,
    pub explanation: Explanation,
}

fn pick(request: Option<String>, profile: Option<String>, default: &str) -> String {
    request
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or(profile)
        .unwrap_or_else(|| default.to_string())
}

/// POST /api/v1/sessions/:session_id/verify
///
/// Body is optional. Major and target default to the session profile, then
/// to the catalog defaults. Once courses exist this always returns a result;
/// service trouble shows up as `determination: "fallback"`.
pub async fn handle_verify(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    request: Option<Json<VerifyRequest>>,
) -> Result<Json<VerifyResponse>, AppError> {
    let session_id = checked_session_id(session_id)?;
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let courses = state.sessions.courses(&session_id).await;
    if courses.is_empty() {
        return Err(AppError::Validation(
            "Add at least one course before verifying".to_string(),
        ));
    }

    let profile = state.sessions.profile(&session_id).await;
    let ctx = AnalysisContext {
        major: pick(request.major, profile.major, DEFAULT_MAJOR),
        target_institution: pick(
            request.target_institution,
            profile.target_institution,
            DEFAULT_INSTITUTION,
        ),
    };

    let outcome = state.pipeline.verify(&courses, &ctx).await;
    state
        .sessions
        .record_verification(&session_id, &outcome.result, &ctx)
        .await;

    let explanation = Explanation::for_result(&outcome.result);
    Ok(Json(VerifyResponse {
        outcome,
        explanation,
    }))
}

/// GET /api/v1/sessions/:session_id/verification
pub async fn handle_last_verification(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<LastVerificationResponse>, AppError> {
    let session_id = checked_session_id(session_id)?;
    let result = state
        .sessions
        .last_verification(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No verification yet for session {session_id}")))?;

    let explanation = Explanation::for_result(&result);
    Ok(Json(LastVerificationResponse {
        result,
        explanation,
    }))
}
