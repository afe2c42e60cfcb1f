//! Axum route handlers for the course list and transcript ingestion.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Grade;
use crate::errors::AppError;
use crate::routes::checked_session_id;
use crate::session::Profile;
use crate::state::AppState;
use crate::transcript::courses::{CourseDraft, CourseId, CourseRecord};

const DEFAULT_MANUAL_SEMESTER: &str = "Unknown";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub course_code: String,
    pub course_name: String,
    pub units: f64,
    pub grade: String,
    #[serde(default)]
    pub semester: Option<String>,
}

impl NewCourseRequest {
    /// Manual entries are checked strictly, unlike service output which is defaulted.
    fn validate(self) -> Result<CourseDraft, AppError> {
        let course_code = self.course_code.trim().to_uppercase();
        let course_name = self.course_name.trim().to_string();
        if course_code.is_empty() {
            return Err(AppError::Validation("courseCode cannot be empty".to_string()));
        }
        if course_name.is_empty() {
            return Err(AppError::Validation("courseName cannot be empty".to_string()));
        }
        if !self.units.is_finite() || self.units <= 0.0 {
            return Err(AppError::Validation(
                "units must be a positive number".to_string(),
            ));
        }
        let grade: Grade = self.grade.parse().map_err(|_| {
            AppError::Validation(
                "grade must be one of A, A-, B+, B, B-, C+, C, C-, D, F, P".to_string(),
            )
        })?;
        let semester = self
            .semester
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MANUAL_SEMESTER.to_string());

        Ok(CourseDraft {
            course_code,
            course_name,
            units: self.units,
            grade,
            semester,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub courses: Vec<CourseRecord>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Courses added by this upload, in transcript order.
    pub added: Vec<CourseRecord>,
    pub courses: Vec<CourseRecord>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub target_institution: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sessions/:session_id/courses
pub async fn handle_list_courses(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CourseListResponse>, AppError> {
    let session_id = checked_session_id(session_id)?;
    Ok(Json(CourseListResponse {
        courses: state.sessions.courses(&session_id).await,
    }))
}

/// POST /api/v1/sessions/:session_id/courses
pub async fn handle_add_course(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<CourseRecord>), AppError> {
    let session_id = checked_session_id(session_id)?;
    let draft = request.validate()?;
    let record = state.sessions.add_course(&session_id, draft).await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/v1/sessions/:session_id/courses
pub async fn handle_clear_courses(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let session_id = checked_session_id(session_id)?;
    state.sessions.clear_courses(&session_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/sessions/:session_id/courses/:course_id
pub async fn handle_remove_course(
    State(state): State<AppState>,
    Path((session_id, course_id)): Path<(String, u64)>,
) -> Result<Json<CourseRecord>, AppError> {
    let session_id = checked_session_id(session_id)?;
    state
        .sessions
        .remove_course(&session_id, CourseId(course_id))
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Course {course_id} not found")))
}

/// POST /api/v1/sessions/:session_id/transcript
///
/// Multipart upload with a single `file` field. Parsed courses are appended
/// to the session's list.
pub async fn handle_upload_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let session_id = checked_session_id(session_id)?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart upload: {e}");
        AppError::Validation("Could not read the uploaded form".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read upload bytes: {e}");
            AppError::Validation("Failed to read file data.".to_string())
        })?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    info!(session_id = %session_id, bytes = data.len(), "Transcript upload received");

    let drafts = state.pipeline.ingest_pdf(&file_name, data).await?;
    let added = state.sessions.add_courses(&session_id, drafts).await;

    Ok(Json(IngestResponse {
        added,
        courses: state.sessions.courses(&session_id).await,
    }))
}

/// POST /api/v1/sessions/:session_id/transcript/text
pub async fn handle_parse_transcript_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<TranscriptTextRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let session_id = checked_session_id(session_id)?;
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let drafts = state.pipeline.parse_transcript_text(&request.text).await?;
    let added = state.sessions.add_courses(&session_id, drafts).await;

    Ok(Json(IngestResponse {
        added,
        courses: state.sessions.courses(&session_id).await,
    }))
}

/// PUT /api/v1/sessions/:session_id/profile
pub async fn handle_set_profile(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let session_id = checked_session_id(session_id)?;
    let profile = Profile {
        major: non_blank(request.major),
        target_institution: non_blank(request.target_institution),
    };
    Ok(Json(state.sessions.set_profile(&session_id, profile).await))
}
