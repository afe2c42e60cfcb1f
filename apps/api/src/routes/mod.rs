pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::catalog::handlers as catalog;
use crate::errors::AppError;
use crate::session::is_valid_session_id;
use crate::state::AppState;
use crate::transcript::handlers as transcript;
use crate::verification::handlers as verification;

/// Transport cap for transcript uploads. The extractor enforces the real
/// 10 MB file limit; the slack covers multipart framing.
const MAX_UPLOAD_BODY_BYTES: usize = 12 * 1024 * 1024;

pub(crate) fn checked_session_id(session_id: String) -> Result<String, AppError> {
    if is_valid_session_id(&session_id) {
        Ok(session_id)
    } else {
        Err(AppError::Validation(
            "session_id must be 1-128 characters of letters, digits, '-' or '_'".to_string(),
        ))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Catalog
        .route("/api/v1/catalog/majors", get(catalog::handle_list_majors))
        .route(
            "/api/v1/catalog/general-ed",
            get(catalog::handle_list_general_ed),
        )
        // Courses
        .route(
            "/api/v1/sessions/:session_id/courses",
            get(transcript::handle_list_courses)
                .post(transcript::handle_add_course)
                .delete(transcript::handle_clear_courses),
        )
        .route(
            "/api/v1/sessions/:session_id/courses/:course_id",
            delete(transcript::handle_remove_course),
        )
        // Transcript ingestion
        .route(
            "/api/v1/sessions/:session_id/transcript",
            post(transcript::handle_upload_transcript)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/api/v1/sessions/:session_id/transcript/text",
            post(transcript::handle_parse_transcript_text),
        )
        .route(
            "/api/v1/sessions/:session_id/profile",
            put(transcript::handle_set_profile),
        )
        // Verification
        .route(
            "/api/v1/sessions/:session_id/verify",
            post(verification::handle_verify),
        )
        .route(
            "/api/v1/sessions/:session_id/verification",
            get(verification::handle_last_verification),
        )
        .with_state(state)
}
