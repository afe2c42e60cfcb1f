//! Read-only catalog endpoints.

use axum::Json;
use serde::Serialize;

use crate::catalog::{
    GeneralEdDefinition, MajorRequirements, DEFAULT_MAJOR, GENERAL_ED_AREAS, MAJORS,
};

#[derive(Debug, Serialize)]
pub struct MajorsResponse {
    pub majors: &'static [MajorRequirements],
    pub default_major: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GeneralEdResponse {
    pub areas: &'static [GeneralEdDefinition],
}

/// GET /api/v1/catalog/majors
pub async fn handle_list_majors() -> Json<MajorsResponse> {
    Json(MajorsResponse {
        majors: MAJORS,
        default_major: DEFAULT_MAJOR,
    })
}

/// GET /api/v1/catalog/general-ed
pub async fn handle_list_general_ed() -> Json<GeneralEdResponse> {
    Json(GeneralEdResponse {
        areas: &GENERAL_ED_AREAS,
    })
}
