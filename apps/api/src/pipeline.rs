//! Ingestion and verification pipeline.
//!
//! Ingestion (PDF or pasted text to course drafts) can fail: with no course
//! list yet there is nothing to fall back on. Verification cannot: any
//! service or parse failure switches to the local determination.
//!
//! ```text
//! Idle -> RequestBuilding -> AwaitingService -> ParsingResponse -> Completed(ai)
//!                                  \__________________\___________-> Completed(fallback)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm_client::response::{parse_fragment, ParseError, Shape};
use crate::llm_client::{AnalysisService, LlmError};
use crate::transcript::courses::{CourseDraft, CourseRecord};
use crate::transcript::extractor::{extract_transcript_text, ExtractionError};
use crate::transcript::prompts::build_extraction_prompt;
use crate::verification::engine::{ai_assisted, local_determination};
use crate::verification::models::{AnalysisContext, VerificationResult};
use crate::verification::normalize::normalize_analysis;
use crate::verification::prompts::build_analysis_prompt;

pub const EXTRACTION_MAX_TOKENS: u32 = 2000;
pub const ANALYSIS_MAX_TOKENS: u32 = 3000;

/// Failure of a service round trip: the call itself or reading its output.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Service(#[from] LlmError),

    #[error("Could not read the service response: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("No courses found.")]
    NoCourses,
}

/// Verification stages, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    RequestBuilding,
    AwaitingService,
    ParsingResponse,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::RequestBuilding => "request_building",
            Stage::AwaitingService => "awaiting_service",
            Stage::ParsingResponse => "parsing_response",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// How a result was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "determination", rename_all = "snake_case")]
pub enum Determination {
    Ai,
    Fallback { fallback_reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub determination: Determination,
    pub result: VerificationResult,
}

impl VerificationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.determination, Determination::Fallback { .. })
    }
}

#[derive(Clone)]
pub struct VerificationPipeline {
    service: Arc<dyn AnalysisService>,
}

impl VerificationPipeline {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }

    /// PDF upload to course drafts. Extraction errors are reported as-is.
    pub async fn ingest_pdf(
        &self,
        file_name: &str,
        data: Bytes,
    ) -> Result<Vec<CourseDraft>, IngestError> {
        let text = extract_transcript_text(file_name, data, |p| {
            debug!(page = p.page, of = p.of, "Extracted transcript page");
        })
        .await?;

        self.parse_transcript_text(&text).await
    }

    /// Transcript text to course drafts via the service. No fallback: a
    /// failure here is returned to the caller.
    pub async fn parse_transcript_text(&self, text: &str) -> Result<Vec<CourseDraft>, IngestError> {
        let prompt = build_extraction_prompt(text);
        debug!("Extraction prompt:\n{prompt}");

        let raw = self
            .service
            .invoke(&prompt, EXTRACTION_MAX_TOKENS)
            .await
            .map_err(AnalysisError::from)?;

        let parsed = parse_fragment(&raw, Shape::Array).map_err(AnalysisError::from)?;
        let drafts: Vec<CourseDraft> = parsed
            .as_array()
            .map(|items| items.iter().map(CourseDraft::from_value).collect())
            .unwrap_or_default();

        if drafts.is_empty() {
            return Err(IngestError::NoCourses);
        }

        info!("Parsed {} course(s) from transcript text", drafts.len());
        Ok(drafts)
    }

    /// Eligibility for a fixed course snapshot. Always completes with a result.
    pub async fn verify(&self, courses: &[CourseRecord], ctx: &AnalysisContext) -> VerificationOutcome {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        debug!(%run_id, stage = %Stage::Idle, courses = courses.len(), "Verification requested");

        let (determination, result) = match self.analyze(courses, ctx, run_id).await {
            Ok(parsed) => (Determination::Ai, ai_assisted(parsed, ctx)),
            Err(e) => {
                let reason = e.to_string();
                warn!(%run_id, "Falling back to local determination: {reason}");
                (
                    Determination::Fallback {
                        fallback_reason: reason.clone(),
                    },
                    local_determination(courses, ctx, &reason),
                )
            }
        };

        let outcome = VerificationOutcome {
            run_id,
            determination,
            result,
        };

        info!(
            %run_id,
            stage = %Stage::Completed,
            fallback = outcome.is_fallback(),
            status = ?outcome.result.eligibility_status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verification completed"
        );
        outcome
    }

    async fn analyze(
        &self,
        courses: &[CourseRecord],
        ctx: &AnalysisContext,
        run_id: Uuid,
    ) -> Result<VerificationResult, AnalysisError> {
        debug!(%run_id, stage = %Stage::RequestBuilding, "Verification stage");
        let prompt = build_analysis_prompt(courses, ctx);

        debug!(
            %run_id,
            stage = %Stage::AwaitingService,
            prompt_chars = prompt.chars().count(),
            "Verification stage"
        );
        let raw = self.service.invoke(&prompt, ANALYSIS_MAX_TOKENS).await?;

        debug!(
            %run_id,
            stage = %Stage::ParsingResponse,
            response_chars = raw.chars().count(),
            "Verification stage"
        );
        let value = parse_fragment(&raw, Shape::Object)?;
        Ok(normalize_analysis(&value, ctx))
    }
}
