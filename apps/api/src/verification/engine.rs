//! Eligibility determination.
//!
//! Two paths produce a `VerificationResult`:
//! - AI-assisted: repackages a normalized service response, re-applying the
//!   same defaults at the boundary.
//! - Local fallback: pure computation over the course records. It has no
//!   external dependency and cannot fail.

use tracing::warn;

use crate::transcript::courses::CourseRecord;
use crate::verification::models::{
    default_general_ed, default_sources, AnalysisContext, EligibilityStatus,
    MajorRequirementStatus, RequirementArea, RequirementStatus, Risk, Severity, Summary,
    VerificationResult,
};
use crate::verification::normalize::{format_gpa, normalize_analysis};

/// Name of the synthetic missing requirement reported by the fallback path.
pub const AI_UNAVAILABLE: &str = "AI unavailable";
pub const ERROR_RISK_TYPE: &str = "Error";
pub const RETRY_NOTE: &str = "Please try again or enter courses manually.";

const FALLBACK_MIN_GPA: f64 = 3.0;
const FALLBACK_MIN_UNITS: f64 = 60.0;

/// Credit-weighted GPA rounded to two decimals.
///
/// `P` courses are left out of both sums. With no graded units the GPA is 0.
pub fn compute_gpa(courses: &[CourseRecord]) -> f64 {
    let (quality_points, graded_units) = courses
        .iter()
        .filter_map(|c| c.grade.points().map(|p| (p * c.units, c.units)))
        .fold((0.0, 0.0), |(qp, u), (p, units)| (qp + p, u + units));

    if graded_units > 0.0 {
        (quality_points / graded_units * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// All units, including `P` courses.
pub fn total_units(courses: &[CourseRecord]) -> f64 {
    courses.iter().fold(0.0, |acc, c| acc + c.units)
}

/// Re-applies normalization to an already-normalized result. Idempotent.
pub fn ai_assisted(parsed: VerificationResult, ctx: &AnalysisContext) -> VerificationResult {
    match serde_json::to_value(&parsed) {
        Ok(value) => normalize_analysis(&value, ctx),
        Err(e) => {
            warn!("Could not re-serialize analysis result, keeping as parsed: {e}");
            parsed
        }
    }
}

/// Deterministic, service-independent determination.
///
/// Likely eligible iff GPA ≥ 3.0 and total units ≥ 60; otherwise conditional.
pub fn local_determination(
    courses: &[CourseRecord],
    ctx: &AnalysisContext,
    error_reason: &str,
) -> VerificationResult {
    let gpa = compute_gpa(courses);
    let units = total_units(courses);

    let eligibility_status = if gpa >= FALLBACK_MIN_GPA && units >= FALLBACK_MIN_UNITS {
        EligibilityStatus::LikelyEligible
    } else {
        EligibilityStatus::Conditional
    };

    VerificationResult {
        eligibility_status,
        summary: Summary {
            gpa: format_gpa(gpa),
            total_units: units,
            major: ctx.major.clone(),
            target_uc: ctx.target_institution.clone(),
        },
        major_requirements: MajorRequirementStatus {
            completed: Vec::new(),
            missing: vec![RequirementArea {
                name: AI_UNAVAILABLE.to_string(),
                status: RequirementStatus::Missing,
                matched_course: None,
                codes: vec!["Try again".to_string()],
            }],
        },
        risks: vec![Risk {
            risk_type: ERROR_RISK_TYPE.to_string(),
            severity: Severity::Medium,
            message: error_reason.to_string(),
        }],
        igetc_status: default_general_ed(),
        notes: vec![RETRY_NOTE.to_string()],
        sources: default_sources(),
    }
}
