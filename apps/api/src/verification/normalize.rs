//! Field-level defaulting for the analysis response.
//!
//! This is the only place that knows the defaults. Nothing about the
//! upstream object is trusted: each field is read, type-checked, and replaced
//! by its default when absent or unusable. Normalizing an already-normalized
//! result (serialized back to JSON) yields the same result.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::AreaId;
use crate::transcript::courses::leading_number;
use crate::verification::models::{
    default_general_ed, default_sources, AnalysisContext, EligibilityStatus, GeneralEdArea,
    MajorRequirementStatus, RequirementArea, RequirementStatus, Risk, Severity, Summary,
    VerificationResult,
};

const UNNAMED_REQUIREMENT: &str = "Unnamed requirement";
const DEFAULT_RISK_TYPE: &str = "General";

/// Builds a fully-defaulted `VerificationResult` from whatever the service returned.
pub fn normalize_analysis(value: &Value, ctx: &AnalysisContext) -> VerificationResult {
    VerificationResult {
        eligibility_status: value
            .get("eligibility_status")
            .and_then(Value::as_str)
            .and_then(EligibilityStatus::parse_lenient)
            .unwrap_or_default(),
        summary: normalize_summary(value.get("summary"), ctx),
        major_requirements: normalize_major_requirements(value.get("major_requirements")),
        risks: normalize_risks(value.get("risks")),
        igetc_status: normalize_general_ed(value.get("igetc_status")),
        notes: string_list(value.get("notes")).unwrap_or_default(),
        sources: normalize_sources(value.get("sources")),
    }
}

/// Two-decimal GPA string. Non-finite or negative input renders as `0.00`.
pub fn format_gpa(gpa: f64) -> String {
    if gpa.is_finite() && gpa > 0.0 {
        format!("{:.2}", (gpa * 100.0).round() / 100.0)
    } else {
        "0.00".to_string()
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `Some` only when the value is an array; non-string elements are dropped.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|v| non_empty_str(Some(v)))
            .map(str::to_string)
            .collect()
    })
}

fn normalize_summary(value: Option<&Value>, ctx: &AnalysisContext) -> Summary {
    let field = |key: &str| value.and_then(|v| v.get(key));

    Summary {
        gpa: format_gpa(field("gpa").and_then(leading_number).unwrap_or(0.0)),
        total_units: field("total_units")
            .and_then(leading_number)
            .filter(|u| u.is_finite() && *u >= 0.0)
            .unwrap_or(0.0),
        major: non_empty_str(field("major"))
            .unwrap_or(ctx.major.as_str())
            .to_string(),
        target_uc: non_empty_str(field("target_uc"))
            .unwrap_or(ctx.target_institution.as_str())
            .to_string(),
    }
}

fn normalize_major_requirements(value: Option<&Value>) -> MajorRequirementStatus {
    let list = |key: &str, status: RequirementStatus| -> Vec<RequirementArea> {
        value
            .and_then(|v| v.get(key))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| normalize_requirement(item, status))
                    .collect()
            })
            .unwrap_or_default()
    };

    MajorRequirementStatus {
        completed: list("completed", RequirementStatus::Completed),
        missing: list("missing", RequirementStatus::Missing),
    }
}

/// Status comes from the list the item sits in, not from the item itself.
fn normalize_requirement(item: &Value, status: RequirementStatus) -> Option<RequirementArea> {
    if let Some(name) = non_empty_str(Some(item)) {
        return Some(RequirementArea {
            name: name.to_string(),
            status,
            matched_course: None,
            codes: Vec::new(),
        });
    }
    if !item.is_object() {
        return None;
    }

    let name = non_empty_str(item.get("name"))
        .or_else(|| non_empty_str(item.get("requirement")))
        .unwrap_or(UNNAMED_REQUIREMENT);
    let codes = ["codes", "acceptable_codes", "acceptable_courses"]
        .into_iter()
        .find_map(|key| string_list(item.get(key)))
        .unwrap_or_default();

    Some(RequirementArea {
        name: name.to_string(),
        status,
        matched_course: non_empty_str(item.get("matched_course")).map(str::to_string),
        codes,
    })
}

fn normalize_risks(value: Option<&Value>) -> Vec<Risk> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            if let Some(message) = item.as_str() {
                return Some(Risk {
                    risk_type: DEFAULT_RISK_TYPE.to_string(),
                    severity: Severity::default(),
                    message: message.to_string(),
                });
            }
            item.is_object().then(|| Risk {
                risk_type: non_empty_str(item.get("type"))
                    .unwrap_or(DEFAULT_RISK_TYPE)
                    .to_string(),
                severity: item
                    .get("severity")
                    .and_then(Value::as_str)
                    .and_then(Severity::parse_lenient)
                    .unwrap_or_default(),
                message: item
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}

/// Always returns the 11 canonical areas. Unknown keys are dropped, missing
/// ones are filled as incomplete with the catalog's suggested courses.
fn normalize_general_ed(value: Option<&Value>) -> BTreeMap<AreaId, GeneralEdArea> {
    let mut areas = default_general_ed();
    let Some(supplied) = value.and_then(Value::as_object) else {
        return areas;
    };

    for (key, entry) in supplied {
        let Ok(id) = key.parse::<AreaId>() else {
            continue;
        };
        if !entry.is_object() {
            continue;
        }
        let completed = entry
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let default_needed = || {
            if completed {
                Vec::new()
            } else {
                GeneralEdArea::incomplete(id).courses_needed
            }
        };

        areas.insert(
            id,
            GeneralEdArea {
                name: non_empty_str(entry.get("name"))
                    .unwrap_or(id.definition().name)
                    .to_string(),
                completed,
                satisfied_by: non_empty_str(entry.get("satisfied_by")).map(str::to_string),
                courses_needed: string_list(entry.get("courses_needed"))
                    .unwrap_or_else(default_needed),
            },
        );
    }
    areas
}

fn normalize_sources(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut sources = default_sources();
    if let Some(supplied) = value.and_then(Value::as_object) {
        for (key, url) in supplied {
            if let Some(url) = non_empty_str(Some(url)) {
                sources.insert(key.clone(), url.to_string());
            }
        }
    }
    sources
}
