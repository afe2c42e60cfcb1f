use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{AreaId, ASSIST_ORG_URL};

/// Coarse transfer-readiness verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    LikelyEligible,
    #[default]
    Conditional,
    NotYetEligible,
}

impl EligibilityStatus {
    /// Lenient parse: case-insensitive, spaces and hyphens treated as underscores.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "likely_eligible" => Some(Self::LikelyEligible),
            "conditional" => Some(Self::Conditional),
            "not_yet_eligible" => Some(Self::NotYetEligible),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Completed,
    Missing,
}

/// One major-preparation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementArea {
    pub name: String,
    pub status: RequirementStatus,
    pub matched_course: Option<String>,
    /// Courses that would satisfy a missing item.
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MajorRequirementStatus {
    pub completed: Vec<RequirementArea>,
    pub missing: Vec<RequirementArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(rename = "type")]
    pub risk_type: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralEdArea {
    pub name: String,
    pub completed: bool,
    pub satisfied_by: Option<String>,
    pub courses_needed: Vec<String>,
}

impl GeneralEdArea {
    /// Unsatisfied area with the catalog's suggested courses.
    pub fn incomplete(id: AreaId) -> Self {
        let def = id.definition();
        Self {
            name: def.name.to_string(),
            completed: false,
            satisfied_by: None,
            courses_needed: def.default_needed.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// All 11 areas, none completed.
pub fn default_general_ed() -> BTreeMap<AreaId, GeneralEdArea> {
    AreaId::ALL
        .into_iter()
        .map(|id| (id, GeneralEdArea::incomplete(id)))
        .collect()
}

pub fn default_sources() -> BTreeMap<String, String> {
    BTreeMap::from([("assist_org".to_string(), ASSIST_ORG_URL.to_string())])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Two-decimal string, e.g. `"3.67"`.
    pub gpa: String,
    pub total_units: f64,
    pub major: String,
    pub target_uc: String,
}

/// Full eligibility determination. Built fresh for every verification and
/// replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub eligibility_status: EligibilityStatus,
    pub summary: Summary,
    pub major_requirements: MajorRequirementStatus,
    pub risks: Vec<Risk>,
    /// Always exactly the 11 canonical areas.
    pub igetc_status: BTreeMap<AreaId, GeneralEdArea>,
    pub notes: Vec<String>,
    pub sources: BTreeMap<String, String>,
}

/// Who the verification is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisContext {
    pub major: String,
    pub target_institution: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_general_ed_has_all_areas_incomplete() {
        let areas = default_general_ed();
        assert_eq!(areas.len(), 11);
        assert!(areas.values().all(|a| !a.completed && !a.courses_needed.is_empty()));
        let keys: Vec<_> = areas.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            ["1A", "1B", "1C", "2", "3A", "3B", "4", "5A", "5B", "5C", "6"]
        );
    }

    #[test]
    fn test_status_lenient_parsing() {
        assert_eq!(
            EligibilityStatus::parse_lenient("Likely Eligible"),
            Some(EligibilityStatus::LikelyEligible)
        );
        assert_eq!(
            EligibilityStatus::parse_lenient("not-yet-eligible"),
            Some(EligibilityStatus::NotYetEligible)
        );
        assert_eq!(EligibilityStatus::parse_lenient("eligible"), None);
        assert_eq!(Severity::parse_lenient("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse_lenient("critical"), None);
    }

    #[test]
    fn test_risk_serializes_type_field() {
        let risk = Risk {
            risk_type: "Units".to_string(),
            severity: Severity::High,
            message: "Need 60 units minimum".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&risk).unwrap(),
            json!({"type": "Units", "severity": "high", "message": "Need 60 units minimum"})
        );
    }
}
