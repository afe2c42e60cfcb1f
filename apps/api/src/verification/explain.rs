//! Plain-language companion text for a `VerificationResult`.

use serde::Serialize;

use crate::verification::models::{EligibilityStatus, Severity, VerificationResult};

const MISSING_PREP_DETAIL_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItem {
    /// 1 is most urgent.
    pub priority: u8,
    pub action: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub summary: String,
    pub action_items: Vec<ActionItem>,
}

impl Explanation {
    pub fn for_result(result: &VerificationResult) -> Self {
        Self {
            summary: summary_paragraph(result),
            action_items: action_items(result),
        }
    }
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

pub fn summary_paragraph(result: &VerificationResult) -> String {
    let summary = &result.summary;
    let mut parts = Vec::with_capacity(5);

    parts.push(match result.eligibility_status {
        EligibilityStatus::LikelyEligible => format!(
            "You appear to be on track for transferring to {} for {}.",
            summary.target_uc, summary.major
        ),
        EligibilityStatus::Conditional => format!(
            "You're making good progress toward transferring to {} for {}, but there are some items you'll need to address.",
            summary.target_uc, summary.major
        ),
        EligibilityStatus::NotYetEligible => format!(
            "You're working toward transferring to {} for {}, and there are several items that need attention.",
            summary.target_uc, summary.major
        ),
    });

    parts.push(format!(
        "Currently, you have {} transferable units and a {} GPA.",
        summary.total_units, summary.gpa
    ));

    let missing = result.major_requirements.missing.len();
    if missing > 0 {
        parts.push(format!(
            "You still need to complete {missing} major preparation {}.",
            plural(missing, "course", "courses")
        ));
    }

    let high = result
        .risks
        .iter()
        .filter(|r| r.severity == Severity::High)
        .count();
    if high > 0 {
        parts.push(format!(
            "There {} {high} important {} to address before applying.",
            plural(high, "is", "are"),
            plural(high, "issue", "issues")
        ));
    }

    parts.push(
        "Remember to verify all information with an academic counselor, as requirements can change and individual situations vary."
            .to_string(),
    );

    parts.join(" ")
}

fn item(priority: u8, action: &str, details: &[&str]) -> ActionItem {
    ActionItem {
        priority,
        action: action.to_string(),
        details: details.iter().map(|d| d.to_string()).collect(),
    }
}

/// Prioritized next steps, most urgent first. Ties keep insertion order.
pub fn action_items(result: &VerificationResult) -> Vec<ActionItem> {
    let mut items = Vec::new();

    let missing = &result.major_requirements.missing;
    if !missing.is_empty() {
        items.push(ActionItem {
            priority: 1,
            action: "Complete missing major prep courses".to_string(),
            details: missing
                .iter()
                .take(MISSING_PREP_DETAIL_LIMIT)
                .map(|m| m.name.clone())
                .collect(),
        });
    }

    let of_type = |kind: &str| {
        result
            .risks
            .iter()
            .find(|r| r.risk_type.eq_ignore_ascii_case(kind))
    };

    if of_type("GPA").is_some() {
        items.push(item(
            2,
            "Improve your GPA",
            &[
                "Focus on getting A's and B's in remaining courses",
                "Consider retaking courses where you got C's or lower",
            ],
        ));
    }

    if let Some(risk) = of_type("Units") {
        items.push(if risk.severity == Severity::High {
            item(
                1,
                "Earn more transferable units",
                &[
                    "You need at least 60 semester units to transfer",
                    "Make sure all courses are UC-transferable",
                ],
            )
        } else {
            item(
                3,
                "Watch your unit count",
                &[
                    "Extra units beyond the cap may not transfer",
                    "Plan your remaining courses carefully",
                ],
            )
        });
    }

    items.push(item(
        4,
        "Meet with an academic counselor",
        &[
            "Review this verification with a counselor",
            "Create a personalized education plan",
        ],
    ));

    // sort_by_key is stable
    items.sort_by_key(|i| i.priority);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::engine::local_determination;
    use crate::verification::models::{AnalysisContext, Risk};

    fn base() -> VerificationResult {
        let ctx = AnalysisContext {
            major: "Biology".to_string(),
            target_institution: "UC Davis".to_string(),
        };
        let mut result = local_determination(&[], &ctx, "offline");
        result.risks.clear();
        result.major_requirements.missing.clear();
        result
    }

    fn risk(kind: &str, severity: Severity) -> Risk {
        Risk {
            risk_type: kind.to_string(),
            severity,
            message: format!("{kind} problem"),
        }
    }

    #[test]
    fn test_summary_mentions_target_units_and_gpa() {
        let text = summary_paragraph(&base());
        assert!(text.starts_with("You're making good progress toward transferring to UC Davis for Biology"));
        assert!(text.contains("you have 0 transferable units and a 0.00 GPA."));
        assert!(text.ends_with("individual situations vary."));
        assert!(!text.contains("major preparation"));
    }

    #[test]
    fn test_summary_counts_missing_and_high_risks() {
        let mut result = local_determination(
            &[],
            &AnalysisContext {
                major: "Biology".to_string(),
                target_institution: "UC Davis".to_string(),
            },
            "offline",
        );
        result.risks = vec![risk("Units", Severity::High), risk("GPA", Severity::High)];
        let text = summary_paragraph(&result);
        assert!(text.contains("You still need to complete 1 major preparation course."));
        assert!(text.contains("There are 2 important issues to address"));
    }

    #[test]
    fn test_counselor_item_is_always_present_and_last() {
        let items = action_items(&base());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].priority, 4);
    }

    #[test]
    fn test_items_sorted_by_priority_and_stable() {
        let mut result = base();
        result.risks = vec![risk("GPA", Severity::Medium), risk("Units", Severity::High)];
        result.major_requirements = local_determination(
            &[],
            &AnalysisContext {
                major: "Biology".to_string(),
                target_institution: "UC Davis".to_string(),
            },
            "offline",
        )
        .major_requirements;

        let items = action_items(&result);
        let priorities: Vec<u8> = items.iter().map(|i| i.priority).collect();
        assert_eq!(priorities, [1, 1, 2, 4]);
        assert_eq!(items[0].action, "Complete missing major prep courses");
        assert_eq!(items[1].action, "Earn more transferable units");
        assert_eq!(items[0].details, ["AI unavailable"]);
    }

    #[test]
    fn test_non_high_unit_risk_is_priority_three() {
        let mut result = base();
        result.risks = vec![risk("units", Severity::Low)];
        let items = action_items(&result);
        assert_eq!(items[0].priority, 3);
        assert_eq!(items[0].action, "Watch your unit count");
    }
}
