// Prompt template for transfer-eligibility analysis.

use crate::catalog::{lookup_major, AreaId};
use crate::llm_client::prompts::{GRADE_SCALE_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::transcript::courses::CourseRecord;
use crate::verification::models::AnalysisContext;

/// Analysis template. Replace `{target}`, `{major}`, `{courses}`,
/// `{major_requirements}`, `{grade_scale}`, `{areas}` and `{json_only}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze these community college courses for UC transfer to {target} as {major} major.

STUDENT'S COURSES:
{courses}

MAJOR REQUIREMENTS: {major_requirements}

TASK:
1. Calculate GPA using: {grade_scale}
2. Determine which major prep courses are completed vs missing
3. Check ALL 11 IGETC areas - determine which courses satisfy each area

IGETC AREAS:
{areas}

{json_only}

Use exactly this shape:
{"eligibility_status":"likely_eligible","summary":{"gpa":"3.50","total_units":30,"major":"{major}","target_uc":"{target}"},"major_requirements":{"completed":[{"name":"Calculus I","matched_course":"MATH 1A - Calculus I"}],"missing":[{"name":"Linear Algebra","codes":["MATH 21","MATH 6"]}]},"risks":[{"type":"Units","severity":"high","message":"Need 60 units minimum"}],"igetc_status":{"1A":{"name":"English Composition","completed":true,"satisfied_by":"EWRT 1A - English Composition","courses_needed":[]},"1B":{"name":"Critical Thinking","completed":false,"satisfied_by":null,"courses_needed":["EWRT 2","ENGL 1B"]},"1C":{"name":"Oral Communication","completed":false,"satisfied_by":null,"courses_needed":["COMM 1","SPCH 1"]},"2":{"name":"Mathematical Concepts","completed":true,"satisfied_by":"MATH 1A - Calculus I","courses_needed":[]},"3A":{"name":"Arts","completed":false,"satisfied_by":null,"courses_needed":["ART 1","MUS 1"]},"3B":{"name":"Humanities","completed":false,"satisfied_by":null,"courses_needed":["PHIL 1","HIST 4A"]},"4":{"name":"Social Sciences","completed":false,"satisfied_by":null,"courses_needed":["PSYCH 1","SOC 1"]},"5A":{"name":"Physical Science","completed":true,"satisfied_by":"PHYS 4A - Physics","courses_needed":[]},"5B":{"name":"Biological Science","completed":false,"satisfied_by":null,"courses_needed":["BIOL 6A"]},"5C":{"name":"Lab Science","completed":true,"satisfied_by":"PHYS 4A Lab","courses_needed":[]},"6":{"name":"Language Other Than English","completed":false,"satisfied_by":null,"courses_needed":["SPAN 1","FREN 1","ASL 1"]}},"notes":["Strong progress on major requirements"],"sources":{"assist_org":"https://assist.org"}}

eligibility_status is one of likely_eligible, conditional, not_yet_eligible. Severity is one of low, medium, high."#;

/// One `- id: name (examples)` line per area, in canonical order.
fn render_areas() -> String {
    AreaId::ALL
        .iter()
        .map(|id| {
            let def = id.definition();
            format!("- {}: {} ({})", id, def.name, def.examples)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fills `{key}` placeholders in one pass. Inserted values are never
/// rescanned, so user text that looks like a placeholder stays literal.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values.iter().find(|(key, _)| {
            tail.strip_prefix(key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Renders the analysis prompt for the given courses and target.
pub fn build_analysis_prompt(courses: &[CourseRecord], ctx: &AnalysisContext) -> String {
    let course_lines = courses
        .iter()
        .map(CourseRecord::prompt_line)
        .collect::<Vec<_>>()
        .join("\n");
    let major_requirements = lookup_major(&ctx.major).prompt_line();
    let areas = render_areas();

    fill_placeholders(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("courses", course_lines.as_str()),
            ("major_requirements", major_requirements.as_str()),
            ("grade_scale", GRADE_SCALE_INSTRUCTION),
            ("areas", areas.as_str()),
            ("json_only", JSON_ONLY_INSTRUCTION),
            ("major", ctx.major.as_str()),
            ("target", ctx.target_institution.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Grade;
    use crate::transcript::courses::{CourseDraft, CourseList};

    fn ctx(major: &str) -> AnalysisContext {
        AnalysisContext {
            major: major.to_string(),
            target_institution: "UC Davis".to_string(),
        }
    }

    fn sample_courses() -> Vec<CourseRecord> {
        let mut list = CourseList::new();
        list.add(CourseDraft {
            course_code: "MATH 1A".to_string(),
            course_name: "Calculus I".to_string(),
            units: 5.0,
            grade: Grade::A,
            semester: "Fall 2023".to_string(),
        });
        list.add(CourseDraft {
            course_code: "EWRT 1A".to_string(),
            course_name: "Composition".to_string(),
            units: 5.0,
            grade: Grade::Pass,
            semester: "Fall 2023".to_string(),
        });
        list.snapshot()
    }

    #[test]
    fn test_lists_one_line_per_course() {
        let prompt = build_analysis_prompt(&sample_courses(), &ctx("Computer Science"));
        assert!(prompt.contains("MATH 1A - Calculus I (5u, A)\nEWRT 1A - Composition (5u, P)"));
    }

    #[test]
    fn test_names_target_and_major_everywhere() {
        let prompt = build_analysis_prompt(&sample_courses(), &ctx("Psychology"));
        assert!(prompt.starts_with("Analyze these community college courses for UC transfer to UC Davis as Psychology major."));
        assert!(prompt.contains(r#""major":"Psychology","target_uc":"UC Davis""#));
        assert!(prompt.contains("MAJOR REQUIREMENTS: Intro Psych, Stats, Research Methods, Bio. GPA 2.5+, 60 units"));
    }

    #[test]
    fn test_lists_all_general_ed_areas() {
        let prompt = build_analysis_prompt(&[], &ctx("Computer Science"));
        for id in AreaId::ALL {
            assert!(prompt.contains(&format!("- {}: {}", id, id.definition().name)));
        }
        assert!(prompt.contains(GRADE_SCALE_INSTRUCTION));
        assert!(prompt.contains(JSON_ONLY_INSTRUCTION));
    }

    #[test]
    fn test_leaves_no_placeholders() {
        let prompt = build_analysis_prompt(&sample_courses(), &ctx("Biology"));
        for placeholder in [
            "{courses}",
            "{major_requirements}",
            "{grade_scale}",
            "{areas}",
            "{json_only}",
            "{major}",
            "{target}",
        ] {
            assert!(!prompt.contains(placeholder), "left {placeholder}");
        }
    }

    #[test]
    fn test_placeholder_like_user_text_stays_literal() {
        let mut list = CourseList::new();
        list.add(CourseDraft {
            course_code: "HIST 4A".to_string(),
            course_name: "Braces {areas} {major} {target}".to_string(),
            units: 4.0,
            grade: Grade::B,
            semester: "Fall 2023".to_string(),
        });
        let c = AnalysisContext {
            major: "Biology {target}".to_string(),
            target_institution: "UC Davis".to_string(),
        };

        let prompt = build_analysis_prompt(&list.snapshot(), &c);
        assert!(prompt.contains("HIST 4A - Braces {areas} {major} {target} (4u, B)"));
        assert!(prompt.contains("to UC Davis as Biology {target} major."));
        assert_eq!(prompt.matches("- 1A: ").count(), 1);
    }

    #[test]
    fn test_unknown_braces_are_kept() {
        assert_eq!(
            fill_placeholders(r#"{"a":{x}} {y"#, &[("x", "1")]),
            r#"{"a":1} {y"#
        );
    }

    #[test]
    fn test_is_deterministic() {
        let courses = sample_courses();
        let c = ctx("Computer Science");
        assert_eq!(build_analysis_prompt(&courses, &c), build_analysis_prompt(&courses, &c));
    }
}
