use serde::Serialize;

/// Major preparation summary for one major at the target institution.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MajorRequirements {
    pub name: &'static str,
    /// Free-text course list embedded verbatim in the analysis prompt.
    pub description: &'static str,
    pub min_gpa: f64,
    pub min_units: f64,
}

impl MajorRequirements {
    /// One-line rendering used by the analysis prompt.
    pub fn prompt_line(&self) -> String {
        format!(
            "{}. GPA {:.1}+, {} units",
            self.description, self.min_gpa, self.min_units
        )
    }
}

pub const DEFAULT_MAJOR: &str = "Computer Science";

pub const MAJORS: &[MajorRequirements] = &[
    MajorRequirements {
        name: "Computer Science",
        description: "Calc I&II, Intro Programming, Data Structures, Linear Algebra, Physics",
        min_gpa: 3.0,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Biology",
        description: "Bio I&II, Chem I&II, Organic Chem, Calc, Physics",
        min_gpa: 2.8,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Psychology",
        description: "Intro Psych, Stats, Research Methods, Bio",
        min_gpa: 2.5,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Mathematics",
        description: "Calc I-III, Linear Algebra, Diff Eq",
        min_gpa: 3.0,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Physics",
        description: "Calc I-III, Physics I-III, Linear Algebra",
        min_gpa: 3.0,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Chemistry",
        description: "Chem I&II, Organic I&II, Calc, Physics",
        min_gpa: 3.0,
        min_units: 60.0,
    },
    MajorRequirements {
        name: "Economics",
        description: "Micro, Macro, Calc, Stats",
        min_gpa: 3.0,
        min_units: 60.0,
    },
];

/// Looks up a major by name (case-insensitive). Unknown majors resolve to
/// the Computer Science requirement set.
pub fn lookup_major(name: &str) -> &'static MajorRequirements {
    let wanted = name.trim();
    MAJORS
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(wanted))
        .unwrap_or(&MAJORS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_major() {
        assert_eq!(lookup_major("Biology").name, "Biology");
        assert_eq!(lookup_major("  economics ").name, "Economics");
    }

    #[test]
    fn test_unknown_major_falls_back_to_default() {
        let m = lookup_major("Underwater Basket Weaving");
        assert_eq!(m.name, DEFAULT_MAJOR);
    }

    #[test]
    fn test_prompt_line_carries_thresholds() {
        let line = lookup_major("Psychology").prompt_line();
        assert_eq!(
            line,
            "Intro Psych, Stats, Research Methods, Bio. GPA 2.5+, 60 units"
        );
    }

    #[test]
    fn test_every_major_requires_sixty_units() {
        assert!(MAJORS.iter().all(|m| (m.min_units - 60.0).abs() < f64::EPSILON));
    }
}
