//! The 11-area general-education framework (1A through 6).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical area identifiers. Declaration order is the display order, and
/// the derived `Ord` keeps `BTreeMap` iteration in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AreaId {
    #[serde(rename = "1A")]
    A1A,
    #[serde(rename = "1B")]
    A1B,
    #[serde(rename = "1C")]
    A1C,
    #[serde(rename = "2")]
    A2,
    #[serde(rename = "3A")]
    A3A,
    #[serde(rename = "3B")]
    A3B,
    #[serde(rename = "4")]
    A4,
    #[serde(rename = "5A")]
    A5A,
    #[serde(rename = "5B")]
    A5B,
    #[serde(rename = "5C")]
    A5C,
    #[serde(rename = "6")]
    A6,
}

impl AreaId {
    pub const ALL: [AreaId; 11] = [
        AreaId::A1A,
        AreaId::A1B,
        AreaId::A1C,
        AreaId::A2,
        AreaId::A3A,
        AreaId::A3B,
        AreaId::A4,
        AreaId::A5A,
        AreaId::A5B,
        AreaId::A5C,
        AreaId::A6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AreaId::A1A => "1A",
            AreaId::A1B => "1B",
            AreaId::A1C => "1C",
            AreaId::A2 => "2",
            AreaId::A3A => "3A",
            AreaId::A3B => "3B",
            AreaId::A4 => "4",
            AreaId::A5A => "5A",
            AreaId::A5B => "5B",
            AreaId::A5C => "5C",
            AreaId::A6 => "6",
        }
    }

    pub fn definition(self) -> &'static GeneralEdDefinition {
        // GENERAL_ED_AREAS is laid out in AreaId::ALL order.
        &GENERAL_ED_AREAS[self as usize]
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown general-education area '{0}'")]
pub struct UnknownArea(pub String);

impl FromStr for AreaId {
    type Err = UnknownArea;

    /// Accepts `1A`, `1a`, ` 1A `, and `Area 1A`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let key = upper.strip_prefix("AREA").unwrap_or(&upper).trim();
        AreaId::ALL
            .into_iter()
            .find(|a| a.as_str() == key)
            .ok_or_else(|| UnknownArea(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeneralEdDefinition {
    pub id: AreaId,
    pub name: &'static str,
    /// Qualifying course families, as shown to the analysis service.
    pub examples: &'static str,
    /// Suggested courses reported when the area is not yet satisfied.
    pub default_needed: &'static [&'static str],
}

pub const GENERAL_ED_AREAS: [GeneralEdDefinition; 11] = [
    GeneralEdDefinition {
        id: AreaId::A1A,
        name: "English Composition",
        examples: "EWRT 1A, ENGL 1A, etc.",
        default_needed: &["EWRT 1A", "ENGL 1A"],
    },
    GeneralEdDefinition {
        id: AreaId::A1B,
        name: "Critical Thinking",
        examples: "EWRT 2, ENGL 1B, etc.",
        default_needed: &["EWRT 2", "ENGL 1B"],
    },
    GeneralEdDefinition {
        id: AreaId::A1C,
        name: "Oral Communication",
        examples: "COMM 1, SPCH 1, etc.",
        default_needed: &["COMM 1", "SPCH 1"],
    },
    GeneralEdDefinition {
        id: AreaId::A2,
        name: "Mathematical Concepts",
        examples: "any MATH course",
        default_needed: &["MATH 1A"],
    },
    GeneralEdDefinition {
        id: AreaId::A3A,
        name: "Arts",
        examples: "ART, MUS, THEA, DANC courses",
        default_needed: &["ART 1", "MUS 1"],
    },
    GeneralEdDefinition {
        id: AreaId::A3B,
        name: "Humanities",
        examples: "PHIL, HIST, HUMN, LIT courses",
        default_needed: &["PHIL 1", "HIST 4A"],
    },
    GeneralEdDefinition {
        id: AreaId::A4,
        name: "Social Sciences",
        examples: "PSYCH, SOC, POLI, ECON, ANTH courses",
        default_needed: &["PSYCH 1", "SOC 1"],
    },
    GeneralEdDefinition {
        id: AreaId::A5A,
        name: "Physical Science",
        examples: "PHYS, CHEM, GEOL, ASTR courses",
        default_needed: &["PHYS 4A", "CHEM 1A"],
    },
    GeneralEdDefinition {
        id: AreaId::A5B,
        name: "Biological Science",
        examples: "BIOL, ZOOL courses",
        default_needed: &["BIOL 6A"],
    },
    GeneralEdDefinition {
        id: AreaId::A5C,
        name: "Lab Science",
        examples: "any lab component from 5A or 5B",
        default_needed: &["Lab course from 5A or 5B"],
    },
    GeneralEdDefinition {
        id: AreaId::A6,
        name: "Language Other Than English",
        examples: "SPAN, FREN, ASL, CHIN, JAPN, etc.",
        default_needed: &["SPAN 1", "FREN 1", "ASL 1"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_line_up_with_ids() {
        for id in AreaId::ALL {
            assert_eq!(id.definition().id, id);
        }
    }

    #[test]
    fn test_every_area_has_default_courses() {
        assert!(GENERAL_ED_AREAS.iter().all(|d| !d.default_needed.is_empty()));
    }

    #[test]
    fn test_area_id_parsing() {
        assert_eq!("1a".parse::<AreaId>().unwrap(), AreaId::A1A);
        assert_eq!(" 5C ".parse::<AreaId>().unwrap(), AreaId::A5C);
        assert_eq!("Area 4".parse::<AreaId>().unwrap(), AreaId::A4);
        assert!("7".parse::<AreaId>().is_err());
        assert!("1D".parse::<AreaId>().is_err());
    }

    #[test]
    fn test_area_id_serializes_as_canonical_key() {
        assert_eq!(serde_json::to_string(&AreaId::A3B).unwrap(), r#""3B""#);
        let id: AreaId = serde_json::from_str(r#""6""#).unwrap();
        assert_eq!(id, AreaId::A6);
    }
}
