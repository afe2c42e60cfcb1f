//! Course records and the ordered per-session course list.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Grade;

const DEFAULT_CODE: &str = "UNKNOWN";
const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_UNITS: f64 = 3.0;
const DEFAULT_SEMESTER: &str = "Unknown";

/// Opaque course identity: a millisecond timestamp bumped past the last id
/// issued by the owning list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub u64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A course before it has been given an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub course_code: String,
    pub course_name: String,
    pub units: f64,
    pub grade: Grade,
    pub semester: String,
}

impl CourseDraft {
    /// Normalizes one element of the extraction response.
    ///
    /// Every field falls back to a fixed default when absent or unusable:
    /// code `UNKNOWN`, name `Unknown`, units 3 (unless a positive number),
    /// grade `P`, semester `Unknown`. Never fails.
    pub fn from_value(value: &Value) -> Self {
        Self {
            course_code: string_field(value, "courseCode", DEFAULT_CODE),
            course_name: string_field(value, "courseName", DEFAULT_NAME),
            units: value
                .get("units")
                .and_then(leading_number)
                .filter(|u| u.is_finite() && *u > 0.0)
                .unwrap_or(DEFAULT_UNITS),
            grade: value
                .get("grade")
                .and_then(Value::as_str)
                .and_then(|g| g.parse().ok())
                .unwrap_or(Grade::Pass),
            semester: string_field(value, "semester", DEFAULT_SEMESTER),
        }
    }
}

fn string_field(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Reads a number, or the numeric prefix of a string such as `"4.5 units"`.
pub(crate) fn leading_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: CourseId,
    pub course_code: String,
    pub course_name: String,
    pub units: f64,
    pub grade: Grade,
    pub semester: String,
}

impl CourseRecord {
    fn new(id: CourseId, draft: CourseDraft) -> Self {
        Self {
            id,
            course_code: draft.course_code,
            course_name: draft.course_name,
            units: draft.units,
            grade: draft.grade,
            semester: draft.semester,
        }
    }

    /// `CODE - Name (Nu, G)`, the line format used in the analysis prompt.
    pub fn prompt_line(&self) -> String {
        format!(
            "{} - {} ({}u, {})",
            self.course_code, self.course_name, self.units, self.grade
        )
    }
}

/// Insertion-ordered course list. Order only matters for display.
#[derive(Debug, Clone, Default)]
pub struct CourseList {
    courses: Vec<CourseRecord>,
    last_id: u64,
}

impl CourseList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a list from persisted records; new ids continue past the
    /// largest existing one.
    pub fn from_records(courses: Vec<CourseRecord>) -> Self {
        let last_id = courses.iter().map(|c| c.id.0).max().unwrap_or(0);
        Self { courses, last_id }
    }

    fn next_id(&mut self) -> CourseId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        CourseId(self.last_id)
    }

    pub fn add(&mut self, draft: CourseDraft) -> CourseRecord {
        let record = CourseRecord::new(self.next_id(), draft);
        self.courses.push(record.clone());
        record
    }

    pub fn extend(&mut self, drafts: impl IntoIterator<Item = CourseDraft>) -> Vec<CourseRecord> {
        drafts.into_iter().map(|d| self.add(d)).collect()
    }

    pub fn remove(&mut self, id: CourseId) -> Option<CourseRecord> {
        let idx = self.courses.iter().position(|c| c.id == id)?;
        Some(self.courses.remove(idx))
    }

    pub fn clear(&mut self) {
        self.courses.clear();
    }

    /// Immutable copy handed to a pipeline invocation.
    pub fn snapshot(&self) -> Vec<CourseRecord> {
        self.courses.clone()
    }
}
