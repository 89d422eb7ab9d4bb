use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_COMPREHENSIVE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "Semester 1")]
    First,
    #[serde(rename = "Semester 2")]
    Second,
    #[serde(rename = "Semester 3")]
    Third,
}

impl Semester {
    pub const ALL: [Semester; 3] = [Semester::First, Semester::Second, Semester::Third];

    pub fn as_str(self) -> &'static str {
        match self {
            Semester::First => "Semester 1",
            Semester::Second => "Semester 2",
            Semester::Third => "Semester 3",
        }
    }

    pub fn number(self) -> i64 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
            Semester::Third => 3,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Semester::First),
            2 => Some(Semester::Second),
            3 => Some(Semester::Third),
            _ => None,
        }
    }

    /// Accepts "Semester 1", "semester1", "S1" and bare "1".
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let digit = compact
            .strip_prefix("semester")
            .or_else(|| compact.strip_prefix('s'))
            .unwrap_or(&compact);
        match digit {
            "1" => Some(Semester::First),
            "2" => Some(Semester::Second),
            "3" => Some(Semester::Third),
            _ => None,
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectCategory {
    CoreSpecific,
    CoreGeneral,
    Complementary,
}

impl SubjectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectCategory::CoreSpecific => "CoreSpecific",
            SubjectCategory::CoreGeneral => "CoreGeneral",
            SubjectCategory::Complementary => "Complementary",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "corespecific" | "specific" => Some(SubjectCategory::CoreSpecific),
            "coregeneral" | "general" => Some(SubjectCategory::CoreGeneral),
            "complementary" => Some(SubjectCategory::Complementary),
            _ => None,
        }
    }
}

/// Identity of one stored record: student x subject x class x year x semester.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub student_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub academic_year: String,
    pub semester: Semester,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.student_id, self.subject_id, self.class_id, self.academic_year, self.semester
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentComponent {
    pub label: String,
    pub max_score: f64,
    /// `None` is "not yet entered", which is not the same as a zero.
    pub score: Option<f64>,
}

impl AssessmentComponent {
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(&self.label, self.max_score)
    }

    pub fn percent(&self) -> Option<f64> {
        match self.score {
            Some(v) if self.max_score > 0.0 => Some(100.0 * v / self.max_score),
            _ => None,
        }
    }
}

/// Composite `(label, maxScore)` key that makes FA/IA lists mergeable
/// regardless of the order entries were submitted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    label: String,
    max_bits: u64,
}

impl ComponentKey {
    pub fn new(label: &str, max_score: f64) -> Self {
        // +0.0 folds -0.0 into 0.0 so both hash the same.
        Self {
            label: label.to_string(),
            max_bits: (max_score + 0.0).to_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comprehensive {
    pub score: Option<f64>,
    pub max_score: f64,
}

impl Default for Comprehensive {
    fn default() -> Self {
        Self {
            score: None,
            max_score: DEFAULT_COMPREHENSIVE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    #[serde(flatten)]
    pub key: RecordKey,
    #[serde(default)]
    pub formative: Vec<AssessmentComponent>,
    #[serde(default)]
    pub integrated: Vec<AssessmentComponent>,
    #[serde(default)]
    pub comprehensive: Comprehensive,
}

impl AssessmentRecord {
    pub fn empty(key: RecordKey) -> Self {
        Self {
            key,
            formative: Vec::new(),
            integrated: Vec::new(),
            comprehensive: Comprehensive::default(),
        }
    }

    pub fn has_any_score(&self) -> bool {
        self.formative.iter().any(|c| c.score.is_some())
            || self.integrated.iter().any(|c| c.score.is_some())
            || self.comprehensive.score.is_some()
    }

    /// Submission-shaped copy of this record; merging it onto nothing
    /// reproduces the record.
    #[cfg(test)]
    pub fn to_submission(&self) -> PartialAssessmentRecord {
        PartialAssessmentRecord {
            key: self.key.clone(),
            formative: self.formative.clone(),
            integrated: self.integrated.clone(),
            comprehensive: Some(PartialComprehensive {
                score: self.comprehensive.score,
                max_score: Some(self.comprehensive.max_score),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialComprehensive {
    pub score: Option<f64>,
    pub max_score: Option<f64>,
}

/// A normalized incoming submission. Absent lists are empty and absent
/// scores are `None`; nothing here is ever "empty string".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAssessmentRecord {
    #[serde(flatten)]
    pub key: RecordKey,
    #[serde(default)]
    pub formative: Vec<AssessmentComponent>,
    #[serde(default)]
    pub integrated: Vec<AssessmentComponent>,
    #[serde(default)]
    pub comprehensive: Option<PartialComprehensive>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_parse_accepts_loose_spellings() {
        assert_eq!(Semester::parse("Semester 1"), Some(Semester::First));
        assert_eq!(Semester::parse("semester2"), Some(Semester::Second));
        assert_eq!(Semester::parse(" S3 "), Some(Semester::Third));
        assert_eq!(Semester::parse("3"), Some(Semester::Third));
        assert_eq!(Semester::parse("Semester 4"), None);
        assert_eq!(Semester::parse(""), None);
    }

    #[test]
    fn semester_serializes_with_display_name() {
        let v = serde_json::to_value(Semester::Second).expect("serialize");
        assert_eq!(v, serde_json::json!("Semester 2"));
    }

    #[test]
    fn category_parse_is_case_and_separator_insensitive() {
        assert_eq!(
            SubjectCategory::parse("core_specific"),
            Some(SubjectCategory::CoreSpecific)
        );
        assert_eq!(
            SubjectCategory::parse("Core General"),
            Some(SubjectCategory::CoreGeneral)
        );
        assert_eq!(
            SubjectCategory::parse("COMPLEMENTARY"),
            Some(SubjectCategory::Complementary)
        );
        assert_eq!(SubjectCategory::parse("elective"), None);
    }

    #[test]
    fn component_key_distinguishes_max_score() {
        let a = AssessmentComponent {
            label: "Quiz".into(),
            max_score: 20.0,
            score: Some(10.0),
        };
        let b = AssessmentComponent {
            label: "Quiz".into(),
            max_score: 10.0,
            score: None,
        };
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), ComponentKey::new("Quiz", 20.0));
    }

    #[test]
    fn null_score_has_no_percent_but_zero_does() {
        let mut c = AssessmentComponent {
            label: "FA1".into(),
            max_score: 20.0,
            score: None,
        };
        assert_eq!(c.percent(), None);
        c.score = Some(0.0);
        assert_eq!(c.percent(), Some(0.0));
    }
}
