use crate::calc::record::SubjectCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "C")]
    Competent,
    #[serde(rename = "NYC")]
    NotYetCompetent,
}

/// Pass marks per subject category. A verdict passes only when the average
/// is strictly above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyThresholds {
    pub core_specific: f64,
    pub core_general: f64,
    pub complementary: f64,
}

impl Default for CompetencyThresholds {
    fn default() -> Self {
        Self {
            core_specific: 70.0,
            core_general: 60.0,
            complementary: 50.0,
        }
    }
}

impl CompetencyThresholds {
    pub fn threshold_for(&self, category: SubjectCategory) -> f64 {
        match category {
            SubjectCategory::CoreSpecific => self.core_specific,
            SubjectCategory::CoreGeneral => self.core_general,
            SubjectCategory::Complementary => self.complementary,
        }
    }

    /// The C/NYC label printed on reports. NaN never passes.
    pub fn classify(&self, category: SubjectCategory, average: f64) -> Verdict {
        if average > self.threshold_for(category) {
            Verdict::Competent
        } else {
            Verdict::NotYetCompetent
        }
    }

    /// Display check only: decides whether a value gets failure emphasis.
    /// Zero and NaN mean "nothing entered yet" and are never flagged, even
    /// though `classify` still resolves them to NYC.
    pub fn is_competent(&self, category: SubjectCategory, average: f64) -> bool {
        if average == 0.0 || average.is_nan() {
            return true;
        }
        average > self.threshold_for(category)
    }
}
