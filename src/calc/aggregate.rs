use crate::calc::record::{AssessmentComponent, AssessmentRecord};
use crate::calc::round_off_2_decimals;
use serde::{Deserialize, Serialize};

/// Share of each assessment type in a subject's weighted total. The weights
/// are fixed per subject no matter how many components each type has.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub fa: f64,
    pub ia: f64,
    pub ca: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fa: 0.30,
            ia: 0.40,
            ca: 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAggregate {
    pub fa_pct: f64,
    pub ia_pct: f64,
    pub ca_pct: f64,
    pub weighted_total: f64,
}

impl SubjectAggregate {
    pub fn rounded(&self) -> Self {
        Self {
            fa_pct: round_off_2_decimals(self.fa_pct),
            ia_pct: round_off_2_decimals(self.ia_pct),
            ca_pct: round_off_2_decimals(self.ca_pct),
            weighted_total: round_off_2_decimals(self.weighted_total),
        }
    }
}

/// Mean percentage over the entered components. Components with no score
/// are skipped; a list with nothing entered contributes 0.
pub fn component_mean_percent(components: &[AssessmentComponent]) -> f64 {
    let mut sum_pct = 0.0_f64;
    let mut counted: usize = 0;
    for c in components {
        if let Some(pct) = c.percent() {
            sum_pct += pct;
            counted += 1;
        }
    }
    if counted > 0 {
        sum_pct / (counted as f64)
    } else {
        0.0
    }
}

pub fn aggregate(record: &AssessmentRecord, weights: &ScoreWeights) -> SubjectAggregate {
    let fa_pct = component_mean_percent(&record.formative);
    let ia_pct = component_mean_percent(&record.integrated);
    let ca_pct = match record.comprehensive.score {
        Some(v) if record.comprehensive.max_score > 0.0 => {
            100.0 * v / record.comprehensive.max_score
        }
        _ => 0.0,
    };

    SubjectAggregate {
        fa_pct,
        ia_pct,
        ca_pct,
        weighted_total: fa_pct * weights.fa + ia_pct * weights.ia + ca_pct * weights.ca,
    }
}
