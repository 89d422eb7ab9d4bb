use crate::calc::record::Semester;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterAverage {
    pub semester: Semester,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupResult {
    pub annual_average: Option<f64>,
    pub used_annual: bool,
    /// Latest semester with a positive average, set only when the annual
    /// figure is unavailable.
    pub fallback: Option<SemesterAverage>,
}

impl RollupResult {
    /// The figure a verdict should be computed from, if any.
    pub fn basis(&self) -> Option<f64> {
        self.annual_average
            .or_else(|| self.fallback.map(|f| f.average))
    }
}

fn positive(per_semester: &BTreeMap<Semester, Option<f64>>, semester: Semester) -> Option<f64> {
    per_semester
        .get(&semester)
        .copied()
        .flatten()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Annual average when all three semesters carry a positive average;
/// otherwise the most recent usable semester (3, then 2, then 1).
pub fn rollup(per_semester: &BTreeMap<Semester, Option<f64>>) -> RollupResult {
    let present: Vec<f64> = Semester::ALL
        .iter()
        .filter_map(|s| positive(per_semester, *s))
        .collect();

    if present.len() == Semester::ALL.len() {
        let annual = present.iter().sum::<f64>() / (present.len() as f64);
        return RollupResult {
            annual_average: Some(annual),
            used_annual: true,
            fallback: None,
        };
    }

    let fallback = Semester::ALL.iter().rev().find_map(|s| {
        positive(per_semester, *s).map(|average| SemesterAverage {
            semester: *s,
            average,
        })
    });
    RollupResult {
        annual_average: None,
        used_annual: false,
        fallback,
    }
}
