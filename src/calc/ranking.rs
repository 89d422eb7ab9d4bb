use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Scores closer than this are treated as a tie.
const TIE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortEntry {
    pub student_id: String,
    pub aggregate_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    pub position: usize,
    pub total_students: usize,
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub student_id: String,
    pub aggregate_score: f64,
    #[serde(flatten)]
    pub ranking: RankingResult,
}

/// Standard competition ranking ("1224"), best score first. Students with a
/// non-finite score are left out of the cohort. Ties are listed by student
/// id so output order is stable.
pub fn rank_ordered(cohort: &[CohortEntry]) -> Vec<RankedStudent> {
    let mut sorted: Vec<&CohortEntry> = cohort
        .iter()
        .filter(|e| e.aggregate_score.is_finite())
        .collect();
    sorted.sort_by(|a, b| {
        b.aggregate_score
            .partial_cmp(&a.aggregate_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let total = sorted.len();
    let mut out = Vec::with_capacity(total);
    let mut position = 0_usize;
    let mut prev_score: Option<f64> = None;
    for (i, entry) in sorted.into_iter().enumerate() {
        let tied = prev_score
            .map(|p| (p - entry.aggregate_score).abs() < TIE_EPSILON)
            .unwrap_or(false);
        if !tied {
            position = i + 1;
            prev_score = Some(entry.aggregate_score);
        }
        let percentile = (100.0 * (total - position) as f64 / total as f64).clamp(0.0, 100.0);
        out.push(RankedStudent {
            student_id: entry.student_id.clone(),
            aggregate_score: entry.aggregate_score,
            ranking: RankingResult {
                position,
                total_students: total,
                percentile,
            },
        });
    }
    out
}

pub fn rank(cohort: &[CohortEntry]) -> BTreeMap<String, RankingResult> {
    rank_ordered(cohort)
        .into_iter()
        .map(|r| (r.student_id, r.ranking))
        .collect()
}
