use crate::calc::aggregate::{aggregate, SubjectAggregate};
use crate::calc::competency::Verdict;
use crate::calc::ranking::{rank, CohortEntry, RankingResult};
use crate::calc::record::{AssessmentRecord, Semester, SubjectCategory};
use crate::calc::rollup::{rollup, RollupResult, SemesterAverage};
use crate::calc::round_off_2_decimals;
use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMeta {
    pub id: String,
    pub name: String,
    pub category: SubjectCategory,
    pub credits: f64,
}

impl SubjectMeta {
    /// Stand-in for a subject with no metadata row: default category, no
    /// credits.
    fn unregistered(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            category: SubjectCategory::Complementary,
            credits: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankScope {
    Semester(Semester),
    Annual,
}

impl RankScope {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("annual") {
            return Some(RankScope::Annual);
        }
        Semester::parse(raw).map(RankScope::Semester)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RankScope::Semester(s) => s.as_str(),
            RankScope::Annual => "annual",
        }
    }
}

/// `la` is the integrated-assessment percentage, named as on printed reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentPercentages {
    pub fa: f64,
    pub la: f64,
    pub ca: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterResult {
    pub subject_id: String,
    pub semester: Semester,
    pub percentage_by_component: ComponentPercentages,
    pub observation: Option<Verdict>,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnnualResult {
    pub subject_id: String,
    #[serde(flatten)]
    pub rollup: RollupResult,
    pub observation: Option<Verdict>,
    pub flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatistics {
    pub total_credits: f64,
    pub total_marks: f64,
    pub overall_average: f64,
    pub subject_count: usize,
}

impl OverallStatistics {
    fn rounded(&self) -> Self {
        Self {
            total_credits: round_off_2_decimals(self.total_credits),
            total_marks: round_off_2_decimals(self.total_marks),
            overall_average: round_off_2_decimals(self.overall_average),
            subject_count: self.subject_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedStatistics {
    pub per_semester: BTreeMap<Semester, OverallStatistics>,
    pub annual: Option<OverallStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedRanking {
    pub per_semester: BTreeMap<Semester, RankingResult>,
    pub annual: Option<RankingResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category: SubjectCategory,
    pub subject_ids: Vec<String>,
}

/// Everything the report renderer needs for one student and year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: String,
    pub class_id: String,
    pub academic_year: String,
    pub subjects: Vec<SubjectMeta>,
    pub semester_results: Vec<SemesterResult>,
    pub annual_results: Vec<SubjectAnnualResult>,
    pub overall_statistics: ScopedStatistics,
    pub overall_ranking: ScopedRanking,
    pub categories: Vec<CategoryGroup>,
}

/// Full-precision aggregates of one student's year, subject -> semester.
#[derive(Debug, Default)]
struct StudentYear<'a> {
    subjects: BTreeMap<&'a str, BTreeMap<Semester, (SubjectAggregate, bool)>>,
}

fn subject_rollup(semesters: &BTreeMap<Semester, (SubjectAggregate, bool)>) -> RollupResult {
    let per_semester: BTreeMap<Semester, Option<f64>> = semesters
        .iter()
        .map(|(s, (agg, _))| (*s, Some(agg.weighted_total)))
        .collect();
    rollup(&per_semester)
}

struct SubjectIndex<'a> {
    known: HashMap<&'a str, &'a SubjectMeta>,
    unregistered: HashMap<String, SubjectMeta>,
}

impl<'a> SubjectIndex<'a> {
    fn new(subjects: &'a [SubjectMeta], records: &[AssessmentRecord]) -> Self {
        let known: HashMap<&str, &SubjectMeta> =
            subjects.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut unregistered = HashMap::new();
        for r in records {
            let id = r.key.subject_id.as_str();
            if !known.contains_key(id) && !unregistered.contains_key(id) {
                tracing::debug!(subject_id = id, "no subject metadata; using defaults");
                unregistered.insert(id.to_string(), SubjectMeta::unregistered(id));
            }
        }
        Self {
            known,
            unregistered,
        }
    }

    fn get(&self, id: &str) -> SubjectMeta {
        self.known
            .get(id)
            .map(|m| (*m).clone())
            .or_else(|| self.unregistered.get(id).cloned())
            .unwrap_or_else(|| SubjectMeta::unregistered(id))
    }

    fn credits(&self, id: &str) -> f64 {
        self.known
            .get(id)
            .map(|m| m.credits)
            .unwrap_or(0.0)
    }
}

/// Credit-weighted mean when any subject carries credits, plain mean
/// otherwise. `None` for an empty scope.
pub fn overall_statistics(entries: &[(f64, f64)]) -> Option<OverallStatistics> {
    if entries.is_empty() {
        return None;
    }
    let mut total_credits = 0.0_f64;
    let mut total_marks = 0.0_f64;
    let mut weighted_sum = 0.0_f64;
    for &(credits, average) in entries {
        let credits = credits.max(0.0);
        total_credits += credits;
        total_marks += average;
        weighted_sum += credits * average;
    }
    let overall_average = if total_credits > 0.0 {
        weighted_sum / total_credits
    } else {
        total_marks / (entries.len() as f64)
    };
    Some(OverallStatistics {
        total_credits,
        total_marks,
        overall_average,
        subject_count: entries.len(),
    })
}

fn group_by_student<'a>(
    records: &'a [AssessmentRecord],
    config: &EngineConfig,
) -> BTreeMap<&'a str, StudentYear<'a>> {
    let mut out: BTreeMap<&str, StudentYear> = BTreeMap::new();
    for r in records {
        let agg = aggregate(r, &config.weights);
        out.entry(r.key.student_id.as_str())
            .or_default()
            .subjects
            .entry(r.key.subject_id.as_str())
            .or_default()
            .insert(r.key.semester, (agg, r.has_any_score()));
    }
    out
}

fn semester_statistics(
    year: &StudentYear<'_>,
    semester: Semester,
    index: &SubjectIndex<'_>,
) -> Option<OverallStatistics> {
    let entries: Vec<(f64, f64)> = year
        .subjects
        .iter()
        .filter_map(|(subject_id, sems)| match sems.get(&semester) {
            // A record with nothing entered is no data, not a zero.
            Some((agg, true)) => Some((index.credits(subject_id), agg.weighted_total)),
            _ => None,
        })
        .collect();
    overall_statistics(&entries)
}

// Only subjects with a complete year feed the annual figure.
fn annual_statistics(
    year: &StudentYear<'_>,
    index: &SubjectIndex<'_>,
) -> Option<OverallStatistics> {
    let entries: Vec<(f64, f64)> = year
        .subjects
        .iter()
        .filter_map(|(subject_id, sems)| {
            subject_rollup(sems)
                .annual_average
                .map(|avg| (index.credits(subject_id), avg))
        })
        .collect();
    overall_statistics(&entries)
}

fn scope_statistics(
    year: &StudentYear<'_>,
    scope: RankScope,
    index: &SubjectIndex<'_>,
) -> Option<OverallStatistics> {
    match scope {
        RankScope::Semester(s) => semester_statistics(year, s, index),
        RankScope::Annual => annual_statistics(year, index),
    }
}

/// Aggregate score of every student with data in `scope`. Students without
/// data there are left out, never given a zero.
pub fn class_cohort(
    records: &[AssessmentRecord],
    subjects: &[SubjectMeta],
    config: &EngineConfig,
    scope: RankScope,
) -> Vec<CohortEntry> {
    let index = SubjectIndex::new(subjects, records);
    group_by_student(records, config)
        .iter()
        .filter_map(|(student_id, year)| {
            scope_statistics(year, scope, &index).map(|stats| CohortEntry {
                student_id: student_id.to_string(),
                aggregate_score: stats.overall_average,
            })
        })
        .collect()
}

fn semester_result(
    subject: &SubjectMeta,
    semester: Semester,
    agg: &SubjectAggregate,
    any_score: bool,
    config: &EngineConfig,
) -> SemesterResult {
    let shown = agg.rounded();
    let observation = any_score.then(|| {
        config
            .thresholds
            .classify(subject.category, shown.weighted_total)
    });
    SemesterResult {
        subject_id: subject.id.clone(),
        semester,
        percentage_by_component: ComponentPercentages {
            fa: shown.fa_pct,
            la: shown.ia_pct,
            ca: shown.ca_pct,
            avg: shown.weighted_total,
        },
        observation,
        flagged: !config
            .thresholds
            .is_competent(subject.category, shown.weighted_total),
    }
}

fn annual_result(
    subject: &SubjectMeta,
    full: RollupResult,
    config: &EngineConfig,
) -> SubjectAnnualResult {
    let shown = RollupResult {
        annual_average: full.annual_average.map(round_off_2_decimals),
        used_annual: full.used_annual,
        fallback: full.fallback.map(|f| SemesterAverage {
            semester: f.semester,
            average: round_off_2_decimals(f.average),
        }),
    };
    let basis = shown.basis();
    SubjectAnnualResult {
        subject_id: subject.id.clone(),
        rollup: shown,
        observation: basis.map(|v| config.thresholds.classify(subject.category, v)),
        flagged: !config
            .thresholds
            .is_competent(subject.category, basis.unwrap_or(0.0)),
    }
}

/// `None` when the student has no records for the class and year.
pub fn build_student_report(
    student_id: &str,
    class_id: &str,
    academic_year: &str,
    class_records: &[AssessmentRecord],
    subjects: &[SubjectMeta],
    config: &EngineConfig,
) -> Option<StudentReport> {
    let in_scope: Vec<AssessmentRecord> = class_records
        .iter()
        .filter(|r| r.key.class_id == class_id && r.key.academic_year == academic_year)
        .cloned()
        .collect();
    let index = SubjectIndex::new(subjects, &in_scope);
    let by_student = group_by_student(&in_scope, config);
    let year = by_student.get(student_id)?;

    let mut metas: Vec<SubjectMeta> = year.subjects.keys().map(|id| index.get(id)).collect();
    metas.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let mut semester_results = Vec::new();
    let mut annual_results = Vec::new();
    for meta in &metas {
        let Some(sems) = year.subjects.get(meta.id.as_str()) else {
            continue;
        };
        for (semester, (agg, any_score)) in sems {
            semester_results.push(semester_result(meta, *semester, agg, *any_score, config));
        }
        annual_results.push(annual_result(meta, subject_rollup(sems), config));
    }

    let mut per_semester_stats = BTreeMap::new();
    let mut per_semester_rank = BTreeMap::new();
    for semester in Semester::ALL {
        let Some(stats) = semester_statistics(year, semester, &index) else {
            continue;
        };
        per_semester_stats.insert(semester, stats.rounded());
        let cohort = class_cohort(&in_scope, subjects, config, RankScope::Semester(semester));
        if let Some(r) = rank(&cohort).get(student_id) {
            per_semester_rank.insert(semester, *r);
        }
    }
    let annual_stats = annual_statistics(year, &index);
    let annual_rank = annual_stats.and_then(|_| {
        let cohort = class_cohort(&in_scope, subjects, config, RankScope::Annual);
        rank(&cohort).get(student_id).copied()
    });

    let categories = [
        SubjectCategory::CoreSpecific,
        SubjectCategory::CoreGeneral,
        SubjectCategory::Complementary,
    ]
    .into_iter()
    .filter_map(|category| {
        let subject_ids: Vec<String> = metas
            .iter()
            .filter(|m| m.category == category)
            .map(|m| m.id.clone())
            .collect();
        (!subject_ids.is_empty()).then_some(CategoryGroup {
            category,
            subject_ids,
        })
    })
    .collect();

    Some(StudentReport {
        student_id: student_id.to_string(),
        class_id: class_id.to_string(),
        academic_year: academic_year.to_string(),
        subjects: metas,
        semester_results,
        annual_results,
        overall_statistics: ScopedStatistics {
            per_semester: per_semester_stats,
            annual: annual_stats.map(|s| s.rounded()),
        },
        overall_ranking: ScopedRanking {
            per_semester: per_semester_rank,
            annual: annual_rank,
        },
        categories,
    })
}
