use crate::calc::merge::merge;
use crate::calc::ranking::{rank_ordered, RankedStudent};
use crate::calc::record::AssessmentRecord;
use crate::calc::submission::{check_comprehensive_bounds, parse_submission};
use crate::calc::summary::{build_student_report, class_cohort, RankScope, StudentReport};
use crate::config::EngineConfig;
use crate::error::{EngineError, SubmitError};
use crate::store::RecordStore;
use serde::Serialize;

pub const BULK_SUBMIT_MAX: usize = 2000;

/// Validate, merge onto the stored record and persist. Nothing is written
/// unless every step succeeds.
pub fn submit<S: RecordStore + ?Sized>(
    store: &S,
    raw: &serde_json::Value,
    config: &EngineConfig,
) -> Result<AssessmentRecord, SubmitError> {
    let incoming = parse_submission(raw)?;
    let existing = store.get_record(&incoming.key)?;
    check_comprehensive_bounds(&incoming, existing.as_ref(), config.default_comprehensive_max)?;
    let merged = merge(
        existing.as_ref(),
        &incoming,
        config.default_comprehensive_max,
    )?;
    store.put_record(&merged)?;
    tracing::info!(
        key = %merged.key,
        created = existing.is_none(),
        formative = merged.formative.len(),
        integrated = merged.integrated.len(),
        "marks stored"
    );
    Ok(merged)
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRejection {
    pub index: usize,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub updated: usize,
    pub rejected: usize,
    pub errors: Vec<BulkRejection>,
}

/// Each submission stands alone: one bad entry does not block the others.
pub fn submit_many<S: RecordStore + ?Sized>(
    store: &S,
    submissions: &[serde_json::Value],
    config: &EngineConfig,
) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for (index, raw) in submissions.iter().enumerate() {
        match submit(store, raw, config) {
            Ok(_) => outcome.updated += 1,
            Err(e) => {
                log_rejection(index, &e);
                outcome.rejected += 1;
                outcome.errors.push(BulkRejection {
                    index,
                    code: e.code().to_string(),
                    message: e.to_string(),
                    details: e.details(),
                });
            }
        }
    }
    outcome
}

pub fn log_rejection(index: usize, e: &SubmitError) {
    match e {
        SubmitError::Engine(EngineError::InconsistentKey { .. }) => {
            tracing::error!(index, error = %e, "merge invoked with mismatched record key")
        }
        SubmitError::Engine(_) => tracing::warn!(index, error = %e, "submission rejected"),
        SubmitError::Storage(_) => tracing::error!(index, error = %e, "submission not stored"),
    }
}

pub fn student_report<S: RecordStore + ?Sized>(
    store: &S,
    student_id: &str,
    class_id: &str,
    academic_year: &str,
    config: &EngineConfig,
) -> anyhow::Result<Option<StudentReport>> {
    let records = store.class_records(class_id, academic_year)?;
    let subjects = store.subjects()?;
    let report = build_student_report(
        student_id,
        class_id,
        academic_year,
        &records,
        &subjects,
        config,
    );
    if report.is_none() {
        tracing::debug!(student_id, class_id, academic_year, "no records for report");
    }
    Ok(report)
}

pub fn class_ranking<S: RecordStore + ?Sized>(
    store: &S,
    class_id: &str,
    academic_year: &str,
    scope: RankScope,
    config: &EngineConfig,
) -> anyhow::Result<Vec<RankedStudent>> {
    let records = store.class_records(class_id, academic_year)?;
    let subjects = store.subjects()?;
    let cohort = class_cohort(&records, &subjects, config, scope);
    tracing::debug!(
        class_id,
        academic_year,
        scope = scope.as_str(),
        cohort = cohort.len(),
        "ranking class"
    );
    Ok(rank_ordered(&cohort))
}
