use crate::calc::record::{
    AssessmentComponent, AssessmentRecord, ComponentKey, Comprehensive, PartialAssessmentRecord,
};
use crate::error::EngineError;
use std::collections::{HashMap, HashSet};

/// Combine an incoming (already validated) submission with the stored record.
///
/// Incoming scores win only when present; stored components the submission
/// does not mention are carried forward after the incoming ones. The result
/// is a new record, neither input is touched.
pub fn merge(
    existing: Option<&AssessmentRecord>,
    incoming: &PartialAssessmentRecord,
    default_comprehensive_max: f64,
) -> Result<AssessmentRecord, EngineError> {
    let blank;
    let existing = match existing {
        Some(e) if e.key != incoming.key => {
            return Err(EngineError::InconsistentKey {
                existing: Box::new(e.key.clone()),
                incoming: Box::new(incoming.key.clone()),
            });
        }
        Some(e) => e,
        None => {
            blank = AssessmentRecord {
                comprehensive: Comprehensive {
                    score: None,
                    max_score: default_comprehensive_max,
                },
                ..AssessmentRecord::empty(incoming.key.clone())
            };
            &blank
        }
    };

    let comprehensive = match &incoming.comprehensive {
        Some(c) => Comprehensive {
            score: c.score.or(existing.comprehensive.score),
            max_score: c
                .max_score
                .filter(|m| *m > 0.0)
                .unwrap_or(existing.comprehensive.max_score),
        },
        None => existing.comprehensive.clone(),
    };

    Ok(AssessmentRecord {
        key: existing.key.clone(),
        formative: merge_components(&existing.formative, &incoming.formative),
        integrated: merge_components(&existing.integrated, &incoming.integrated),
        comprehensive,
    })
}

fn merge_components(
    existing: &[AssessmentComponent],
    incoming: &[AssessmentComponent],
) -> Vec<AssessmentComponent> {
    let index: HashMap<ComponentKey, &AssessmentComponent> =
        existing.iter().map(|c| (c.key(), c)).collect();

    let mut seen: HashSet<ComponentKey> = HashSet::with_capacity(incoming.len());
    let mut out = Vec::with_capacity(existing.len() + incoming.len());
    for entry in incoming {
        let key = entry.key();
        let score = entry
            .score
            .or_else(|| index.get(&key).and_then(|prev| prev.score));
        out.push(AssessmentComponent {
            label: entry.label.clone(),
            max_score: entry.max_score,
            score,
        });
        seen.insert(key);
    }

    for prev in existing {
        if !seen.contains(&prev.key()) {
            out.push(prev.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::record::{PartialComprehensive, RecordKey, Semester};

    fn key() -> RecordKey {
        RecordKey {
            student_id: "s1".into(),
            subject_id: "math".into(),
            class_id: "c1".into(),
            academic_year: "2024-2025".into(),
            semester: Semester::First,
        }
    }

    fn comp(label: &str, max: f64, score: Option<f64>) -> AssessmentComponent {
        AssessmentComponent {
            label: label.into(),
            max_score: max,
            score,
        }
    }

    fn partial(formative: Vec<AssessmentComponent>) -> PartialAssessmentRecord {
        PartialAssessmentRecord {
            key: key(),
            formative,
            integrated: Vec::new(),
            comprehensive: None,
        }
    }

    fn stored() -> AssessmentRecord {
        AssessmentRecord {
            key: key(),
            formative: vec![comp("A", 20.0, Some(10.0)), comp("B", 20.0, None)],
            integrated: vec![comp("Project", 50.0, Some(40.0))],
            comprehensive: Comprehensive {
                score: Some(80.0),
                max_score: 100.0,
            },
        }
    }

    #[test]
    fn first_submission_passes_through_with_defaults() {
        let p = partial(vec![comp("A", 20.0, Some(17.5))]);
        let merged = merge(None, &p, 100.0).expect("merge");
        assert_eq!(merged.formative, p.formative);
        assert!(merged.integrated.is_empty());
        assert_eq!(merged.comprehensive.score, None);
        assert_eq!(merged.comprehensive.max_score, 100.0);
    }

    #[test]
    fn untouched_components_are_preserved() {
        let existing = AssessmentRecord {
            formative: vec![comp("A", 20.0, Some(10.0)), comp("B", 20.0, None)],
            ..stored()
        };
        let p = partial(vec![comp("A", 20.0, Some(12.0))]);
        let merged = merge(Some(&existing), &p, 100.0).expect("merge");

        let b = merged
            .formative
            .iter()
            .find(|c| c.label == "B")
            .expect("B kept");
        assert_eq!(b.score, None);
        let a = merged
            .formative
            .iter()
            .find(|c| c.label == "A")
            .expect("A kept");
        assert_eq!(a.score, Some(12.0));
        assert_eq!(merged.integrated, existing.integrated);
    }

    #[test]
    fn null_incoming_score_keeps_stored_score() {
        let p = partial(vec![comp("A", 20.0, None)]);
        let merged = merge(Some(&stored()), &p, 100.0).expect("merge");
        assert_eq!(merged.formative[0], comp("A", 20.0, Some(10.0)));
    }

    #[test]
    fn comprehensive_overwrite_only_if_present() {
        let mut p = partial(Vec::new());
        p.comprehensive = Some(PartialComprehensive {
            score: None,
            max_score: None,
        });
        let merged = merge(Some(&stored()), &p, 100.0).expect("merge");
        assert_eq!(merged.comprehensive.score, Some(80.0));
        assert_eq!(merged.comprehensive.max_score, 100.0);

        p.comprehensive = Some(PartialComprehensive {
            score: Some(55.0),
            max_score: Some(60.0),
        });
        let merged = merge(Some(&stored()), &p, 100.0).expect("merge");
        assert_eq!(merged.comprehensive.score, Some(55.0));
        assert_eq!(merged.comprehensive.max_score, 60.0);
    }

    #[test]
    fn same_label_different_max_is_a_new_component() {
        let p = partial(vec![comp("A", 10.0, Some(9.0))]);
        let merged = merge(Some(&stored()), &p, 100.0).expect("merge");
        assert_eq!(merged.formative.len(), 3);
        assert_eq!(merged.formative[0], comp("A", 10.0, Some(9.0)));
        assert_eq!(merged.formative[1], comp("A", 20.0, Some(10.0)));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut p = partial(vec![
            comp("B", 20.0, Some(15.0)),
            comp("C", 10.0, None),
            comp("A", 20.0, None),
        ]);
        p.integrated = vec![comp("Lab", 30.0, Some(21.0))];
        p.comprehensive = Some(PartialComprehensive {
            score: None,
            max_score: Some(80.0),
        });

        let r = stored();
        let once = merge(Some(&r), &p, 100.0).expect("merge once");
        let twice = merge(Some(&once), &p, 100.0).expect("merge twice");
        assert_eq!(once, twice);

        let fresh_once = merge(None, &p, 100.0).expect("fresh once");
        let fresh_twice = merge(Some(&fresh_once), &p, 100.0).expect("fresh twice");
        assert_eq!(fresh_once, fresh_twice);
    }

    #[test]
    fn submission_round_trip_reproduces_record() {
        let r = stored();
        let merged = merge(None, &r.to_submission(), 100.0).expect("merge");
        assert_eq!(merged, r);
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let mut p = partial(Vec::new());
        p.key.semester = Semester::Second;
        let e = merge(Some(&stored()), &p, 100.0).expect_err("must fail");
        assert!(matches!(e, EngineError::InconsistentKey { .. }));
        assert_eq!(e.code(), "inconsistent_key");
    }
}
