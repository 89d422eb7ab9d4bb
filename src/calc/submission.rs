use crate::calc::record::{
    AssessmentComponent, AssessmentRecord, ComponentKey, PartialAssessmentRecord,
    PartialComprehensive, RecordKey, Semester,
};
use crate::error::{EngineError, FieldError};
use serde_json::{Map, Value};
use std::collections::HashSet;

// Form fields arrive as numbers, numeric strings or "". Everything past this
// module only ever sees `Option<f64>`.
fn loose_number(v: Option<&Value>) -> Result<Option<f64>, String> {
    let n = match v {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| "number is out of range".to_string())?,
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            t.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", t))?
        }
        Some(_) => return Err("must be a number, numeric string, or null".to_string()),
    };
    if !n.is_finite() {
        return Err("must be a finite number".to_string());
    }
    Ok(Some(n))
}

fn required_text(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> String {
    let text = match obj.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        errors.push(FieldError::new(key, "required"));
    }
    text
}

fn valid_academic_year(raw: &str) -> bool {
    let Some((a, b)) = raw.split_once('-') else {
        return false;
    };
    if a.len() != 4 || b.len() != 4 {
        return false;
    }
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(start), Ok(end)) => end == start + 1,
        _ => false,
    }
}

fn parse_semester(v: Option<&Value>) -> Option<Semester> {
    match v {
        Some(Value::String(s)) => Semester::parse(s),
        Some(Value::Number(n)) => n.as_i64().and_then(Semester::from_number),
        _ => None,
    }
}

fn collect_key(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<RecordKey> {
    let before = errors.len();
    let student_id = required_text(obj, "studentId", errors);
    let subject_id = required_text(obj, "subjectId", errors);
    let class_id = required_text(obj, "classId", errors);
    let academic_year = required_text(obj, "academicYear", errors);
    if !academic_year.is_empty() && !valid_academic_year(&academic_year) {
        errors.push(FieldError::new(
            "academicYear",
            "must look like YYYY-YYYY with consecutive years",
        ));
    }
    let semester = parse_semester(obj.get("semester"));
    if semester.is_none() {
        errors.push(FieldError::new(
            "semester",
            "must be one of: Semester 1, Semester 2, Semester 3",
        ));
    }
    if errors.len() > before {
        return None;
    }
    Some(RecordKey {
        student_id,
        subject_id,
        class_id,
        academic_year,
        semester: semester?,
    })
}

fn collect_components(
    obj: &Map<String, Value>,
    list_name: &str,
    errors: &mut Vec<FieldError>,
) -> Vec<AssessmentComponent> {
    let items = match obj.get(list_name) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(FieldError::new(list_name, "must be an array"));
            return Vec::new();
        }
    };

    let mut seen: HashSet<ComponentKey> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", list_name, i);
        let Some(entry) = item.as_object() else {
            errors.push(FieldError::new(path, "must be an object"));
            continue;
        };

        let label = entry
            .get("label")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if label.is_empty() {
            errors.push(FieldError::new(format!("{}.label", path), "required"));
        }

        let max_score = match loose_number(entry.get("maxScore")) {
            Ok(Some(m)) if m > 0.0 => Some(m),
            Ok(Some(_)) => {
                errors.push(FieldError::new(
                    format!("{}.maxScore", path),
                    "must be greater than 0",
                ));
                None
            }
            Ok(None) => {
                errors.push(FieldError::new(format!("{}.maxScore", path), "required"));
                None
            }
            Err(msg) => {
                errors.push(FieldError::new(format!("{}.maxScore", path), msg));
                None
            }
        };

        let score = match loose_number(entry.get("score")) {
            Ok(v) => v,
            Err(msg) => {
                errors.push(FieldError::new(format!("{}.score", path), msg));
                None
            }
        };

        let Some(max_score) = max_score else {
            continue;
        };
        if let Some(v) = score {
            if v < 0.0 || v > max_score {
                errors.push(FieldError::new(
                    format!("{}.score", path),
                    format!("must be between 0 and {}", max_score),
                ));
                continue;
            }
        }
        if label.is_empty() {
            continue;
        }
        if !seen.insert(ComponentKey::new(&label, max_score)) {
            errors.push(FieldError::new(
                path,
                format!("duplicate assessment '{}' out of {}", label, max_score),
            ));
            continue;
        }
        out.push(AssessmentComponent {
            label,
            max_score,
            score,
        });
    }
    out
}

fn collect_comprehensive(
    obj: &Map<String, Value>,
    errors: &mut Vec<FieldError>,
) -> Option<PartialComprehensive> {
    let raw = match obj.get("comprehensive") {
        None | Some(Value::Null) => return None,
        Some(Value::Object(o)) => o,
        Some(_) => {
            errors.push(FieldError::new("comprehensive", "must be an object"));
            return None;
        }
    };

    let score = match loose_number(raw.get("score")) {
        Ok(Some(v)) if v < 0.0 => {
            errors.push(FieldError::new("comprehensive.score", "must not be negative"));
            None
        }
        Ok(v) => v,
        Err(msg) => {
            errors.push(FieldError::new("comprehensive.score", msg));
            None
        }
    };
    let max_score = match loose_number(raw.get("maxScore")) {
        Ok(Some(m)) if m <= 0.0 => {
            errors.push(FieldError::new(
                "comprehensive.maxScore",
                "must be greater than 0",
            ));
            None
        }
        Ok(v) => v,
        Err(msg) => {
            errors.push(FieldError::new("comprehensive.maxScore", msg));
            None
        }
    };
    Some(PartialComprehensive { score, max_score })
}

pub fn parse_record_key(raw: &Value) -> Result<RecordKey, EngineError> {
    let Some(obj) = raw.as_object() else {
        return Err(EngineError::Validation(vec![FieldError::new(
            "params",
            "must be an object",
        )]));
    };
    let mut errors = Vec::new();
    match collect_key(obj, &mut errors) {
        Some(key) if errors.is_empty() => Ok(key),
        _ => Err(EngineError::Validation(errors)),
    }
}

/// Normalize and validate one raw submission. Every problem is reported at
/// once; a submission with any bad field is rejected as a whole.
pub fn parse_submission(raw: &Value) -> Result<PartialAssessmentRecord, EngineError> {
    let Some(obj) = raw.as_object() else {
        return Err(EngineError::Validation(vec![FieldError::new(
            "submission",
            "must be an object",
        )]));
    };

    let mut errors = Vec::new();
    let key = collect_key(obj, &mut errors);
    let formative = collect_components(obj, "formative", &mut errors);
    let integrated = collect_components(obj, "integrated", &mut errors);
    let comprehensive = collect_comprehensive(obj, &mut errors);

    match key {
        Some(key) if errors.is_empty() => Ok(PartialAssessmentRecord {
            key,
            formative,
            integrated,
            comprehensive,
        }),
        _ => Err(EngineError::Validation(errors)),
    }
}

/// The comprehensive score can only be range-checked once the effective
/// maximum is known, which may come from the stored record.
pub fn check_comprehensive_bounds(
    incoming: &PartialAssessmentRecord,
    existing: Option<&AssessmentRecord>,
    default_max: f64,
) -> Result<(), EngineError> {
    let Some(c) = &incoming.comprehensive else {
        return Ok(());
    };
    let score = c
        .score
        .or_else(|| existing.and_then(|r| r.comprehensive.score));
    let max_score = c
        .max_score
        .or_else(|| existing.map(|r| r.comprehensive.max_score))
        .unwrap_or(default_max);
    match score {
        Some(v) if v > max_score => Err(EngineError::Validation(vec![FieldError::new(
            "comprehensive.score",
            format!("must be between 0 and {}", max_score),
        )])),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::record::Comprehensive;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "studentId": "s1",
            "subjectId": "math",
            "classId": "c1",
            "academicYear": "2024-2025",
            "semester": "Semester 1"
        })
    }

    fn with(mut v: Value, key: &str, value: Value) -> Value {
        v[key] = value;
        v
    }

    fn fields(e: EngineError) -> Vec<String> {
        match e {
            EngineError::Validation(f) => f.into_iter().map(|f| f.field).collect(),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn string_numbers_and_blanks_are_normalized() {
        let raw = with(
            base(),
            "formative",
            json!([
                { "label": "Quiz 1", "maxScore": "20", "score": "17.5" },
                { "label": "Quiz 2", "maxScore": 20, "score": "" },
                { "label": "Quiz 3", "maxScore": 10, "score": null },
                { "label": "Quiz 4", "maxScore": 10, "score": 0 }
            ]),
        );
        let p = parse_submission(&raw).expect("valid submission");
        assert_eq!(p.key.semester, Semester::First);
        let scores: Vec<Option<f64>> = p.formative.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![Some(17.5), None, None, Some(0.0)]);
        assert!(p.integrated.is_empty());
        assert_eq!(p.comprehensive, None);
    }

    #[test]
    fn out_of_range_scores_are_rejected_not_clamped() {
        let raw = with(
            base(),
            "integrated",
            json!([
                { "label": "Project", "maxScore": 50, "score": 51 },
                { "label": "Lab", "maxScore": 20, "score": -1 }
            ]),
        );
        let f = fields(parse_submission(&raw).expect_err("must reject"));
        assert_eq!(f, vec!["integrated[0].score", "integrated[1].score"]);
    }

    #[test]
    fn non_positive_max_and_bad_strings_are_reported() {
        let raw = with(
            base(),
            "formative",
            json!([
                { "label": "A", "maxScore": 0, "score": null },
                { "label": "B", "maxScore": 10, "score": "ten" },
                { "label": "", "maxScore": 10 }
            ]),
        );
        let f = fields(parse_submission(&raw).expect_err("must reject"));
        assert_eq!(
            f,
            vec![
                "formative[0].maxScore",
                "formative[1].score",
                "formative[2].label"
            ]
        );
    }

    #[test]
    fn duplicate_label_and_max_is_rejected() {
        let raw = with(
            base(),
            "formative",
            json!([
                { "label": "Quiz", "maxScore": 20, "score": 1 },
                { "label": "Quiz", "maxScore": "20.0", "score": 2 },
                { "label": "Quiz", "maxScore": 10, "score": 3 }
            ]),
        );
        let f = fields(parse_submission(&raw).expect_err("must reject"));
        assert_eq!(f, vec!["formative[1]"]);
    }

    #[test]
    fn malformed_key_lists_every_field() {
        let raw = json!({
            "studentId": "",
            "subjectId": "math",
            "classId": "c1",
            "academicYear": "2024-2026",
            "semester": "Semester 9"
        });
        let f = fields(parse_submission(&raw).expect_err("must reject"));
        assert_eq!(f, vec!["studentId", "academicYear", "semester"]);
    }

    #[test]
    fn numeric_semester_is_accepted() {
        let key = parse_record_key(&with(base(), "semester", json!(3))).expect("key");
        assert_eq!(key.semester, Semester::Third);
    }

    #[test]
    fn comprehensive_bounds_use_stored_max() {
        let p = parse_submission(&with(base(), "comprehensive", json!({ "score": "45" })))
            .expect("valid shape");
        let existing = AssessmentRecord {
            comprehensive: Comprehensive {
                score: None,
                max_score: 40.0,
            },
            ..AssessmentRecord::empty(p.key.clone())
        };
        assert!(check_comprehensive_bounds(&p, None, 100.0).is_ok());
        assert!(check_comprehensive_bounds(&p, Some(&existing), 100.0).is_err());
    }

    #[test]
    fn shrinking_comprehensive_max_below_stored_score_is_rejected() {
        let p = parse_submission(&with(base(), "comprehensive", json!({ "maxScore": 50 })))
            .expect("valid shape");
        let existing = AssessmentRecord {
            comprehensive: Comprehensive {
                score: Some(80.0),
                max_score: 100.0,
            },
            ..AssessmentRecord::empty(p.key.clone())
        };
        let f = fields(
            check_comprehensive_bounds(&p, Some(&existing), 100.0).expect_err("must reject"),
        );
        assert_eq!(f, vec!["comprehensive.score"]);
    }
}
