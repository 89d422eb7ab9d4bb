use crate::calc::record::SubjectCategory;
use crate::calc::summary::SubjectMeta;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{RecordStore, SqliteStore};
use serde_json::json;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).subjects() {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| id.clone());

    let category_raw = match required_str(req, "category") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(category) = SubjectCategory::parse(&category_raw) else {
        return err(
            &req.id,
            "bad_params",
            "category must be one of: CoreSpecific, CoreGeneral, Complementary",
            Some(json!({ "category": category_raw })),
        );
    };

    let credits = match req.params.get("credits") {
        None => 0.0,
        Some(v) if v.is_null() => 0.0,
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() && n >= 0.0 => n,
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    "credits must be a non-negative number",
                    Some(json!({ "credits": v })),
                )
            }
        },
    };

    let subject = SubjectMeta {
        id,
        name,
        category,
        credits,
    };
    if let Err(e) = SqliteStore::new(conn).upsert_subject(&subject) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(subject_id = %subject.id, category = subject.category.as_str(), "subject saved");
    ok(&req.id, json!({ "subject": subject }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.upsert" => Some(handle_subjects_upsert(state, req)),
        _ => None,
    }
}
