use crate::calc::submission::parse_record_key;
use crate::error::SubmitError;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, engine_config};
use crate::ipc::types::{AppState, Request};
use crate::marks::{self, BULK_SUBMIT_MAX};
use crate::store::{RecordStore, SqliteStore};
use serde_json::json;

fn submit_error(req: &Request, e: &SubmitError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), e.details())
}

fn handle_marks_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let cfg = match engine_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match marks::submit(&SqliteStore::new(conn), &req.params, &cfg) {
        Ok(record) => ok(&req.id, json!({ "record": record })),
        Err(e) => {
            marks::log_rejection(0, &e);
            submit_error(req, &e)
        }
    }
}

fn handle_marks_bulk_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(submissions) = req.params.get("submissions").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "submissions must be an array", None);
    };
    if submissions.len() > BULK_SUBMIT_MAX {
        return err(
            &req.id,
            "bad_params",
            format!("too many submissions (max {})", BULK_SUBMIT_MAX),
            Some(json!({ "count": submissions.len(), "max": BULK_SUBMIT_MAX })),
        );
    }
    let cfg = match engine_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let outcome = marks::submit_many(&SqliteStore::new(conn), submissions, &cfg);
    tracing::info!(
        updated = outcome.updated,
        rejected = outcome.rejected,
        "bulk submission processed"
    );
    ok(&req.id, json!(outcome))
}

fn handle_marks_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let key = match parse_record_key(&req.params) {
        Ok(k) => k,
        Err(e) => return submit_error(req, &SubmitError::Engine(e)),
    };
    match SqliteStore::new(conn).get_record(&key) {
        Ok(record) => ok(&req.id, json!({ "record": record })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.submit" => Some(handle_marks_submit(state, req)),
        "marks.bulkSubmit" => Some(handle_marks_bulk_submit(state, req)),
        "marks.get" => Some(handle_marks_get(state, req)),
        _ => None,
    }
}
