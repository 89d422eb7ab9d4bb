use crate::calc::summary::RankScope;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, engine_config, required_str};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use crate::store::SqliteStore;
use serde_json::json;

fn handle_student_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year = match required_str(req, "academicYear") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cfg = match engine_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    match marks::student_report(
        &SqliteStore::new(conn),
        &student_id,
        &class_id,
        &academic_year,
        &cfg,
    ) {
        Ok(report) => ok(&req.id, json!({ "report": report })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn scope_param(req: &Request) -> Result<RankScope, serde_json::Value> {
    let raw = match req.params.get("scope") {
        None => return Ok(RankScope::Annual),
        Some(v) if v.is_null() => return Ok(RankScope::Annual),
        Some(v) => v,
    };
    let parsed = match raw {
        serde_json::Value::String(s) => RankScope::parse(s),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(crate::calc::record::Semester::from_number)
            .map(RankScope::Semester),
        _ => None,
    };
    parsed.ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "scope must be \"annual\" or a semester",
            Some(json!({ "scope": raw })),
        )
    })
}

fn handle_class_ranking(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year = match required_str(req, "academicYear") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scope = match scope_param(req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let cfg = match engine_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    match marks::class_ranking(
        &SqliteStore::new(conn),
        &class_id,
        &academic_year,
        scope,
        &cfg,
    ) {
        Ok(rankings) => ok(
            &req.id,
            json!({ "scope": scope.as_str(), "rankings": rankings }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentReport" => Some(handle_student_report(state, req)),
        "reports.classRanking" => Some(handle_class_ranking(state, req)),
        _ => None,
    }
}
