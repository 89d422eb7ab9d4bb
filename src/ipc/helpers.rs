use crate::config::{self, EngineConfig};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;

/// Ids may arrive as strings or bare numbers, same as on the submission path.
pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let text = match req.params.get(key) {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    }
    Ok(text)
}

pub fn db_conn<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn engine_config(conn: &Connection, req: &Request) -> Result<EngineConfig, serde_json::Value> {
    config::load(conn).map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}
