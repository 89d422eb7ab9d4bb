use crate::config;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, engine_config};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_calc_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match engine_config(conn, req) {
        Ok(cfg) => ok(&req.id, json!({ "config": cfg })),
        Err(e) => e,
    }
}

fn handle_calc_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    if req.params.get("reset").and_then(|v| v.as_bool()) == Some(true) {
        if let Err(e) = config::reset(conn) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        tracing::info!("calc config reset to defaults");
        return ok(&req.id, json!({ "config": config::EngineConfig::default() }));
    }

    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch object", None);
    };
    let mut cfg = match engine_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(msg) = cfg.apply_patch(patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = config::save(conn, &cfg) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(
        fa = cfg.weights.fa,
        ia = cfg.weights.ia,
        ca = cfg.weights.ca,
        "calc config updated"
    );
    ok(&req.id, json!({ "config": cfg }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calc.config.get" => Some(handle_calc_config_get(state, req)),
        "calc.config.update" => Some(handle_calc_config_update(state, req)),
        _ => None,
    }
}
