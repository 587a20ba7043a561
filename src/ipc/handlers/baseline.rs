use crate::dashboard;
use crate::ipc::error::ok;
use crate::ipc::helpers::{flow_err, optional_bool, optional_i64};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match optional_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let refresh = optional_bool(req, "refresh");
    match dashboard::baseline(
        &mut state.session,
        state.backend.as_ref(),
        student_id,
        refresh,
    ) {
        Ok((view, cached)) => ok(&req.id, json!({ "view": view, "cached": cached })),
        Err(e) => flow_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "baseline.report" => Some(handle_report(state, req)),
        _ => None,
    }
}
