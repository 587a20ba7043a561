use crate::dashboard;
use crate::ipc::error::ok;
use crate::ipc::helpers::{flow_err, optional_bool};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let refresh = optional_bool(req, "refresh");
    match dashboard::principal_overview(&mut state.session, state.backend.as_ref(), refresh) {
        Ok(overview) => ok(&req.id, json!({ "overview": overview })),
        Err(e) => flow_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "principal.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}
