use crate::backend::LoginParams;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::warn;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(password) = req.params.get("password").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing password", None);
    };
    let org_code = optional_str(req, "orgCode").or_else(|| state.default_org_code.clone());

    let params = LoginParams {
        username,
        password: password.to_string(),
        org_code: org_code.clone(),
    };
    let mut user = match state.backend.login(&params) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "login failed");
            return err(&req.id, e.code(), e.to_string(), None);
        }
    };
    if user.org_code.trim().is_empty() {
        user.org_code = org_code.unwrap_or_default();
    }

    state.session.login(user);
    ok(&req.id, state.session.summary())
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_logged_in = state.session.user.is_some();
    state.session.logout();
    ok(
        &req.id,
        json!({
            "loggedOut": was_logged_in,
            "sessionId": state.session.session_id,
        }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, state.session.summary())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
