use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_i64, required_str, session_err};
use crate::ipc::types::{AppState, Request};
use crate::selection::Level;
use serde_json::json;

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let selection = &state.session.selection;
    ok(
        &req.id,
        json!({
            "selection": selection,
            "phase": selection.phase(),
        }),
    )
}

/// `{level, id}`; a null id clears the level and everything below it.
fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw_level = match required_str(req, "level") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(level) = Level::parse(&raw_level) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown level: {}", raw_level),
            Some(json!({ "allowed": Level::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>() })),
        );
    };
    let id = match optional_i64(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match state.session.select(level, id) {
        Ok(change) => {
            let selection = &state.session.selection;
            ok(
                &req.id,
                json!({
                    "selection": selection,
                    "phase": selection.phase(),
                    "changed": change.changed,
                    "cleared": change.cleared,
                }),
            )
        }
        Err(e) => session_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "selection.get" => Some(handle_get(state, req)),
        "selection.set" => Some(handle_set(state, req)),
        _ => None,
    }
}
