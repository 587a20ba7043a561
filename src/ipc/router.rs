use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::debug;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::selection::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::teacher::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::baseline::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::principal::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::tutor::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::document::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
