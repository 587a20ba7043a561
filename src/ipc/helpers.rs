use crate::dashboard::FlowError;
use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::session::SessionError;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn optional_bool(req: &Request, key: &str) -> bool {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Absent and `null` both read as `None`; numeric strings are accepted.
pub fn optional_i64(req: &Request, key: &str) -> Result<Option<i64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            if let Some(n) = v.as_i64() {
                return Ok(Some(n));
            }
            if let Some(n) = v.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
                return Ok(Some(n));
            }
            Err(err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                None,
            ))
        }
    }
}

pub fn flow_err(req: &Request, e: FlowError) -> serde_json::Value {
    let details = match &e {
        FlowError::NotFound(kind, id) => Some(json!({ "kind": kind, "id": id })),
        _ => None,
    };
    err(&req.id, e.code(), e.to_string(), details)
}

pub fn session_err(req: &Request, e: SessionError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), None)
}
