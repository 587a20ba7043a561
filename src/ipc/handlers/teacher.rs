use crate::calc::NO_DATA_MESSAGE;
use crate::dashboard;
use crate::ipc::error::ok;
use crate::ipc::helpers::{flow_err, optional_bool};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_dropdowns(state: &mut AppState, req: &Request) -> serde_json::Value {
    let refresh = optional_bool(req, "refresh");
    match dashboard::load_dropdowns(&mut state.session, state.backend.as_ref(), refresh) {
        Ok((data, cached)) => ok(
            &req.id,
            json!({
                "batches": data.batches,
                "subjects": data.subjects,
                "cached": cached,
            }),
        ),
        Err(e) => flow_err(req, e),
    }
}

fn handle_topics(state: &mut AppState, req: &Request) -> serde_json::Value {
    let refresh = optional_bool(req, "refresh");
    match dashboard::load_topics(&mut state.session, state.backend.as_ref(), refresh) {
        Ok((topics, cached)) => {
            let mut result = json!({
                "topics": topics,
                "cached": cached,
            });
            if topics.is_empty() {
                result["message"] = json!(NO_DATA_MESSAGE);
            }
            ok(&req.id, result)
        }
        Err(e) => flow_err(req, e),
    }
}

fn handle_topic_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let refresh = optional_bool(req, "refresh");
    match dashboard::open_topic(&mut state.session, state.backend.as_ref(), refresh) {
        Ok((view, cached)) => ok(&req.id, json!({ "view": view, "cached": cached })),
        Err(e) => flow_err(req, e),
    }
}

fn handle_topics_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard::open_all_topics(&mut state.session, state.backend.as_ref()) {
        Ok(view) => ok(&req.id, json!({ "view": view })),
        Err(e) => flow_err(req, e),
    }
}

fn handle_concept_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard::concept_detail(&mut state.session, state.backend.as_ref()) {
        Ok(detail) => ok(&req.id, json!({ "detail": detail })),
        Err(e) => flow_err(req, e),
    }
}

fn handle_student_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard::student_detail(&mut state.session, state.backend.as_ref()) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => flow_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teacher.dropdowns" => Some(handle_dropdowns(state, req)),
        "teacher.topics" => Some(handle_topics(state, req)),
        "teacher.topic.open" => Some(handle_topic_open(state, req)),
        "teacher.topics.all" => Some(handle_topics_all(state, req)),
        "teacher.concept.open" => Some(handle_concept_open(state, req)),
        "teacher.student.open" => Some(handle_student_open(state, req)),
        _ => None,
    }
}
