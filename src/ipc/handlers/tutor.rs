use crate::calc::NO_DATA_MESSAGE;
use crate::dashboard;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{flow_err, optional_str, required_str, session_err};
use crate::ipc::types::{AppState, Request};
use crate::llm::Message;
use crate::prompts::{self, Difficulty};
use crate::records::Role;
use crate::session::{cache_key, SessionContext};
use crate::tutor::{generate, Generated};
use serde_json::json;

const DEFAULT_QUESTION_COUNT: u32 = 5;
const MAX_QUESTION_COUNT: u32 = 50;

fn selected_topic_name(ctx: &SessionContext) -> Option<String> {
    let sel = &ctx.selection;
    let (b, s, t) = (sel.batch_id?, sel.subject_id?, sel.topic_id?);
    ctx.caches
        .topics
        .get(&cache_key(&[b, s]))?
        .iter()
        .find(|topic| topic.topic_id == t)
        .map(|topic| topic.topic_name.clone())
}

fn handle_chat(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = state.session.user() {
        return session_err(req, e);
    }
    let message = match required_str(req, "message") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let request = prompts::chat(&state.session.chat, &message);
    let output = generate(state.llm(), &request);
    if output.generated {
        state.session.push_chat(Message::user(message));
        state.session.push_chat(Message::assistant(output.content.clone()));
    }
    ok(
        &req.id,
        json!({
            "output": output,
            "historyLength": state.session.chat.len(),
        }),
    )
}

fn handle_explain(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user = match state.session.user() {
        Ok(u) => u.clone(),
        Err(e) => return session_err(req, e),
    };
    let concept = match required_str(req, "concept") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = optional_str(req, "grade");
    let student_name = (user.role == Role::Student).then_some(user.user_name.as_str());

    let request = prompts::explain_concept(&concept, grade.as_deref(), student_name);
    let output = generate(state.llm(), &request);
    ok(&req.id, json!({ "concept": concept, "output": output }))
}

fn handle_learning_path(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student = match dashboard::student_detail(&mut state.session, state.backend.as_ref()) {
        Ok(s) => s,
        Err(e) => return flow_err(req, e),
    };
    let topic_name = selected_topic_name(&state.session);

    let request = prompts::learning_path(&student, topic_name.as_deref());
    let output = generate(state.llm(), &request);
    ok(&req.id, json!({ "student": student, "output": output }))
}

fn handle_questions(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = state.session.user() {
        return session_err(req, e);
    }
    let count = match req.params.get("count") {
        None | Some(serde_json::Value::Null) => DEFAULT_QUESTION_COUNT,
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 && n <= MAX_QUESTION_COUNT as u64 => n as u32,
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("count must be between 1 and {}", MAX_QUESTION_COUNT),
                    None,
                )
            }
        },
    };
    let raw_difficulty = optional_str(req, "difficulty");
    let Some(difficulty) = Difficulty::parse(raw_difficulty.as_deref()) else {
        return err(
            &req.id,
            "bad_params",
            "difficulty must be easy, medium or hard",
            None,
        );
    };

    // Explicit topic wins; otherwise use the selected topic and its concepts.
    let (topic_name, concepts) = match optional_str(req, "topicName") {
        Some(name) => {
            let concepts = req
                .params
                .get("concepts")
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|c| c.as_str())
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            (name, concepts)
        }
        None => {
            let view =
                match dashboard::open_topic(&mut state.session, state.backend.as_ref(), false) {
                    Ok((view, _)) => view,
                    Err(e) => return flow_err(req, e),
                };
            let name = selected_topic_name(&state.session)
                .unwrap_or_else(|| format!("topic {}", view.topic_id));
            let concepts = view
                .concepts
                .iter()
                .map(|c| c.concept_text.clone())
                .filter(|c| !c.is_empty())
                .collect();
            (name, concepts)
        }
    };

    let request = prompts::exam_questions(&topic_name, &concepts, count, difficulty);
    let output = generate(state.llm(), &request);
    ok(
        &req.id,
        json!({
            "topicName": topic_name,
            "count": count,
            "difficulty": difficulty.as_str(),
            "output": output,
        }),
    )
}

fn handle_class_insight(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match dashboard::open_topic(&mut state.session, state.backend.as_ref(), false) {
        Ok((view, _)) => view,
        Err(e) => return flow_err(req, e),
    };
    let Some(summary) = view.summary.as_ref() else {
        let output = Generated {
            content: NO_DATA_MESSAGE.to_string(),
            generated: false,
            model: None,
        };
        return ok(&req.id, json!({ "output": output }));
    };
    let topic_name = selected_topic_name(&state.session)
        .unwrap_or_else(|| format!("topic {}", view.topic_id));

    let request =
        prompts::class_insight(&topic_name, summary, &view.bands, view.class_average_marks);
    let output = generate(state.llm(), &request);
    ok(
        &req.id,
        json!({
            "topicName": topic_name,
            "summary": summary,
            "output": output,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tutor.chat" => Some(handle_chat(state, req)),
        "tutor.explain" => Some(handle_explain(state, req)),
        "tutor.learningPath" => Some(handle_learning_path(state, req)),
        "tutor.questions" => Some(handle_questions(state, req)),
        "tutor.classInsight" => Some(handle_class_insight(state, req)),
        _ => None,
    }
}
