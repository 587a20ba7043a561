mod test_support;

use serde_json::json;
use test_support::{login_body, mount_json, request_err, request_ok, spawn_sidecar};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tutor_degrades_to_inline_text_without_a_generation_key() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/auth/login", login_body()).await;
    let uri = server.uri();
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&["--backend-url", &uri]);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "username": "rao", "password": "secret" }),
    );
    let explained = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tutor.explain",
        json!({ "concept": "Equivalent fractions" }),
    );
    assert_eq!(explained["output"]["generated"], false);
    assert!(explained["output"]["content"]
        .as_str()
        .unwrap_or("")
        .starts_with("EeeBee can't generate content right now"));

    let chat = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tutor.chat",
        json!({ "message": "what is a fraction?" }),
    );
    assert_eq!(chat["output"]["generated"], false);
    assert_eq!(chat["historyLength"], 0);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "tutor.questions",
        json!({ "topicName": "Fractions", "difficulty": "impossible" }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "tutor.questions",
        json!({ "topicName": "Fractions", "count": 0 }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chat_and_questions_use_the_generation_service() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/auth/login", login_body()).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "  A fraction is part of a whole.  " }
            }]
        })))
        .mount(&server)
        .await;
    let uri = server.uri();
    let llm_url = format!("{}/v1", uri);
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&[
        "--backend-url",
        &uri,
        "--llm-url",
        &llm_url,
        "--llm-api-key",
        "sk-test",
        "--llm-model",
        "tutor-test",
    ]);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["llmEnabled"], true);
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "username": "rao", "password": "secret" }),
    );

    let chat = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tutor.chat",
        json!({ "message": "what is a fraction?" }),
    );
    assert_eq!(chat["output"]["generated"], true);
    assert_eq!(chat["output"]["content"], "A fraction is part of a whole.");
    assert_eq!(chat["output"]["model"], "tutor-test");
    assert_eq!(chat["historyLength"], 2);

    let questions = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "tutor.questions",
        json!({
            "topicName": "Fractions",
            "concepts": ["Halves"],
            "count": 3,
            "difficulty": "easy"
        }),
    );
    assert_eq!(questions["count"], 3);
    assert_eq!(questions["difficulty"], "easy");
    assert_eq!(questions["output"]["generated"], true);

    request_ok(&mut stdin, &mut reader, "5", "session.logout", json!({}));
    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "session.login",
        json!({ "username": "rao", "password": "secret" }),
    );
    let session = request_ok(&mut stdin, &mut reader, "7", "session.get", json!({}));
    assert_eq!(session["chatTurns"], 0);

    drop(stdin);
    let _ = child.wait();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rate_limited_generation_is_not_an_error_envelope() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/auth/login", login_body()).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let uri = server.uri();
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&[
        "--backend-url",
        &uri,
        "--llm-url",
        &uri,
        "--llm-api-key",
        "sk-test",
    ]);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.login",
        json!({ "username": "rao", "password": "secret" }),
    );
    let explained = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tutor.explain",
        json!({ "concept": "Ratios", "grade": "Grade 7" }),
    );
    assert_eq!(explained["output"]["generated"], false);
    assert_eq!(explained["output"]["model"], "gpt-4o-mini");

    drop(stdin);
    let _ = child.wait();
}
