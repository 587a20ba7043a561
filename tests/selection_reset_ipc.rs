mod test_support;

use serde_json::json;
use test_support::{login_body, mount_json, request_err, request_ok, spawn_sidecar};
use wiremock::MockServer;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn higher_level_change_clears_lower_levels_in_one_update() {
    let server = MockServer::start().await;
    mount_json(&server, "/api/auth/login", login_body()).await;
    let uri = server.uri();
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&["--backend-url", &uri]);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "selection.set",
        json!({ "level": "batch", "id": 1 }),
    );
    assert_eq!(code, "not_logged_in");

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "username": "rao", "password": "secret" }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "selection.set",
        json!({ "level": "topic", "id": 3 }),
    );
    assert_eq!(code, "bad_selection");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "selection.set",
        json!({ "level": "chapter", "id": 3 }),
    );
    assert_eq!(code, "bad_params");

    let drill = [
        ("batch", 1),
        ("subject", 2),
        ("topic", 3),
        ("concept", 4),
        ("student", 5),
    ];
    for (i, (level, id)) in drill.iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("drill-{}", i),
            "selection.set",
            json!({ "level": level, "id": id }),
        );
    }
    let state = request_ok(&mut stdin, &mut reader, "5", "selection.get", json!({}));
    assert_eq!(state["phase"], "conceptSelected");
    assert_eq!(state["selection"]["studentId"], 5);

    let same = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "selection.set",
        json!({ "level": "batch", "id": 1 }),
    );
    assert_eq!(same["changed"], false);
    assert_eq!(same["selection"]["conceptId"], 4);

    let changed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "selection.set",
        json!({ "level": "batch", "id": 9 }),
    );
    assert_eq!(changed["changed"], true);
    assert_eq!(
        changed["cleared"],
        json!(["subject", "topic", "concept", "student"])
    );
    assert_eq!(changed["phase"], "batchSelected");
    assert!(changed["selection"]["subjectId"].is_null());
    assert!(changed["selection"]["studentId"].is_null());

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "selection.set",
        json!({ "level": "batch", "id": null }),
    );
    assert_eq!(cleared["phase"], "noBatch");

    drop(stdin);
    let _ = child.wait();
}
