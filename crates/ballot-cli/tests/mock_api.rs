//! CLI tests against a mock election API.
//!
//! Each test gets its own HOME so the stored session never leaks between
//! tests, and each CLI invocation is a separate process sharing that file.

mod common;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{run_cli, run_cli_failure, run_cli_success};

const EMAIL: &str = "admin@example.com";

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "login",
            "variables": { "input": { "email": EMAIL, "password": "secret" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "login": { "accessToken": "a1", "refreshToken": "r1" } }
        })))
        .mount(server)
        .await;
}

fn login(home: &std::path::Path, api_url: &str, extra: &[&str]) {
    let mut args = vec!["login", "--email", EMAIL, "--password", "secret"];
    args.extend_from_slice(extra);
    run_cli_success(&args, home, api_url);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_and_whoami() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempfile::tempdir().unwrap();

    let stdout = run_cli_success(
        &["login", "--email", EMAIL, "--password", "secret"],
        home.path(),
        &server.uri(),
    );
    assert!(stdout.contains("Logged in successfully"));

    let stdout = run_cli_success(&["whoami"], home.path(), &server.uri());
    assert!(stdout.contains(EMAIL));
    assert!(stdout.contains("authenticated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Invalid email or password" }]
        })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let stderr = run_cli_failure(
        &["login", "--email", EMAIL, "--password", "wrong"],
        home.path(),
        &server.uri(),
    );
    assert!(stderr.contains("Failed to login"));

    run_cli_failure(&["whoami"], home.path(), &server.uri());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_session_error() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();

    let stderr = run_cli_failure(&["whoami"], home.path(), &server.uri());
    assert!(stderr.contains("No active session"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_uses_stored_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "getElections" })))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "getElections": [{ "id": "e1", "name": "Board 2026" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();
    login(home.path(), &server.uri(), &[]);

    let stdout = run_cli_success(
        &[
            "query",
            "--name",
            "getElections",
            "--document",
            "query getElections { getElections { id name } }",
        ],
        home.path(),
        &server.uri(),
    );
    assert!(stdout.contains("Board 2026"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_session_is_refreshed_and_stored() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "refreshToken",
            "variables": { "input": { "email": EMAIL, "refreshToken": "r1" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "refreshToken": { "accessToken": "a2", "refreshToken": "r2" } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "getElections" })))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "getElections": [] }
        })))
        .expect(2)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    // A zero lease leaves the stored session already expired.
    login(home.path(), &server.uri(), &["--lease-secs", "0"]);

    let query = [
        "query",
        "--name",
        "getElections",
        "--document",
        "query getElections { getElections { id } }",
    ];
    run_cli_success(&query, home.path(), &server.uri());
    // The rotated tokens were stored; the second run needs no refresh.
    run_cli_success(&query, home.path(), &server.uri());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_failure_ends_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "refreshToken" })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();
    login(home.path(), &server.uri(), &[]);

    let stderr = run_cli_failure(&["refresh-token"], home.path(), &server.uri());
    assert!(stderr.contains("ballot login"));

    run_cli_failure(&["whoami"], home.path(), &server.uri());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempfile::tempdir().unwrap();
    login(home.path(), &server.uri(), &[]);

    let stdout = run_cli_success(&["logout"], home.path(), &server.uri());
    assert!(stdout.contains("Logged out"));

    let stderr = run_cli_failure(&["whoami"], home.path(), &server.uri());
    assert!(stderr.contains("No active session"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_session_file_does_not_block_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let home = tempfile::tempdir().unwrap();

    let session_file = home.path().join("data").join("ballot").join("session.json");
    std::fs::create_dir_all(session_file.parent().unwrap()).unwrap();
    std::fs::write(&session_file, "{ not json").unwrap();

    let stdout = run_cli_success(&["logout"], home.path(), &server.uri());
    assert!(stdout.contains("No active session"));
    assert!(!session_file.exists());

    std::fs::write(&session_file, "{ not json").unwrap();
    login(home.path(), &server.uri(), &[]);

    let stdout = run_cli_success(&["whoami"], home.path(), &server.uri());
    assert!(stdout.contains(EMAIL));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_without_session_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    run_cli_failure(
        &["query", "--name", "getElections", "--document", "query getElections { getElections { id } }"],
        home.path(),
        &server.uri(),
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redeem_valid_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "checkCode",
            "variables": { "input": { "electionId": "e1", "codeId": "ABC123" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "checkCode": { "isValid": true } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "getVotingCandidates" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "getCandidates": [
                { "id": "c1", "name": "Ada", "imageUrl": null, "createdAt": "2026-01-01" },
                { "id": "c2", "name": "Grace", "imageUrl": null, "createdAt": "2026-01-01" }
            ] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let stdout = run_cli_success(
        &["redeem", "--election", "e1", "--code", "ABC123"],
        home.path(),
        &server.uri(),
    );
    assert!(stdout.contains("Ada"));
    assert!(stdout.contains("Grace"));

    let received = server.received_requests().await.unwrap();
    assert!(
        received
            .iter()
            .all(|r| !r.headers.contains_key("authorization"))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redeem_invalid_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": "checkCode" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "checkCode": { "isValid": false } }
        })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let stderr = run_cli_failure(
        &["redeem", "--election", "e1", "--code", "WRONG"],
        home.path(),
        &server.uri(),
    );
    assert!(stderr.contains("not valid"));
}
