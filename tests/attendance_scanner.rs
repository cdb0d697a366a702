mod test_support;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use test_support::TestApp;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn duplicate_quick_scan_is_refused_locally() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/students/12/reduce_lesson/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "lessons_remaining": 4,
            "subscription_balance": "40.00",
            "message": "Lesson deducted"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let first = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await
        .json();
    assert_eq!(first["accepted"], true);
    assert_eq!(first["student_id"], 12);
    assert_eq!(first["lessons_remaining"], 4);
    assert_eq!(first["toast"]["variant"], "success");
    assert_eq!(
        first["toast"]["description"],
        "Lesson deducted. Lessons remaining: 4"
    );

    let second = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": " 12 " }))
        .await
        .json();
    assert_eq!(second["accepted"], false);
    assert_eq!(second["toast"]["variant"], "error");
    assert_eq!(
        second["toast"]["description"],
        "Attendance already marked for today"
    );
}

#[tokio::test]
async fn reset_allows_the_same_code_again() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/students/12/reduce_lesson/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "lessons_remaining": 3
        })))
        .expect(2)
        .mount(&app.backend)
        .await;

    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    app.post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await;
    app.post_form("/attendance/scan/reset", &[]).await;

    let again = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await
        .json();
    assert_eq!(again["accepted"], true);
}

#[tokio::test]
async fn session_scan_refused_by_backend_can_be_retried() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/sessions/21/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 21,
            "teacher": 3,
            "group": 7,
            "date": "2026-10-18",
            "start_time": "09:00:00",
            "end_time": "10:30:00",
            "type": "GROUP",
            "payment": "25.00",
            "status": "IN_PROGRESS"
        })))
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/students/attendance/"))
        .and(body_json(json!({ "student": 12, "session": 21, "status": "present" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "non_field_errors": ["Attendance already recorded for this student in this session"]
        })))
        .expect(2)
        .mount(&app.backend)
        .await;

    app.post_form("/attendance/scan/start", &[("session_id", "21")])
        .await;

    for _ in 0..2 {
        let result = app
            .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
            .await
            .json();
        assert_eq!(result["accepted"], false);
        assert_eq!(result["toast"]["title"], "Already marked");
    }
}

#[tokio::test]
async fn closed_session_cannot_be_scanned() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/sessions/22/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 22,
            "teacher": 3,
            "student": 12,
            "date": "2026-10-18",
            "start_time": "08:00",
            "end_time": "09:00",
            "type": "PRIVATE",
            "status": "COMPLETED"
        })))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/attendance/scan/start", &[("session_id", "22")])
        .await;
    assert_eq!(response.location.as_deref(), Some("/attendance/scan"));

    let result = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await
        .json();
    assert_eq!(result["accepted"], false);
    assert_eq!(result["toast"]["title"], "Scanner stopped");
}

#[tokio::test]
async fn invalid_payload_is_rejected_without_backend_call() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    let result = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "not-a-student" }))
        .await
        .json();
    assert_eq!(result["accepted"], false);
    assert_eq!(result["toast"]["title"], "Invalid QR code");
}

#[tokio::test]
async fn scanner_page_lists_recent_scans() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/students/students/12/reduce_lesson/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "lessons_remaining": 6
        })))
        .mount(&app.backend)
        .await;

    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    let response = app
        .post_form("/attendance/scan/submit", &[("payload", "12")])
        .await;
    assert_eq!(response.location.as_deref(), Some("/attendance/scan"));

    let page = app.get("/attendance/scan").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Attendance recorded"));
    assert!(page.body.contains("in quick scan mode"));
    assert!(page.body.contains("1 code(s) scanned in this run."));
    assert!(page.body.contains(r#"data-lessons-for="12">6<"#));
}

#[tokio::test]
async fn simultaneous_scans_of_one_code_reach_the_backend_once() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/students/12/reduce_lesson/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "lessons_remaining": 5 }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&app.backend)
        .await;

    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    let results: Vec<_> = app
        .post_json_concurrently(
            "/attendance/scan/submit.json",
            vec![json!({ "payload": "12" }), json!({ "payload": "12" })],
        )
        .await
        .iter()
        .map(|response| response.json())
        .collect();

    let accepted = results.iter().filter(|r| r["accepted"] == true).count();
    assert_eq!(accepted, 1);
    assert!(results
        .iter()
        .any(|r| r["toast"]["description"] == "Attendance already marked for today"));
}

#[tokio::test]
async fn stopping_and_restarting_keeps_scanned_codes() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/students/12/reduce_lesson/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "lessons_remaining": 5
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;
    let first = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await
        .json();
    assert_eq!(first["accepted"], true);

    app.post_form("/attendance/scan/stop", &[]).await;
    app.post_form("/attendance/scan/start", &[("session_id", "")])
        .await;

    let again = app
        .post_json("/attendance/scan/submit.json", json!({ "payload": "12" }))
        .await
        .json();
    assert_eq!(again["accepted"], false);
    assert_eq!(
        again["toast"]["description"],
        "Attendance already marked for today"
    );
}
