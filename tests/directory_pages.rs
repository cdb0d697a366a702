mod test_support;

use axum::http::StatusCode;
use serde_json::json;
use test_support::TestApp;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn duplicate_group_name_shows_backend_text_verbatim() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/groups/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "name": ["Group with this name already exists."]
        })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/teachers/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "name": "Marta Vidal", "email": "marta@school.test", "specializations": ["English"] }
        ])))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/groups",
            &[
                ("name", "Morning B1"),
                ("description", ""),
                ("language", "English"),
                ("level", "B1"),
                ("teacher", "3"),
                ("max_capacity", "12"),
                ("status", "active"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Failed to create group"));
    assert!(response.body.contains("Group with this name already exists."));
    // the form keeps what was typed
    assert!(response.body.contains(r#"value="Morning B1""#));
    assert!(response.body.contains(r#"<option value="3" selected>Marta Vidal</option>"#));
}

#[tokio::test]
async fn invalid_group_capacity_is_caught_before_the_backend() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/teachers/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/students/groups/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/groups", &[("name", "Evening A2"), ("max_capacity", "0")])
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Maximum capacity must be a positive number"));
}

#[tokio::test]
async fn created_student_redirects_to_detail_page() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/students/"))
        .and(body_json(json!({
            "name": "Ana Lopez",
            "email": "ana@school.test",
            "phone_number": "",
            "level": "A2"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 44,
            "name": "Ana Lopez",
            "email": "ana@school.test",
            "level": "A2",
            "lessons_remaining": 0,
            "subscription_balance": "0.00",
            "qr_code": "44"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/students",
            &[
                ("name", " Ana Lopez "),
                ("email", "ana@school.test"),
                ("phone_number", ""),
                ("level", "A2"),
                ("password", ""),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/students/44"));
}

#[tokio::test]
async fn student_without_email_is_rejected() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    let response = app
        .post_form("/students", &[("name", "Ana Lopez"), ("email", " ")])
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Name and email are required"));
}

#[tokio::test]
async fn plans_sort_by_numeric_price() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/subscription-plans/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Premium", "description": "", "number_of_lessons": 20, "price": "1000.00" },
            { "id": 2, "name": "Starter", "description": "", "number_of_lessons": 4, "price": "90.00" },
            { "id": 3, "name": "Standard", "description": "", "number_of_lessons": 8, "price": "180.00" }
        ])))
        .mount(&app.backend)
        .await;

    let response = app.get("/plans?sort=price&dir=asc").await;
    assert_eq!(response.status, StatusCode::OK);
    let starter = response.body.find("Starter").unwrap();
    let standard = response.body.find("Standard").unwrap();
    let premium = response.body.find("Premium").unwrap();
    assert!(starter < standard && standard < premium);
}

#[tokio::test]
async fn admins_cannot_demote_themselves() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/accounts/users/change_role/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/accounts/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "email": "office@school.test", "role": "admin" }
        ])))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/settings/users/1/role", &[("role", "instructor")])
        .await;
    assert_eq!(response.location.as_deref(), Some("/settings"));

    let page = app.get("/settings").await;
    assert!(page.body.contains("You cannot remove your own administrator role"));
}

#[tokio::test]
async fn invalid_schedule_is_flashed_on_the_planning_page() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/students/schedules/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/academic/schedules",
            &[
                ("teacher_id", "3"),
                ("schedule_type", "group"),
                ("group_id", "7"),
                ("day", "1"),
                ("start_time", "11:00"),
                ("end_time", "10:00"),
                ("return_to", "/academic?date=2026-10-20"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/academic?date=2026-10-20"));
}

#[tokio::test]
async fn session_status_change_is_sent_to_the_backend() {
    let mut app = TestApp::start().await;
    app.sign_in_as("instructor").await;

    Mock::given(method("PATCH"))
        .and(path("/api/students/sessions/21/"))
        .and(body_json(json!({ "status": "COMPLETED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 21,
            "teacher": 3,
            "group": 7,
            "date": "2026-10-18",
            "start_time": "09:00:00",
            "end_time": "10:30:00",
            "type": "GROUP",
            "status": "COMPLETED"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/academic/sessions/21/status",
            &[("status", "COMPLETED"), ("return_to", "/academic?date=2026-10-18")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/academic?date=2026-10-18"));
}

#[tokio::test]
async fn new_user_passwords_must_match() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/accounts/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "email": "office@school.test", "role": "admin" }
        ])))
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/accounts/users/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/settings/users",
            &[
                ("email", "new.teacher@school.test"),
                ("password", "first-secret"),
                ("password_confirmation", "second-secret"),
                ("role", "instructor"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Passwords do not match"));
    assert!(response.body.contains(r#"value="new.teacher@school.test""#));
    assert!(response.body.contains(r#"<option value="instructor" selected>"#));
    assert!(!response.body.contains("first-secret"));
}

#[tokio::test]
async fn new_user_is_posted_to_the_backend() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("POST"))
        .and(path("/api/accounts/users/"))
        .and(body_json(json!({
            "email": "new.teacher@school.test",
            "password": "same-secret",
            "role": "instructor"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 8,
            "email": "new.teacher@school.test",
            "role": "instructor"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/accounts/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/settings/users",
            &[
                ("email", "new.teacher@school.test"),
                ("password", "same-secret"),
                ("password_confirmation", "same-secret"),
                ("role", "instructor"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/settings"));

    let page = app.get("/settings").await;
    assert!(page
        .body
        .contains("new.teacher@school.test can now sign in as Instructor"));
}

#[tokio::test]
async fn parents_are_found_by_child_name() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/parents/parents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 5, "name": "Maria Lopez", "email": "maria@home.test",
                "children": [{ "id": 1, "name": "Ana Lopez", "lessons_remaining": 3, "subscription_balance": "30.00" }]
            },
            { "id": 6, "name": "Peter Smith", "email": "peter@home.test", "children": [] }
        ])))
        .mount(&app.backend)
        .await;

    let response = app.get("/parents?q=ana").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Maria Lopez"));
    assert!(!response.body.contains("Peter Smith"));
    assert!(response.body.contains("1 of 2 parents"));

    let response = app.get("/parents?q=nobody").await;
    assert!(response.body.contains(r#"No parents match "nobody"."#));
}

#[tokio::test]
async fn plan_search_filters_the_list() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/subscription-plans/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Premium", "description": "Weekend intensive", "number_of_lessons": 20, "price": "1000.00" },
            { "id": 2, "name": "Starter", "description": "", "number_of_lessons": 4, "price": "90.00" }
        ])))
        .mount(&app.backend)
        .await;

    let response = app.get("/plans?q=weekend&sort=price&dir=desc").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Premium"));
    assert!(!response.body.contains("Starter"));
    assert!(response.body.contains(r#"value="weekend""#));
}

#[tokio::test]
async fn selected_plans_are_deleted_together() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    for id in [2, 3] {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/students/subscription-plans/{}/", id)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&app.backend)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/api/students/subscription-plans/1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/subscription-plans/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/plans/bulk-delete", &[("ids", "2"), ("ids", "3")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/plans"));

    let page = app.get("/plans").await;
    assert!(page.body.contains("2 plan(s) removed"));
}

#[tokio::test]
async fn group_members_can_be_searched() {
    let mut app = TestApp::start().await;
    app.sign_in().await;

    Mock::given(method("GET"))
        .and(path("/api/students/groups/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "name": "Morning B1", "description": "", "language": "English",
            "level": "B1", "teacher": null, "max_capacity": 12, "status": "active",
            "students": [1, 2]
        })))
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/students/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Emma Stone", "email": "emma@school.test", "level": "B1", "lessons_remaining": 4, "subscription_balance": "0" },
            { "id": 2, "name": "Liam Brown", "email": "liam@school.test", "level": "B1", "lessons_remaining": 6, "subscription_balance": "0" },
            { "id": 3, "name": "Emily Clark", "email": "emily@school.test", "level": "A2", "lessons_remaining": 2, "subscription_balance": "0" }
        ])))
        .mount(&app.backend)
        .await;

    let response = app.get("/groups/7?q=em").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Emma Stone"));
    assert!(response.body.contains("Emily Clark"));
    assert!(!response.body.contains("Liam Brown"));
}

#[tokio::test]
async fn dashboard_names_the_next_session_when_none_is_open() {
    let now = chrono::Local::now();
    if now.time() >= chrono::NaiveTime::from_hms_opt(23, 55, 0).unwrap() {
        // no later slot left today
        return;
    }

    let mut app = TestApp::start().await;
    app.sign_in_as("instructor").await;

    Mock::given(method("GET"))
        .and(path("/api/students/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 31, "teacher": 1, "group": 7,
            "date": now.format("%Y-%m-%d").to_string(),
            "start_time": "23:56:00", "end_time": "23:59:00",
            "type": "GROUP", "payment": "0", "status": "SCHEDULED"
        }])))
        .mount(&app.backend)
        .await;

    let page = app.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("No session is open right now. Next: session #31"));
    assert!(!page.body.contains("is open for check-in"));
}
