#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use linguadesk::api::middleware::session::AppState;
use linguadesk::config::Config;

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

/// Dashboard router wired to a mock backend, carrying one browser's cookie
pub struct TestApp {
    pub backend: MockServer,
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    pub async fn start() -> Self {
        let backend = MockServer::start().await;
        let config = Config::for_backend(format!("{}/api", backend.uri()));
        let router = linguadesk::api::app(AppState::new(config));
        Self {
            backend,
            router,
            cookie: None,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request(Method::GET, uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&mut self, uri: &str, body: Value) -> TestResponse {
        let request = self.json_request(uri, &body);
        self.send(request).await
    }

    /// Sends every body at once from this browser, as a double-fired
    /// scanner callback would
    pub async fn post_json_concurrently(&mut self, uri: &str, bodies: Vec<Value>) -> Vec<TestResponse> {
        let requests = bodies
            .iter()
            .map(|body| dispatch(self.router.clone(), self.json_request(uri, body)));
        futures::future::join_all(requests)
            .await
            .into_iter()
            .map(|(response, _)| response)
            .collect()
    }

    fn json_request(&self, uri: &str, body: &Value) -> Request<Body> {
        self.request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let (response, cookie) = dispatch(self.router.clone(), request).await;
        if cookie.is_some() {
            self.cookie = cookie;
        }
        response
    }

    /// Signs in through the login form with a backend that accepts anyone
    /// as `role`
    pub async fn sign_in_as(&mut self, role: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "access-token",
                "refresh": "refresh-token",
                "user_id": 1,
                "email": "office@school.test",
                "role": role,
            })))
            .mount(&self.backend)
            .await;

        let response = self
            .post_form(
                "/login",
                &[("email", "office@school.test"), ("password", "correct horse")],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    pub async fn sign_in(&mut self) {
        self.sign_in_as("admin").await;
    }
}

/// Runs one request through the router and returns the response with the
/// session cookie it set, if any
async fn dispatch(router: Router, request: Request<Body>) -> (TestResponse, Option<String>) {
    let response = router.oneshot(request).await.unwrap();

    let cookie = response.headers().get(header::SET_COOKIE).map(|set_cookie| {
        set_cookie
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    });

    let status = response.status();
    let header_value = |name: header::HeaderName| {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    };
    let location = header_value(header::LOCATION);
    let content_type = header_value(header::CONTENT_TYPE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let response = TestResponse {
        status,
        location,
        content_type,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };
    (response, cookie)
}

pub fn attendance_record(id: i64, student: i64, name: &str, date: &str, status: &str) -> Value {
    json!({
        "id": id,
        "student": student,
        "session": 1,
        "status": status,
        "scanned_at": format!("{}T09:05:00Z", date),
        "valid": true,
        "notes": null,
        "student_name": name,
        "level": "B1",
        "language": "English",
        "date": date,
        "lessons_remaining": 8,
    })
}

pub async fn mock_attendance_list(backend: &MockServer, records: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/students/attendance/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(records)))
        .mount(backend)
        .await;
}
