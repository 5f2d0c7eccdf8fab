use std::collections::HashMap;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use gatehouse_api::app::build_app;
use gatehouse_infra::GatehouseConfig;

const PASSWORD: &str = "correct horse";

/// Drives the router like a browser: keeps cookies and the latest form token.
struct Client {
    app: Router,
    cookies: HashMap<String, String>,
    csrf_token: Option<String>,
}

impl Client {
    fn new() -> Self {
        Self {
            app: build_app(&GatehouseConfig::default()),
            cookies: HashMap::new(),
            csrf_token: None,
        }
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        let req = Request::get(path)
            .header(header::COOKIE, self.cookie_header())
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut req = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, self.cookie_header());
        if let Some(token) = &self.csrf_token {
            req = req.header("x-csrf-token", token.as_str());
        }
        let req = req.body(Body::from(form_encode(form))).unwrap();
        self.send(req).await
    }

    async fn send(&mut self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();

        for raw in response.headers().get_all(header::SET_COOKIE) {
            let raw = raw.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        if let Some(token) = body.get("csrf_token").and_then(Value::as_str) {
            self.csrf_token = Some(token.to_string());
        }
        (status, body)
    }

    async fn signed_in(username: &str) -> Self {
        let mut client = Client::new();
        let (status, _) = client.get("/accounts/csrf-token").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = client
            .post("/accounts/register", &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = client
            .post("/accounts/login", &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(status, StatusCode::OK);
        client
    }
}

fn form_encode(form: &[(&str, &str)]) -> String {
    fn encode(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
                b' ' => "+".to_string(),
                other => format!("%{other:02X}"),
            })
            .collect()
    }
    form.iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn health_lists_areas() {
    let (status, body) = Client::new().get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["areas"], serde_json::json!(["accounts", "language", "records"]));
}

#[tokio::test]
async fn sign_in_manage_records_and_sign_out() {
    let mut client = Client::signed_in("root").await;
    assert!(client.cookies.contains_key("gatehouse_session"));
    assert!(client.cookies.contains_key("gatehouse_csrf"));

    let (status, body) = client
        .post("/records/create-record", &[("title", "Launch plan"), ("body", "step one")])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["record"]["title"], "Launch plan");

    let (status, body) = client.get("/records/list-records").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().map(Vec::len), Some(1));

    let (status, _) = client.post("/accounts/logout", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!client.cookies.contains_key("gatehouse_session"));

    let (status, body) = client.get("/records/list-records").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "no_session");
}

#[tokio::test]
async fn token_failures_are_distinguished() {
    let mut client = Client::new();
    let (status, body) = client
        .post("/accounts/register", &[("username", "alice"), ("password", PASSWORD)])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_token");

    client.get("/accounts/csrf-token").await;
    client.csrf_token = Some("forged-token-value".to_string());
    let (status, body) = client
        .post("/accounts/register", &[("username", "alice"), ("password", PASSWORD)])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "token_mismatch");
}

#[tokio::test]
async fn token_in_form_body_is_accepted() {
    let mut client = Client::new();
    client.get("/accounts/csrf-token").await;
    let token = client.csrf_token.take().unwrap();

    let (status, body) = client
        .post("/language/set", &[("language", "en"), ("csrf_token", &token)])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(client.cookies.get("gatehouse_lang").map(String::as_str), Some("en"));
}

#[tokio::test]
async fn mutating_actions_reject_get() {
    let mut client = Client::signed_in("root").await;
    let (status, body) = client.get("/accounts/logout").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
    assert!(client.cookies.contains_key("gatehouse_session"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let mut client = Client::new();
    let (status, body) = client.get("/accounts/frobnicate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "action_not_found");

    let (status, body) = client.get("/billing/list").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "area_not_found");
}

#[tokio::test]
async fn members_cannot_manage_records() {
    let mut admin = Client::signed_in("root").await;
    let mut member = Client::new();
    member.app = admin.app.clone();
    member.get("/accounts/csrf-token").await;
    member
        .post("/accounts/register", &[("username", "alice"), ("password", PASSWORD)])
        .await;
    member
        .post("/accounts/login", &[("username", "alice"), ("password", PASSWORD)])
        .await;

    let (status, body) = member.post("/records/create-record", &[("title", "nope")]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    let (status, _) = admin
        .post("/accounts/grant-role", &[("username", "alice"), ("role", "editor")])
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = member.post("/records/create-record", &[("title", "now allowed")]).await;
    assert_eq!(status, StatusCode::OK);
}
