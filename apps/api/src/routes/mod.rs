pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;
use crate::web;

/// Resume uploads can exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // HTML surface
        .route("/", get(web::handle_landing).post(web::handle_admin_access))
        .route("/analyze", post(web::handle_analyze))
        // JSON API
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        .route("/api/v1/usage", get(handlers::handle_usage_status))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::evaluation::pipeline::testing::ScriptedGenerator;
    use crate::usage::gate::epoch_now;
    use crate::usage::store::{JsonFileStore, UsageSnapshot};

    const BOUNDARY: &str = "X-RECRUITER-TEST-BOUNDARY";
    const CALLER: &str = "198.51.100.23:40000";

    fn app(dir: &tempfile::TempDir, seed: UsageSnapshot, generator: Arc<ScriptedGenerator>) -> Router {
        let file = JsonFileStore::new(dir.path().join("user_usage.json"));
        file.save(&seed).unwrap();
        build_router(AppState::for_tests(file, generator))
    }

    fn stored(dir: &tempfile::TempDir) -> UsageSnapshot {
        JsonFileStore::new(dir.path().join("user_usage.json"))
            .load()
            .unwrap()
    }

    fn multipart_body(fields: &[(&str, &str)], resume: Option<(&str, &str)>) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if let Some((file_name, text)) = resume {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{text}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn request(method: &str, uri: &str, content_type: Option<String>, body: Body) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let mut req = builder.body(body).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(CALLER.parse::<SocketAddr>().unwrap()));
        req
    }

    fn evaluation_request(fields: &[(&str, &str)], resume: Option<(&str, &str)>) -> Request<Body> {
        request(
            "POST",
            "/api/v1/evaluations",
            Some(format!("multipart/form-data; boundary={BOUNDARY}")),
            Body::from(multipart_body(fields, resume)),
        )
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&dir, UsageSnapshot::default(), Arc::new(ScriptedGenerator::default()))
            .oneshot(request("GET", "/health", None, Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_landing_shows_form_to_new_caller() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&dir, UsageSnapshot::default(), Arc::new(ScriptedGenerator::default()))
            .oneshot(request("GET", "/", None, Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("action=\"/analyze\""));
    }

    #[tokio::test]
    async fn test_landing_blocks_recent_caller_without_form() {
        let dir = tempfile::tempdir().unwrap();
        let seed: UsageSnapshot = [("198.51.100.23", epoch_now() - 3600.0)].into_iter().collect();
        let response = app(&dir, seed, Arc::new(ScriptedGenerator::default()))
            .oneshot(request("GET", "/", None, Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let html = body_string(response).await;
        assert!(html.contains("You already used this app. Try again after 2"));
        assert!(!html.contains("action=\"/analyze\""));
    }

    #[tokio::test]
    async fn test_admin_code_unlocks_landing_for_blocked_caller() {
        let dir = tempfile::tempdir().unwrap();
        let seed: UsageSnapshot = [("198.51.100.23", epoch_now() - 10.0)].into_iter().collect();
        let response = app(&dir, seed, Arc::new(ScriptedGenerator::default()))
            .oneshot(request(
                "POST",
                "/",
                Some("application/x-www-form-urlencoded".to_string()),
                Body::from("admin_code=letmein"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("unlimited usage enabled"));
        assert!(html.contains("action=\"/analyze\""));
    }

    #[tokio::test]
    async fn test_evaluation_api_records_caller_address() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::ok(&["summary", "evaluation", "advice"]));
        let response = app(&dir, UsageSnapshot::default(), generator.clone())
            .oneshot(evaluation_request(
                &[
                    ("role", "Data Scientist"),
                    ("core_skills", "Python, SQL"),
                    ("soft_skills", "Teamwork"),
                    ("experience", "1-3 years"),
                ],
                Some(("resume.txt", "Ada Lovelace\nPython, 2 years")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["summary"], "summary");
        assert_eq!(json["evaluation"], "evaluation");
        assert_eq!(json["recommendation"], "advice");
        assert_eq!(json["admin"], false);
        assert!(json["next_eligible_at"].is_string());
        assert_eq!(generator.calls(), 3);
        assert!(generator.prompts()[0].contains("Ada Lovelace"));
        assert!(stored(&dir).last_used("198.51.100.23").is_some());
    }

    #[tokio::test]
    async fn test_evaluation_api_missing_role_is_400_without_calls() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::ok(&["summary", "evaluation", "advice"]));
        let response = app(&dir, UsageSnapshot::default(), generator.clone())
            .oneshot(evaluation_request(
                &[("core_skills", "Python")],
                Some(("resume.txt", "Ada Lovelace")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(generator.calls(), 0);
        assert!(stored(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_api_blocked_is_429() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::ok(&["summary", "evaluation", "advice"]));
        let seed: UsageSnapshot = [("198.51.100.23", epoch_now() - 60.0)].into_iter().collect();
        let response = app(&dir, seed.clone(), generator.clone())
            .oneshot(evaluation_request(
                &[("role", "Engineer")],
                Some(("resume.txt", "Ada Lovelace")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "COOLDOWN_ACTIVE");
        assert_eq!(json["error"]["remaining_hours"], 23);
        assert_eq!(generator.calls(), 0);
        assert_eq!(stored(&dir), seed);
    }

    #[tokio::test]
    async fn test_analyze_form_renders_results() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::ok(&[
            "- Name: Ada",
            "- Overall Fit Score: 85%",
            "1. **Recommendation:** Hire",
        ]));
        let response = app(&dir, UsageSnapshot::default(), generator)
            .oneshot(request(
                "POST",
                "/analyze",
                Some(format!("multipart/form-data; boundary={BOUNDARY}")),
                Body::from(multipart_body(
                    &[("admin_code", ""), ("role", "Engineer"), ("experience", "5+ years")],
                    Some(("resume.txt", "Ada Lovelace")),
                )),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Recruitment evaluation complete!"));
        assert!(html.contains("<strong>Recommendation:</strong>"));
        assert!(html.contains("You can use this app again after:"));
    }

    #[tokio::test]
    async fn test_analyze_warning_keeps_typed_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::ok(&["summary", "evaluation", "advice"]));
        let response = app(&dir, UsageSnapshot::default(), generator.clone())
            .oneshot(request(
                "POST",
                "/analyze",
                Some(format!("multipart/form-data; boundary={BOUNDARY}")),
                Body::from(multipart_body(
                    &[
                        ("role", "Platform Engineer"),
                        ("core_skills", "Rust, Kubernetes"),
                        ("experience", "5+ years"),
                    ],
                    None,
                )),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_string(response).await;
        assert!(html.contains("Please fill in both HR requirements and upload a resume."));
        assert!(html.contains("value=\"Platform Engineer\""));
        assert!(html.contains(">Rust, Kubernetes</textarea>"));
        assert!(html.contains("<option value=\"5+ years\" selected>"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_usage_status_reports_remaining_time() {
        let dir = tempfile::tempdir().unwrap();
        let seed: UsageSnapshot = [("198.51.100.23", epoch_now() - 3600.0)].into_iter().collect();
        let response = app(&dir, seed, Arc::new(ScriptedGenerator::default()))
            .oneshot(request("GET", "/api/v1/usage", None, Body::empty()))
            .await
            .unwrap();

        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["user_id"], "198.51.100.23");
        assert_eq!(json["allowed"], false);
        assert_eq!(json["remaining_hours"], 22);
        assert_eq!(json["cooldown_secs"], 86_400);
    }
}
