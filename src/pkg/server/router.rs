use std::time::Duration;

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{self, files};
use super::state::AppState;
use crate::pkg::internal::adaptors::owners::spec::Owner;
use crate::prelude::Result;

/// Upper bound on files accepted in one multipart request.
const MAX_FILES_PER_REQUEST: usize = 10;

pub async fn build_routes() -> Result<Router> {
    let state = AppState::new().await?;
    Ok(routes(state))
}

fn attachment_routes(owner: Owner) -> Router<AppState> {
    let base = format!("/{}/{{id}}", owner.table());
    Router::new()
        .route(
            &format!("{}/files", base),
            get(files::list).post(files::upload),
        )
        .route(
            &format!("{}/files/{{file_id}}", base),
            get(files::download).delete(files::remove),
        )
        .route(
            &format!("{}/profile-image", base),
            get(files::profile_image)
                .put(files::set_profile_image)
                .delete(files::clear_profile_image),
        )
        .layer(Extension(owner))
}

pub fn routes(state: AppState) -> Router {
    let body_limit = (state.policy.max_upload_bytes as usize)
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(64 * 1024);
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/dashboard", get(handlers::dashboard::show))
        .route(
            "/candidates",
            get(handlers::candidates::list).post(handlers::candidates::create),
        )
        .route(
            "/candidates/{id}",
            get(handlers::candidates::retrieve)
                .patch(handlers::candidates::update)
                .delete(handlers::candidates::delete),
        )
        .route(
            "/employees",
            get(handlers::employees::list).post(handlers::employees::create),
        )
        .route(
            "/employees/{id}",
            get(handlers::employees::retrieve)
                .patch(handlers::employees::update)
                .delete(handlers::employees::delete),
        )
        .merge(attachment_routes(Owner::Candidate))
        .merge(attachment_routes(Owner::Employee))
        .route("/healthz", get(handlers::probes::healthz))
        .route("/livez", get(handlers::probes::livez))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;
    use crate::pkg::internal::attachments::UploadPolicy;
    use crate::pkg::testing;

    const BOUNDARY: &str = "roster-test-boundary";

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = send(app, req).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn multipart(method: &str, uri: &str, parts: &[(&str, &str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (filename, content_type, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                    filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_probes() {
        let (state, _dir) = testing::state().await;
        let app = routes(state);
        let (status, _) = send_json(&app, "GET", "/livez", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(&app, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_candidate_http_lifecycle() {
        let (state, _dir) = testing::state().await;
        let app = routes(state);

        let (status, created) = send_json(
            &app,
            "POST",
            "/candidates",
            Some(json!({
                "name": "  Margaret Hamilton ",
                "email": "margaret@example.com",
                "years_of_experience": 15,
                "client": "NASA",
                "notes": ""
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Margaret Hamilton");
        assert_eq!(created["status"], "available");
        assert_eq!(created["notes"], Value::Null);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) =
            send_json(&app, "GET", "/candidates?client=NASA&sort=name&order=asc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, patched) = send_json(
            &app,
            "PATCH",
            &format!("/candidates/{}", id),
            Some(json!({ "status": "placed", "client": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["status"], "placed");
        assert_eq!(patched["client"], Value::Null);
        assert_eq!(patched["email"], "margaret@example.com");

        let (status, err) = send_json(
            &app,
            "PATCH",
            &format!("/candidates/{}", id),
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "ERR-VAL-001");

        let (status, report) =
            send_json(&app, "DELETE", &format!("/candidates/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["id"], id.as_str());

        let (status, err) = send_json(&app, "GET", &format!("/candidates/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "ERR-NOTFOUND-404");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_employee_files_over_http() {
        let (state, _dir) = testing::state().await;
        let app = routes(state);
        let (status, created) = send_json(
            &app,
            "POST",
            "/employees",
            Some(json!({
                "name": "Dennis Ritchie",
                "email": "dmr@example.com",
                "position": "Systems Programmer"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "bench");
        let id = created["id"].as_str().unwrap().to_string();

        let contract = "The employee agrees to write portable C. ".repeat(64);
        let (status, body) = send(
            &app,
            multipart(
                "POST",
                &format!("/employees/{}/files", id),
                &[
                    ("contract.txt", "text/plain", contract.as_bytes()),
                    ("badge.png", "image/png", &[0x89, b'P', b'N', b'G']),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let stored: Value = serde_json::from_slice(&body).unwrap();
        let stored = stored.as_array().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["compressed"], true);
        assert_eq!(stored[1]["compressed"], false);
        let file_id = stored[0]["id"].as_str().unwrap().to_string();

        let (status, listed) =
            send_json(&app, "GET", &format!("/employees/{}/files", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Request::builder()
                .uri(format!("/employees/{}/files/{}", id, file_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, contract.as_bytes());

        let (status, _) = send(
            &app,
            multipart(
                "PUT",
                &format!("/employees/{}/profile-image", id),
                &[("notes.txt", "text/plain", b"nope")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let (status, _) = send(
            &app,
            multipart(
                "POST",
                "/candidates/unknown/files",
                &[("cv.txt", "text/plain", b"hello")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, report) =
            send_json(&app, "DELETE", &format!("/employees/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["files_removed"], 2);
        assert_eq!(report["blobs_removed"], 2);

        let (status, dashboard) = send_json(&app, "GET", "/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["employees"]["total"], 0);
        assert_eq!(dashboard["files"]["count"], 0);
    }

    async fn create_candidate(app: &Router) -> String {
        let (status, created) = send_json(
            app,
            "POST",
            "/candidates",
            Some(json!({ "name": "Alan Turing", "email": "alan@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_mixed_batch_stores_nothing() {
        let (state, _dir) = testing::state().await;
        let app = routes(state);
        let id = create_candidate(&app).await;

        let (status, body) = send(
            &app,
            multipart(
                "POST",
                &format!("/candidates/{}/files", id),
                &[
                    ("good.txt", "text/plain", "hello".as_bytes()),
                    ("empty.txt", "text/plain", "".as_bytes()),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["code"], "ERR-VAL-001");

        let (status, listed) =
            send_json(&app, "GET", &format!("/candidates/{}/files", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_oversized_body_is_rejected_with_413() {
        let policy = UploadPolicy {
            max_upload_bytes: 1000,
            ..Default::default()
        };
        let (state, _dir) = testing::state_with_policy(policy).await;
        let app = routes(state);
        let id = create_candidate(&app).await;

        let big = vec![b'x'; 80 * 1024];
        let (status, body) = send(
            &app,
            multipart(
                "POST",
                &format!("/candidates/{}/files", id),
                &[("big.txt", "text/plain", big.as_slice())],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let err: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["code"], "ERR-FILE-413");

        let (_, listed) = send_json(&app, "GET", &format!("/candidates/{}/files", id), None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }
}
