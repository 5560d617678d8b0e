use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/resumes/generate-pdf
/// Forwards the JSON body to the PDF service with service signature headers
/// and relays its answer verbatim.
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.to_ascii_lowercase().contains("application/json") {
        return Err(AppError::BadRequest(
            "Content-Type must be application/json".to_string(),
        ));
    }

    let upstream = state.pdf_proxy.forward(body, content_type).await?;

    let mut relayed = HeaderMap::new();
    for (name, value) in [
        (header::CONTENT_TYPE, upstream.content_type),
        (header::CONTENT_DISPOSITION, upstream.content_disposition),
    ] {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
            relayed.insert(name, value);
        }
    }

    Ok((upstream.status, relayed, upstream.body).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{Config, PdfServiceConfig};
    use crate::routes::build_router;
    use crate::signing::{SignatureVerifier, HEADER_SERVICE_ID};
    use crate::state::AppState;

    use super::*;

    const PDF_PATH: &str = "/api/v1/resumes/generate-pdf";

    /// Stand-in PDF service that only answers correctly signed requests.
    async fn handle_upstream(headers: HeaderMap, body: Bytes) -> Response {
        let verified = SignatureVerifier::new("s3cret").verify(&headers, "POST", PDF_PATH, &body);
        if let Err(e) = verified {
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
        if headers.get(HEADER_SERVICE_ID).and_then(|v| v.to_str().ok()) != Some("resume-editor") {
            return StatusCode::FORBIDDEN.into_response();
        }

        let request: Value = serde_json::from_slice(&body).unwrap_or_default();
        if request["data"]["personalInfo"]["firstName"] == "" {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": {"code": "INVALID_RESUME", "message": "First name is required"}})),
            )
                .into_response();
        }

        (
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"Ada_Lovelace_Resume.pdf\"",
                ),
            ],
            "%PDF-1.7 fake",
        )
            .into_response()
    }

    async fn spawn_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(PDF_PATH, post(handle_upstream));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}{PDF_PATH}")
    }

    fn app(url: &str, secret: Option<&str>) -> Router {
        build_router(AppState::new(&Config {
            port: 0,
            rust_log: "debug".to_string(),
            pdf_service: PdfServiceConfig {
                url: url.to_string(),
                service_id: "resume-editor".to_string(),
                hmac_secret: secret.map(str::to_string),
            },
        }))
    }

    fn pdf_request(content_type: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(PDF_PATH)
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn resume(first_name: &str) -> Value {
        json!({
            "data": {"personalInfo": {"firstName": first_name, "lastName": "Lovelace"}},
            "settings": {"showPhoto": false, "fontSize": "medium", "fontFamily": "times"}
        })
    }

    #[tokio::test]
    async fn test_signed_request_relays_pdf() {
        let url = spawn_upstream().await;

        let response = app(&url, Some("s3cret"))
            .oneshot(pdf_request("application/json; charset=utf-8", resume("Ada")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"Ada_Lovelace_Resume.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"%PDF-1.7 fake");
    }

    #[tokio::test]
    async fn test_upstream_errors_pass_through() {
        let url = spawn_upstream().await;

        let response = app(&url, Some("s3cret"))
            .oneshot(pdf_request("application/json", resume("")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_RESUME");
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected_upstream() {
        let url = spawn_upstream().await;

        let response = app(&url, Some("not-the-secret"))
            .oneshot(pdf_request("application/json", resume("Ada")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_json_content_type_is_bad_request() {
        let response = app("http://127.0.0.1:9/unused", Some("s3cret"))
            .oneshot(pdf_request("text/plain", resume("Ada")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "Content-Type must be application/json");
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let url = spawn_upstream().await;

        let response = app(&url, None)
            .oneshot(pdf_request("application/json", resume("Ada")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = app(&format!("http://{addr}{PDF_PATH}"), Some("s3cret"))
            .oneshot(pdf_request("application/json", resume("Ada")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert_eq!(body["error"]["message"], "Failed to reach PDF service");
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("http://127.0.0.1:9/unused", None)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resume-editor");
    }
}
