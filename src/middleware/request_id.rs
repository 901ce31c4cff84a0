use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation ID for one HTTP request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller-supplied ID made of visible ASCII, up to 128 bytes
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        let value = value.to_str().ok()?.trim();
        let valid = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reuses a valid incoming `x-request-id` or generates one, exposes it to
/// handlers as an extension and echoes it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Span for `TraceLayer`, tagged with the request ID when the middleware ran first
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Extension, Router};
    use axum_test::TestServer;

    async fn echo(Extension(request_id): Extension<RequestId>) -> String {
        request_id.to_string()
    }

    fn server() -> TestServer {
        let app = Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn(request_id_middleware));
        TestServer::new(app).unwrap()
    }

    #[test]
    fn test_header_validation() {
        assert!(RequestId::from_header(&HeaderValue::from_static("abc-123")).is_some());
        assert!(RequestId::from_header(&HeaderValue::from_static("  ")).is_none());
        assert!(RequestId::from_header(&HeaderValue::from_static("has space")).is_none());
        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        assert!(RequestId::from_header(&HeaderValue::from_str(&long).unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_incoming_id_is_reused() {
        let response = server()
            .get("/")
            .add_header(
                axum::http::HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderValue::from_static("trace-42"),
            )
            .await;

        assert_eq!(response.text(), "trace-42");
        assert_eq!(response.header(REQUEST_ID_HEADER), "trace-42");
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let response = server().get("/").await;
        let id = response.text();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(response.header(REQUEST_ID_HEADER), id.as_str());
    }
}
