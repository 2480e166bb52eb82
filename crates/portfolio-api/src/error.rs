//! 통합 API 에러 응답 타입.
//!
//! 모든 REST 엔드포인트, 404 fallback, 패닉 처리에서 같은 형식을 씁니다.
//!
//! ```json
//! { "error": "Not Found", "path": "/nope" }
//! ```

use std::any::Any;

use axum::{
    body::Body,
    http::{Response, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::ResponseForPanic;
use utoipa::ToSchema;

/// 통합 API 에러 응답.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 요약 (예: "Not Found", "Bad Request")
    pub error: String,
    /// 사람이 읽을 수 있는 상세 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 요청 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiErrorResponse {
    /// 요약만 있는 에러 생성.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            path: None,
        }
    }

    /// 상세 메시지를 추가합니다.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 요청 경로를 추가합니다.
    #[must_use]
    pub fn with_path(mut self, uri: &Uri) -> Self {
        self.path = Some(uri.path().to_string());
        self
    }

    /// 상태 코드와 묶어 핸들러 에러로 변환.
    pub fn with_status(self, status: StatusCode) -> (StatusCode, Json<ApiErrorResponse>) {
        (status, Json(self))
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.error, message),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
///
/// # Example
///
/// ```ignore
/// async fn poll_events(Path(id): Path<String>) -> ApiResult<Json<PollEvents>> {
///     let id = id.parse().map_err(|_| ApiErrorResponse::new("Not Found").with_status(StatusCode::NOT_FOUND))?;
///     // ...
/// }
/// ```
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 등록되지 않은 경로에 대한 fallback 핸들러.
pub async fn not_found_handler(uri: Uri) -> (StatusCode, Json<ApiErrorResponse>) {
    ApiErrorResponse::new("Not Found")
        .with_path(&uri)
        .with_status(StatusCode::NOT_FOUND)
}

/// 핸들러 패닉을 500 응답으로 변환.
///
/// 개발 환경에서만 패닉 메시지를 응답에 포함합니다.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder {
    expose_details: bool,
}

impl PanicResponder {
    pub fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let detail = panic_message(err.as_ref());
        tracing::error!(panic = %detail, "Unhandled panic in request handler");

        let message = if self.expose_details {
            detail
        } else {
            "Internal server error".to_string()
        };

        ApiErrorResponse::new("Something went wrong!")
            .with_message(message)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response()
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}
