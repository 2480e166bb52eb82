//! 문의 접수 endpoint.
//!
//! 문의는 저장하거나 전달하지 않고 로그만 남깁니다. 필드 검증은 느슨해서
//! 실패해도 경고 로그만 남기고 접수 확인을 돌려줍니다.
//! 본문은 JSON 또는 `application/x-www-form-urlencoded`입니다.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    routing::post,
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use portfolio_core::catalog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 문의 요청.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "message is required"))]
    pub message: String,
}

/// 문의 접수 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    /// 항상 "success"
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// 문의 접수.
#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "문의 접수 확인", body = ContactResponse),
        (status = 400, description = "JSON/폼 본문이 아님", body = ApiErrorResponse),
        (status = 429, description = "요청 한도 초과", body = ApiErrorResponse)
    )
)]
pub async fn submit_contact(request: Request) -> ApiResult<Json<ContactResponse>> {
    let body = read_body(request).await.map_err(|message| {
        ApiErrorResponse::new("Bad Request")
            .with_message(message)
            .with_status(StatusCode::BAD_REQUEST)
    })?;

    match serde_json::from_value::<ContactRequest>(body) {
        Ok(request) => {
            if let Err(errors) = request.validate() {
                warn!(errors = %errors, "Contact form failed validation");
            }
            info!(
                name = %request.name,
                email = %request.email,
                message_len = request.message.len(),
                "Contact form submission"
            );
        }
        Err(e) => warn!(error = %e, "Contact form has unexpected shape"),
    }

    Ok(Json(ContactResponse {
        status: "success".to_string(),
        message: catalog::CONTACT_ACKNOWLEDGMENT.to_string(),
        timestamp: Utc::now(),
    }))
}

/// 본문을 JSON 값으로 읽습니다. 폼 필드는 문자열 값이 됩니다.
async fn read_body(request: Request) -> Result<Value, String> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|rejection| rejection.body_text())?;
        Ok(Value::Object(
            fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        ))
    } else {
        let Json(value) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|rejection| rejection.body_text())?;
        Ok(value)
    }
}

/// 문의 라우터 생성.
pub fn contact_router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(submit_contact))
}
