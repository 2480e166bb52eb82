//! 실시간 메시지 타입.
//!
//! 클라이언트-서버 간 교환되는 이벤트 정의. 모든 프레임은
//! `{"event": "<이름>", "data": {...}}` 형태의 JSON입니다.

use chrono::{DateTime, Utc};
use portfolio_core::catalog;
use portfolio_core::AggregateSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 실시간 채널 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ==================== 클라이언트 → 서버 메시지 ====================

/// 해석 전의 인바운드 프레임.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    /// 이벤트 이름
    pub event: String,
    /// 페이로드 (생략 가능)
    #[serde(default)]
    pub data: Value,
}

impl ClientFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidFrame(e.to_string()))
    }
}

/// `page_view` 페이로드.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewPayload {
    pub page: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// `skill_interaction` 페이로드.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkillInteractionPayload {
    pub skill: String,
}

/// `project_view` 페이로드.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectViewPayload {
    pub project: String,
}

/// `contact_form` 페이로드. 모든 필드는 로그용이라 선택적입니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFormPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl ContactFormPayload {
    /// 어떤 값이든 받아들입니다. 문자열이 아닌 필드는 버립니다.
    pub fn from_value(data: &Value) -> Self {
        let field = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: field("name"),
            email: field("email"),
            message: field("message"),
        }
    }
}

/// 해석된 클라이언트 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    PageView(PageViewPayload),
    SkillInteraction(SkillInteractionPayload),
    ProjectView(ProjectViewPayload),
    ContactForm(ContactFormPayload),
    RequestPortfolioUpdate,
}

impl ClientEvent {
    pub const PAGE_VIEW: &'static str = "page_view";
    pub const SKILL_INTERACTION: &'static str = "skill_interaction";
    pub const PROJECT_VIEW: &'static str = "project_view";
    pub const CONTACT_FORM: &'static str = "contact_form";
    pub const REQUEST_PORTFOLIO_UPDATE: &'static str = "request_portfolio_update";

    /// 프레임을 이벤트로 해석.
    ///
    /// 알 수 없는 이벤트 이름은 `Ok(None)`입니다. 알려진 이벤트의
    /// 페이로드 형태가 맞지 않으면 `WsError::InvalidPayload`를 반환합니다.
    pub fn parse(frame: ClientFrame) -> Result<Option<Self>, WsError> {
        let ClientFrame { event, data } = frame;
        let data = if data.is_null() {
            Value::Object(Default::default())
        } else {
            data
        };

        let parsed = match event.as_str() {
            Self::PAGE_VIEW => Self::PageView(payload(&event, data)?),
            Self::SKILL_INTERACTION => Self::SkillInteraction(payload(&event, data)?),
            Self::PROJECT_VIEW => Self::ProjectView(payload(&event, data)?),
            // 접수 확인은 페이로드 형태와 무관하게 보냄
            Self::CONTACT_FORM => Self::ContactForm(ContactFormPayload::from_value(&data)),
            Self::REQUEST_PORTFOLIO_UPDATE => Self::RequestPortfolioUpdate,
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// 이벤트 이름.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageView(_) => Self::PAGE_VIEW,
            Self::SkillInteraction(_) => Self::SKILL_INTERACTION,
            Self::ProjectView(_) => Self::PROJECT_VIEW,
            Self::ContactForm(_) => Self::CONTACT_FORM,
            Self::RequestPortfolioUpdate => Self::REQUEST_PORTFOLIO_UPDATE,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Result<T, WsError> {
    serde_json::from_value(data).map_err(|e| WsError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

// ==================== 서버 → 클라이언트 메시지 ====================

/// 서버에서 클라이언트로 보내는 메시지.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 실시간 접속자 수
    UserCount(UserCountData),
    /// 방문자 분석 스냅샷
    VisitorAnalytics(AggregateSnapshot),
    /// 다른 방문자가 본 스킬
    SkillPopular(SkillPopularData),
    /// 다른 방문자가 본 프로젝트
    ProjectActivity(ProjectActivityData),
    /// 문의 접수 확인
    ContactResponse(ContactResponseData),
    /// 포트폴리오 업데이트
    PortfolioUpdate(PortfolioUpdateData),
}

impl ServerMessage {
    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::from)
    }

    /// 이벤트 이름.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserCount(_) => "user_count",
            Self::VisitorAnalytics(_) => "visitor_analytics",
            Self::SkillPopular(_) => "skill_popular",
            Self::ProjectActivity(_) => "project_activity",
            Self::ContactResponse(_) => "contact_response",
            Self::PortfolioUpdate(_) => "portfolio_update",
        }
    }

    pub fn user_count(count: usize) -> Self {
        Self::UserCount(UserCountData { count })
    }

    pub fn skill_popular(skill: impl Into<String>) -> Self {
        Self::SkillPopular(SkillPopularData {
            skill: skill.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn project_activity(project: impl Into<String>) -> Self {
        Self::ProjectActivity(ProjectActivityData {
            project: project.into(),
            timestamp: Utc::now(),
        })
    }

    /// 문의 접수 확인 (`status: "received"`).
    pub fn contact_received() -> Self {
        Self::ContactResponse(ContactResponseData {
            status: "received".to_string(),
            message: catalog::CONTACT_ACKNOWLEDGMENT.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// 신규 스킬 업데이트.
    pub fn skills_update() -> Self {
        Self::PortfolioUpdate(PortfolioUpdateData {
            kind: catalog::SKILLS_UPDATE.to_string(),
            data: SkillsUpdateData {
                new_skills: catalog::new_skills(),
                updated_at: Utc::now(),
            },
        })
    }
}

// ==================== 데이터 타입 ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCountData {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPopularData {
    pub skill: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectActivityData {
    pub project: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResponseData {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioUpdateData {
    /// 업데이트 유형 (예: "skills_update")
    #[serde(rename = "type")]
    pub kind: String,
    pub data: SkillsUpdateData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsUpdateData {
    pub new_skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
