//! 고정 카탈로그 데이터.
//!
//! REST 스킬 카탈로그와 실시간 포트폴리오 업데이트에 쓰이는 정적 값.

/// 스킬 카테고리 목록 (표시 순서).
pub const SKILL_CATEGORIES: [&str; 9] = [
    "DevOps & Infrastructure",
    "Cloud Platforms",
    "Programming Languages",
    "Python Libraries & Frameworks",
    "ERP & Business Systems",
    "Databases & Storage",
    "System Administration",
    "Monitoring & Security",
    "Web Development",
];

/// `portfolio_update` 이벤트로 알리는 신규 스킬.
pub const NEW_SKILLS: [&str; 3] = ["Odoo 17", "Advanced Kubernetes", "ML Pipeline Optimization"];

/// `portfolio_update` 이벤트의 업데이트 유형.
pub const SKILLS_UPDATE: &str = "skills_update";

/// 문의 접수 확인 메시지.
pub const CONTACT_ACKNOWLEDGMENT: &str = "Thank you for your message! I'll get back to you soon.";

pub fn skill_categories() -> Vec<String> {
    SKILL_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

pub fn new_skills() -> Vec<String> {
    NEW_SKILLS.iter().map(|s| s.to_string()).collect()
}
