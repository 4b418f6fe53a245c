//! Transaction Handle
//!
//! 연결이 보관하는 현재 명시적 트랜잭션

use chrono::{DateTime, FixedOffset, Utc};

// ============================================================================
// TransactionHandle - 트랜잭션 핸들
// ============================================================================

/// 서버가 발급한 트랜잭션 정보
///
/// 한 연결에 최대 하나만 존재한다. 에러, 커밋, 롤백, 리셋 시 제거된다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    /// 트랜잭션 ID
    pub id: String,
    /// 데이터베이스 이름
    pub database: String,
    /// 만료 시각
    pub expires: Option<DateTime<FixedOffset>>,
    /// 어피니티 토큰 (이후 요청 헤더로 전달)
    pub affinity: Option<String>,
}

impl TransactionHandle {
    /// 새 핸들 생성
    pub fn new(id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            database: database.into(),
            expires: None,
            affinity: None,
        }
    }

    /// 만료 시각 설정
    pub fn with_expires(mut self, expires: Option<DateTime<FixedOffset>>) -> Self {
        self.expires = expires;
        self
    }

    /// 어피니티 설정
    pub fn with_affinity(mut self, affinity: Option<String>) -> Self {
        self.affinity = affinity;
        self
    }

    /// 만료 여부 (만료 시각을 모르면 false)
    pub fn is_expired(&self) -> bool {
        self.expires.map(|e| e < Utc::now()).unwrap_or(false)
    }
}
