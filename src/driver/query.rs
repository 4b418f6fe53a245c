//! Query and Query Configuration
//!
//! 쿼리와 쿼리 실행 설정

use std::collections::HashMap;
use std::time::Duration;

use super::types::Value;

// ============================================================================
// AccessMode - 접근 모드
// ============================================================================

/// 접근 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// 읽기
    Read,
    /// 쓰기
    #[default]
    Write,
}

impl AccessMode {
    /// 와이어 표현 (대문자)
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
        }
    }
}

// ============================================================================
// Bookmark - 북마크
// ============================================================================

/// 인과적 일관성 북마크
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bookmark {
    value: String,
}

impl Bookmark {
    /// 새 북마크 생성
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// 북마크 값
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 빈 북마크 여부
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Display for Bookmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<String> for Bookmark {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Bookmark {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Query - 쿼리
// ============================================================================

/// 쿼리
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 쿼리 텍스트
    pub text: String,
    /// 파라미터
    pub parameters: HashMap<String, Value>,
}

impl Query {
    /// 새 쿼리 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: HashMap::new(),
        }
    }

    /// 파라미터 추가
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 파라미터들 추가
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// QueryConfig - 쿼리/트랜잭션 설정
// ============================================================================

/// 자동 커밋 쿼리와 트랜잭션 시작에 공통으로 쓰이는 설정
///
/// 비어 있는 항목은 요청 본문에서 생략된다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConfig {
    /// 데이터베이스 이름 (없으면 드라이버 기본값)
    pub database: Option<String>,
    /// 북마크
    pub bookmarks: Vec<Bookmark>,
    /// 접근 모드
    pub access_mode: Option<AccessMode>,
    /// 임퍼손트 사용자
    pub impersonated_user: Option<String>,
    /// 최대 실행 시간
    pub timeout: Option<Duration>,
}

impl QueryConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 데이터베이스 설정
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// 북마크 설정
    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// 북마크 추가
    pub fn with_bookmark(mut self, bookmark: impl Into<Bookmark>) -> Self {
        self.bookmarks.push(bookmark.into());
        self
    }

    /// 읽기 모드로 설정
    pub fn with_read_access(mut self) -> Self {
        self.access_mode = Some(AccessMode::Read);
        self
    }

    /// 쓰기 모드로 설정
    pub fn with_write_access(mut self) -> Self {
        self.access_mode = Some(AccessMode::Write);
        self
    }

    /// 임퍼손트 사용자 설정
    pub fn with_impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.impersonated_user = Some(user.into());
        self
    }

    /// 타임아웃 설정
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let query = Query::new("RETURN $x").with_param("x", 1).with_param("y", "two");
        assert_eq!(query.parameters.get("x"), Some(&Value::Integer(1)));
        assert_eq!(query.parameters.get("y"), Some(&Value::String("two".into())));
    }

    #[test]
    fn test_access_mode_wire_form() {
        assert_eq!(AccessMode::Read.as_str(), "READ");
        assert_eq!(AccessMode::default().as_str(), "WRITE");
    }

    #[test]
    fn test_query_config_builder() {
        let config = QueryConfig::new()
            .with_database("movies")
            .with_bookmark("bm:1")
            .with_read_access()
            .with_timeout(Duration::from_millis(1500));

        assert_eq!(config.database.as_deref(), Some("movies"));
        assert_eq!(config.bookmarks, vec![Bookmark::new("bm:1")]);
        assert_eq!(config.access_mode, Some(AccessMode::Read));
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }
}
