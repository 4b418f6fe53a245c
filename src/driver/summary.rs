//! Result Summary
//!
//! 결과 요약, 카운터, 알림

use serde::Deserialize;

use super::config::ServerAddress;
use super::query::Bookmark;

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
///
/// 스트림이 성공적으로 끝날 때 관찰자에게 전달된다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    /// 카운터
    pub counters: Counters,
    /// 북마크 (자동 커밋 또는 커밋 응답)
    pub bookmarks: Vec<Bookmark>,
    /// 알림
    pub notifications: Vec<Notification>,
    /// 프로파일 플랜 (원본 JSON)
    pub profiled_plan: Option<serde_json::Value>,
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// 서버 주소
    pub server: Option<ServerAddress>,
    /// 스트림 요약
    pub stream: StreamSummary,
}

/// 스트림 진행 기록
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// 행을 한 번이라도 받았는지
    pub have_records_streamed: bool,
    /// 키를 받았는지
    pub has_keys: bool,
    /// 끝까지 당겨졌는지
    pub pulled: bool,
}

// ============================================================================
// Counters - 카운터
// ============================================================================

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
    /// 시스템 변경 수
    pub system_updates: i64,
}

impl Counters {
    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
            || self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }

    /// 시스템 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.system_updates > 0
    }
}

// ============================================================================
// Notification - 알림
// ============================================================================

/// 알림
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Notification {
    /// 코드
    pub code: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도
    pub severity: String,
    /// 분류
    pub category: Option<String>,
    /// 위치
    pub position: Option<InputPosition>,
}

/// 입력 위치
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputPosition {
    /// 오프셋
    pub offset: i64,
    /// 라인
    pub line: i64,
    /// 컬럼
    pub column: i64,
}
