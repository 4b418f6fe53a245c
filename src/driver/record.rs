//! Record - 쿼리 결과 레코드
//!
//! 결과 스트림의 한 행. 같은 결과의 행들은 키 목록을 공유한다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{DriverError, DriverResult};
use super::types::{Duration, Node, Path, Point, Relationship, Value};

// ============================================================================
// RecordKeys - 공유 키 목록
// ============================================================================

/// 컬럼 키와 키-인덱스 매핑 (결과 하나당 한 번 생성)
#[derive(Debug, PartialEq)]
pub struct RecordKeys {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl RecordKeys {
    /// 키 목록에서 생성
    pub fn new(keys: Vec<String>) -> Arc<Self> {
        let index = keys.iter().enumerate().map(|(i, k)| (k.clone(), i)).collect();
        Arc::new(Self { keys, index })
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

// ============================================================================
// Record - 단일 레코드
// ============================================================================

/// 쿼리 결과 레코드
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Arc<RecordKeys>,
    values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(keys: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_keys(RecordKeys::new(keys), values)
    }

    /// 공유 키로 레코드 생성
    pub fn with_keys(keys: Arc<RecordKeys>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys.keys
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 레코드 길이
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 레코드 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 키로 값 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys.index.get(key).and_then(|&i| self.values.get(i))
    }

    /// 인덱스로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 키로 타입 변환된 값 가져오기
    ///
    /// 디코딩에 실패한 필드는 디코딩 당시의 에러를 반환한다.
    pub fn get_as<T>(&self, key: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        self.get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Key '{}' not found", key)))
            .and_then(|v| T::try_from(v))
    }

    /// Boolean 값 가져오기
    pub fn get_bool(&self, key: &str) -> DriverResult<bool> {
        self.get_as::<bool>(key)
    }

    /// Integer 값 가져오기
    pub fn get_int(&self, key: &str) -> DriverResult<i64> {
        self.get_as::<i64>(key)
    }

    /// Float 값 가져오기
    pub fn get_float(&self, key: &str) -> DriverResult<f64> {
        self.get_as::<f64>(key)
    }

    /// String 값 가져오기
    pub fn get_string(&self, key: &str) -> DriverResult<String> {
        self.get_as::<String>(key)
    }

    /// Node 값 가져오기
    pub fn get_node(&self, key: &str) -> DriverResult<Node> {
        self.get_as::<Node>(key)
    }

    /// Relationship 값 가져오기
    pub fn get_relationship(&self, key: &str) -> DriverResult<Relationship> {
        self.get_as::<Relationship>(key)
    }

    /// Path 값 가져오기
    pub fn get_path(&self, key: &str) -> DriverResult<Path> {
        self.get_as::<Path>(key)
    }

    /// Point 값 가져오기
    pub fn get_point(&self, key: &str) -> DriverResult<Point> {
        self.get_as::<Point>(key)
    }

    /// Duration 값 가져오기
    pub fn get_duration(&self, key: &str) -> DriverResult<Duration> {
        self.get_as::<Duration>(key)
    }

    /// Optional 값 가져오기 (None은 Null)
    pub fn get_optional<T>(&self, key: &str) -> DriverResult<Option<T>>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        match self.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(v) => T::try_from(v.clone()).map(Some),
        }
    }

    /// Map으로 변환
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys()
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// 키 존재 여부
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.index.contains_key(key)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys()
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Tests
// ============================================================================
