//! Driver Types
//!
//! 드라이버에서 사용하는 타입 정의

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use super::error::{DriverError, DriverResult};
use crate::query_api::codec::temporal;

// ============================================================================
// Value - 그래프 값
// ============================================================================

/// 그래프 값 타입
///
/// 정수는 디코딩 시 선택한 [`IntegerMode`](crate::query_api::codec::IntegerMode)에 따라
/// `Integer`, `Number`, `BigInt` 중 하나로 표현된다.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64, 무손실)
    Integer(i64),
    /// 정수를 f64로 표현 (±2^53 까지 정확)
    Number(f64),
    /// 정수를 i128로 표현
    BigInt(i128),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// List
    List(Vec<Value>),
    /// Map
    Map(HashMap<String, Value>),
    /// Node
    Node(Node),
    /// Relationship
    Relationship(Relationship),
    /// Path
    Path(Path),
    /// Point (2D/3D)
    Point(Point),
    /// Date
    Date(NaiveDate),
    /// Time (오프셋 포함)
    Time(OffsetTime),
    /// LocalTime
    LocalTime(NaiveTime),
    /// DateTime (오프셋 포함)
    DateTime(DateTime<FixedOffset>),
    /// ZonedDateTime (타임존 ID 포함)
    ZonedDateTime(ZonedDateTime),
    /// LocalDateTime
    LocalDateTime(NaiveDateTime),
    /// Duration
    Duration(Duration),
    /// 디코딩에 실패한 필드 (같은 행의 다른 필드는 유지)
    Invalid(InvalidValue),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean으로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer로 변환 (세 가지 정수 표현 모두 허용)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::BigInt(i) => i64::try_from(*i).ok(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 => Some(*n as i64),
            _ => None,
        }
    }

    /// Float로 변환
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) | Value::Number(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::BigInt(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String으로 변환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Bytes로 변환
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// List로 변환
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map으로 변환
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Node로 변환
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Relationship으로 변환
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Path로 변환
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Point로 변환
    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Value::Point(p) => Some(p),
            _ => None,
        }
    }

    /// 디코딩 실패 필드 여부
    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid(_))
    }

    /// 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Number(_) => "Number",
            Value::BigInt(_) => "BigInt",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::Point(_) => "Point",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::LocalTime(_) => "LocalTime",
            Value::DateTime(_) => "DateTime",
            Value::ZonedDateTime(_) => "ZonedDateTime",
            Value::LocalDateTime(_) => "LocalDateTime",
            Value::Duration(_) => "Duration",
            Value::Invalid(_) => "Invalid",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::BigInt(i) => write!(f, "{}n", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{}", n),
            Value::Relationship(r) => write!(f, "{}", r),
            Value::Path(p) => write!(f, "{}", p),
            Value::Point(p) => write!(f, "{}", p),
            Value::Date(d) => write!(f, "{}", temporal::format_date(d)),
            Value::Time(t) => write!(f, "{}", t),
            Value::LocalTime(t) => write!(f, "{}", temporal::format_local_time(t)),
            Value::DateTime(dt) => write!(f, "{}", temporal::format_offset_date_time(dt)),
            Value::ZonedDateTime(dt) => write!(f, "{}", dt),
            Value::LocalDateTime(dt) => write!(f, "{}", temporal::format_local_date_time(dt)),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Invalid(v) => write!(f, "<invalid {}: {}>", v.kind, v.error),
        }
    }
}

// From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Value::Point(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::LocalTime(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::LocalDateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTime(v)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// InvalidValue - 디코딩 실패 값
// ============================================================================

/// 디코딩할 수 없었던 필드
///
/// 원본 텍스트와 에러를 보존한다. 타입 변환 시 보존된 에러가 반환된다.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidValue {
    /// 와이어 타입 이름
    pub kind: String,
    /// 원본 텍스트
    pub raw: String,
    /// 디코딩 에러
    pub error: DriverError,
}

impl InvalidValue {
    /// 새 실패 값 생성
    pub fn new(kind: impl Into<String>, raw: impl Into<String>, error: DriverError) -> Self {
        Self {
            kind: kind.into(),
            raw: raw.into(),
            error,
        }
    }
}

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// 엘리먼트 ID
    pub element_id: String,
    /// 레이블 (중복 없음, 순서 무관)
    pub labels: Vec<String>,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// 새 노드 생성 (중복 레이블 제거)
    pub fn new(
        element_id: impl Into<String>,
        labels: Vec<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self {
            element_id: element_id.into(),
            labels: unique,
            properties,
        }
    }

    /// 레이블 포함 여부
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 속성 가져오기 (타입 변환)
    pub fn get_as<T: TryFrom<Value, Error = DriverError>>(&self, key: &str) -> DriverResult<T> {
        self.properties
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Property '{}' not found", key)))
            .and_then(|v| T::try_from(v))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.element_id, labels)
    }
}

// ============================================================================
// Relationship - 그래프 관계
// ============================================================================

/// 그래프 관계
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// 엘리먼트 ID
    pub element_id: String,
    /// 시작 노드 엘리먼트 ID
    pub start_node_element_id: String,
    /// 끝 노드 엘리먼트 ID
    pub end_node_element_id: String,
    /// 타입
    pub rel_type: String,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    /// 새 관계 생성
    pub fn new(
        element_id: impl Into<String>,
        start_node_element_id: impl Into<String>,
        end_node_element_id: impl Into<String>,
        rel_type: impl Into<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            start_node_element_id: start_node_element_id.into(),
            end_node_element_id: end_node_element_id.into(),
            rel_type: rel_type.into(),
            properties,
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})  [id: {}]",
            self.start_node_element_id, self.rel_type, self.end_node_element_id, self.element_id
        )
    }
}

// ============================================================================
// Path - 그래프 경로
// ============================================================================

/// 경로의 한 구간 (시작 노드, 관계, 끝 노드)
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    /// 시작 노드
    pub start: Node,
    /// 관계
    pub relationship: Relationship,
    /// 끝 노드
    pub end: Node,
}

/// 그래프 경로
///
/// `segments[n].end`와 `segments[n + 1].start`는 같은 노드다.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// 시작 노드
    pub start: Node,
    /// 끝 노드
    pub end: Node,
    /// 구간들
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// 새 경로 생성
    pub fn new(start: Node, end: Node, segments: Vec<PathSegment>) -> Self {
        Self { start, end, segments }
    }

    /// 경로 길이 (관계 수)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// 빈 경로 여부
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 경로상의 노드들 (순서대로)
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes = vec![&self.start];
        nodes.extend(self.segments.iter().map(|s| &s.end));
        nodes
    }

    /// 경로상의 관계들 (순서대로)
    pub fn relationships(&self) -> Vec<&Relationship> {
        self.segments.iter().map(|s| &s.relationship).collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Path: {} -> {}, {} segments>", self.start, self.end, self.segments.len())
    }
}

// ============================================================================
// Point - 공간 좌표
// ============================================================================

/// 공간 좌표
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// SRID (Spatial Reference ID)
    pub srid: i32,
    /// X 좌표 (경도)
    pub x: f64,
    /// Y 좌표 (위도)
    pub y: f64,
    /// Z 좌표 (고도, 선택적)
    pub z: Option<f64>,
}

impl Point {
    /// 2D 포인트 생성
    pub fn new_2d(srid: i32, x: f64, y: f64) -> Self {
        Self { srid, x, y, z: None }
    }

    /// 3D 포인트 생성
    pub fn new_3d(srid: i32, x: f64, y: f64, z: f64) -> Self {
        Self { srid, x, y, z: Some(z) }
    }

    /// WGS84 2D 포인트 (경도, 위도)
    pub fn wgs84_2d(longitude: f64, latitude: f64) -> Self {
        Self::new_2d(4326, longitude, latitude)
    }

    /// WGS84 3D 포인트 (경도, 위도, 고도)
    pub fn wgs84_3d(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new_3d(4979, longitude, latitude, height)
    }

    /// Cartesian 2D 포인트
    pub fn cartesian_2d(x: f64, y: f64) -> Self {
        Self::new_2d(7203, x, y)
    }

    /// Cartesian 3D 포인트
    pub fn cartesian_3d(x: f64, y: f64, z: f64) -> Self {
        Self::new_3d(9157, x, y, z)
    }

    /// 3D 여부
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "Point(srid={}, x={}, y={}, z={})", self.srid, self.x, self.y, z),
            None => write!(f, "Point(srid={}, x={}, y={})", self.srid, self.x, self.y),
        }
    }
}

// ============================================================================
// Duration - 시간 간격
// ============================================================================

/// 시간 간격
///
/// `nanoseconds`는 항상 `0..1_000_000_000` 범위로 정규화된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    /// 개월
    pub months: i64,
    /// 일
    pub days: i64,
    /// 초
    pub seconds: i64,
    /// 나노초
    pub nanoseconds: i32,
}

impl Duration {
    /// 새 Duration 생성
    pub fn new(months: i64, days: i64, seconds: i64, nanoseconds: i32) -> Self {
        let carry = nanoseconds.div_euclid(1_000_000_000) as i64;
        Self {
            months,
            days,
            seconds: seconds + carry,
            nanoseconds: nanoseconds.rem_euclid(1_000_000_000),
        }
    }

    /// 초에서 생성
    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(0, 0, seconds, 0)
    }

    /// 일에서 생성
    pub fn from_days(days: i64) -> Self {
        Self::new(0, days, 0, 0)
    }

    /// 개월에서 생성
    pub fn from_months(months: i64) -> Self {
        Self::new(months, 0, 0, 0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&temporal::format_duration(self))
    }
}

// ============================================================================
// OffsetTime / ZonedDateTime - 오프셋 시간, 타임존 일시
// ============================================================================

/// UTC 오프셋이 붙은 시간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetTime {
    /// 시간
    pub time: NaiveTime,
    /// UTC 오프셋
    pub offset: FixedOffset,
}

impl OffsetTime {
    /// 새 시간 생성
    pub fn new(time: NaiveTime, offset: FixedOffset) -> Self {
        Self { time, offset }
    }
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&temporal::format_time(self))
    }
}

/// 타임존 ID가 붙은 일시
///
/// 오프셋이 없으면 DST 전환 구간에서 표기가 모호하므로 인코딩할 수 없다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZonedDateTime {
    /// 현지 일시
    pub local: NaiveDateTime,
    /// UTC 오프셋 (알려진 경우)
    pub offset: Option<FixedOffset>,
    /// 타임존 ID (예: `Europe/Stockholm`)
    pub zone_id: String,
}

impl ZonedDateTime {
    /// 오프셋이 확정된 일시에서 생성
    pub fn new(datetime: DateTime<FixedOffset>, zone_id: impl Into<String>) -> Self {
        Self {
            local: datetime.naive_local(),
            offset: Some(*datetime.offset()),
            zone_id: zone_id.into(),
        }
    }

    /// 오프셋 없이 현지 일시와 타임존 ID만으로 생성
    pub fn with_zone_only(local: NaiveDateTime, zone_id: impl Into<String>) -> Self {
        Self {
            local,
            offset: None,
            zone_id: zone_id.into(),
        }
    }

    /// 오프셋 포함 일시
    pub fn offset_date_time(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        self.local.and_local_timezone(offset).single()
    }
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match temporal::format_zoned_date_time(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}[{}]", temporal::format_local_date_time(&self.local), self.zone_id),
        }
    }
}

// ============================================================================
// TryFrom implementations
// ============================================================================

/// 변환 실패 에러 (디코딩 실패 필드는 보존된 에러를 그대로 반환)
fn conversion_error(value: Value, target: &str) -> DriverError {
    match value {
        Value::Invalid(invalid) => invalid.error,
        other => DriverError::type_conversion(format!(
            "Cannot convert {} to {}",
            other.type_name(),
            target
        )),
    }
}

impl TryFrom<Value> for bool {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(conversion_error(other, "bool")),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_int() {
            Some(i) => Ok(i),
            None => Err(conversion_error(value, "i64")),
        }
    }
}

impl TryFrom<Value> for i128 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::BigInt(i) => Ok(i),
            Value::Integer(i) => Ok(i as i128),
            Value::Number(n) if n.fract() == 0.0 => Ok(n as i128),
            other => Err(conversion_error(other, "i128")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_float() {
            Some(f) => Ok(f),
            None => Err(conversion_error(value, "f64")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(conversion_error(other, "String")),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(conversion_error(other, "Vec<u8>")),
        }
    }
}

impl TryFrom<Value> for Node {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Node(n) => Ok(n),
            other => Err(conversion_error(other, "Node")),
        }
    }
}

impl TryFrom<Value> for Relationship {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Relationship(r) => Ok(r),
            other => Err(conversion_error(other, "Relationship")),
        }
    }
}

impl TryFrom<Value> for Path {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Path(p) => Ok(p),
            other => Err(conversion_error(other, "Path")),
        }
    }
}

impl TryFrom<Value> for Point {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Point(p) => Ok(p),
            other => Err(conversion_error(other, "Point")),
        }
    }
}

impl TryFrom<Value> for Duration {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Duration(d) => Ok(d),
            other => Err(conversion_error(other, "Duration")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
