//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 파서, 사이클 집계기, 레코드 방출기, 싱크가 공유하는 데이터 구조를 정의합니다.
//!
//! ```text
//! 진단 로그 라인 ──▶ Sample ──▶ Cycle ──▶ OutputRecord ──▶ PointSink
//! 리소스 CSV 행  ─────────────────────────▶ OutputRecord
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Serialize, Serializer};

use crate::error::ParseError;

/// 진단 로그의 타임스탬프 형식 (`10-03-2020 14:20:42`)
pub const LOG_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// 출력 타임스탬프 형식 (`2020-03-10T14:20:42Z`)
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 초 단위 UTC 시각
///
/// 같은 값이면 같은 tick 입니다. 초 미만 정밀도는 보관하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// `DD-MM-YYYY HH:MM:SS` 형식의 로그 타임스탬프를 UTC로 해석합니다.
    pub fn parse_log(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        NaiveDateTime::parse_from_str(trimmed, LOG_TIMESTAMP_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| ParseError::Timestamp {
                value: trimmed.to_owned(),
                reason: e.to_string(),
            })
    }

    /// epoch 초에서 생성합니다. 표현 범위를 벗어나면 `None`.
    pub fn from_epoch_secs(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// epoch 초
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// 날짜를 2020-01-01, 시를 12로 고정하고 분/초만 유지한 시각을 반환합니다.
    ///
    /// 서로 다른 날에 수행된 벤치마크 실행을 같은 축에서 겹쳐 보기 위해 사용합니다.
    pub fn normalized(&self) -> Self {
        let shifted = self
            .0
            .with_day(1)
            .and_then(|t| t.with_month(1))
            .and_then(|t| t.with_year(2020))
            .and_then(|t| t.with_hour(12))
            .and_then(|t| t.with_nanosecond(0));
        Self(shifted.unwrap_or(self.0))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        // 초 미만 절삭
        let secs = value.timestamp();
        Self(DateTime::from_timestamp(secs, 0).unwrap_or(value))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(OUTPUT_TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 메트릭 라인 하나에서 추출한 샘플
///
/// `tags`에는 `metric`, `unit`을 제외한 모든 태그가 들어갑니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// 노드 이름 (파일 이름에서 추출, `.` → `_`)
    pub node: String,
    /// 샘플 시각
    pub timestamp: Timestamp,
    /// 메트릭 이름 (`metric` 태그)
    pub metric: String,
    /// 단위 (`unit` 태그, 없으면 `count`)
    pub unit: String,
    /// 나머지 태그
    pub tags: BTreeMap<String, String>,
    /// 값
    pub value: f64,
}

impl Sample {
    /// `unit` 태그가 없을 때의 기본 단위
    pub const DEFAULT_UNIT: &'static str = "count";
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}={} ({})",
            self.timestamp, self.node, self.metric, self.value, self.unit,
        )
    }
}

/// 싱크로 전달되는 정규화된 출력 레코드
///
/// 필드는 항상 하나(`단위 → 값`)입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    /// 측정값 이름
    pub measurement: String,
    /// 시각
    pub time: Timestamp,
    /// 태그 (`benchmark`, `node`, `import_id` 필수)
    pub tags: BTreeMap<String, String>,
    /// 필드
    pub fields: BTreeMap<String, f64>,
}

impl OutputRecord {
    /// 필드 하나를 가진 레코드를 생성합니다.
    pub fn new(
        measurement: impl Into<String>,
        time: Timestamp,
        field: impl Into<String>,
        value: f64,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), value);
        Self {
            measurement: measurement.into(),
            time,
            tags: BTreeMap::new(),
            fields,
        }
    }

    /// 태그를 추가합니다 (빌더 스타일).
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// InfluxDB line protocol 한 줄로 직렬화합니다 (초 정밀도, 개행 없음).
    ///
    /// 값이 비어 있는 태그는 생략합니다.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }
        let mut sep = ' ';
        for (key, value) in &self.fields {
            line.push(sep);
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&value.to_string());
            sep = ',';
        }
        line.push(' ');
        line.push_str(&self.time.epoch_secs().to_string());
        line
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

// 백슬래시는 항상 가장 먼저 이스케이프합니다.
fn escape_measurement(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

fn escape_key(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
