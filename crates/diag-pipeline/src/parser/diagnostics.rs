//! 진단 로그 메트릭 라인 파서
//!
//! # 라인 형식
//! ```text
//! 10-03-2020 14:20:42 1583850042297 Metric[[thread=hz.foo.thread-1,unit=count,metric=operation.thread.priorityPendingCount]=0]
//! └──── 20자 타임스탬프 ───┘           └마커┘ └──────────────── 태그 목록 ────────────────────────────────┘ └값┘
//! ```
//!
//! 노드 이름은 라인이 아니라 파일 이름(`diagnostics-<node>-<suffix>.log`)에서 얻습니다.
//!
//! # 사용 예시
//! ```ignore
//! use diagflux_pipeline::parser::DiagnosticsParser;
//!
//! let parser = DiagnosticsParser::for_file("diagnostics-member1-20200310.log")?;
//! let sample = parser.parse_line(line)?;
//! assert_eq!(sample.node, "member1");
//! ```

use std::collections::BTreeMap;

use diagflux_core::types::{Sample, Timestamp};

use crate::error::ImportError;

/// 메트릭 라인 마커
pub const METRIC_MARKER: &str = " Metric[";

/// 진단 로그 파일 이름 접두어
pub const FILE_PREFIX: &str = "diagnostics-";

/// 진단 로그 파일 확장자
pub const FILE_EXTENSION: &str = ".log";

/// 라인 앞 고정폭 타임스탬프 길이
const TIMESTAMP_WIDTH: usize = 20;

/// 태그/값 구분자
const VALUE_DELIMITER: &str = "]=";

/// 라인이 메트릭 마커를 포함하는지 확인합니다.
pub fn is_metric_line(line: &str) -> bool {
    line.contains(METRIC_MARKER)
}

/// 진단 로그 파일 이름인지 확인합니다.
pub fn is_diagnostics_file(file_name: &str) -> bool {
    file_name.starts_with(FILE_PREFIX) && file_name.ends_with(FILE_EXTENSION)
}

/// 파일 이름에서 노드 이름을 추출합니다.
///
/// 접두어와 다음 `-` 사이의 문자열이며 `.`은 `_`로 바꿉니다.
/// `diagnostics-10.0.0.1-1583850000.log` → `10_0_0_1`
pub fn node_name_from_file(file_name: &str) -> Result<String, ImportError> {
    let node_name_error = || ImportError::NodeName {
        file: file_name.to_owned(),
    };

    let rest = file_name
        .strip_prefix(FILE_PREFIX)
        .ok_or_else(node_name_error)?;
    let end = rest.find('-').ok_or_else(node_name_error)?;
    let node = &rest[..end];
    if node.is_empty() {
        return Err(node_name_error());
    }
    Ok(node.replace('.', "_"))
}

/// 한 파일에 속한 메트릭 라인 파서
///
/// 파일마다 하나씩 만들며, 노드 이름을 보관합니다.
#[derive(Debug, Clone)]
pub struct DiagnosticsParser {
    node: String,
}

impl DiagnosticsParser {
    /// 노드 이름을 직접 지정해 생성합니다.
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    /// 파일 이름에서 노드 이름을 추출해 생성합니다.
    pub fn for_file(file_name: &str) -> Result<Self, ImportError> {
        Ok(Self::new(node_name_from_file(file_name)?))
    }

    /// 노드 이름
    pub fn node(&self) -> &str {
        &self.node
    }

    /// 메트릭 라인 하나를 [`Sample`]로 파싱합니다.
    ///
    /// 마커가 없거나, 구분자가 빠졌거나, 값이 유한한 숫자가 아니거나,
    /// `metric` 태그가 없으면 에러입니다.
    pub fn parse_line(&self, line: &str) -> Result<Sample, ImportError> {
        let head = line
            .get(..TIMESTAMP_WIDTH)
            .ok_or_else(|| ImportError::diagnostics(0, "line shorter than timestamp field"))?;
        let timestamp = Timestamp::parse_log(head)
            .map_err(|e| ImportError::diagnostics(0, e.to_string()))?;

        let marker_pos = line
            .find(METRIC_MARKER)
            .ok_or_else(|| ImportError::diagnostics(TIMESTAMP_WIDTH, "metric marker not found"))?;
        let mut payload_start = marker_pos + METRIC_MARKER.len();
        if line[payload_start..].starts_with('[') {
            payload_start += 1;
        }
        let payload = &line[payload_start..];

        let tags_end = payload.find(VALUE_DELIMITER).ok_or_else(|| {
            ImportError::diagnostics(payload_start, "missing ']=' delimiter after tag list")
        })?;
        let value_start = payload_start + tags_end + VALUE_DELIMITER.len();
        let value_region = &line[value_start..];
        let value_end = value_region
            .find(']')
            .ok_or_else(|| ImportError::diagnostics(value_start, "unterminated value"))?;
        let raw_value = value_region[..value_end].trim();
        let value: f64 = raw_value.parse().map_err(|_| {
            ImportError::diagnostics(value_start, format!("non-numeric value '{raw_value}'"))
        })?;
        if !value.is_finite() {
            return Err(ImportError::diagnostics(
                value_start,
                format!("non-finite value '{raw_value}'"),
            ));
        }

        let mut tags = parse_tags(&payload[..tags_end], payload_start)?;
        let metric = tags
            .remove("metric")
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ImportError::diagnostics(payload_start, "missing 'metric' tag"))?;
        let unit = tags
            .remove("unit")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| Sample::DEFAULT_UNIT.to_owned());

        Ok(Sample {
            node: self.node.clone(),
            timestamp,
            metric,
            unit,
            tags,
            value,
        })
    }
}

/// `key=value,key=value` 목록을 파싱합니다. 각 항목은 첫 번째 `=`에서 나눕니다.
fn parse_tags(raw: &str, base_offset: usize) -> Result<BTreeMap<String, String>, ImportError> {
    let mut tags = BTreeMap::new();
    let mut offset = base_offset;
    for part in raw.split(',') {
        if !part.is_empty() {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                ImportError::diagnostics(offset, format!("tag '{part}' has no '='"))
            })?;
            tags.insert(key.trim().to_owned(), value.trim().to_owned());
        }
        offset += part.len() + 1;
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LINE: &str = "10-03-2020 14:20:42 1583850042297 Metric[[thread=hz.foo.thread-1,unit=count,metric=operation.thread.priorityPendingCount]=0]";

    fn parser() -> DiagnosticsParser {
        DiagnosticsParser::new("member1")
    }

    #[test]
    fn node_name_from_standard_file() {
        assert_eq!(
            node_name_from_file("diagnostics-member1-20200310.log").unwrap(),
            "member1"
        );
    }

    #[test]
    fn node_name_replaces_dots() {
        assert_eq!(
            node_name_from_file("diagnostics-10.0.0.1-1583850000.log").unwrap(),
            "10_0_0_1"
        );
    }

    #[test]
    fn node_name_rejects_foreign_files() {
        assert!(node_name_from_file("member1-20200310.log").is_err());
        assert!(node_name_from_file("diagnostics-member1.log").is_err());
        assert!(node_name_from_file("diagnostics--1.log").is_err());
    }

    #[test]
    fn diagnostics_file_detection() {
        assert!(is_diagnostics_file("diagnostics-member1-1.log"));
        assert!(!is_diagnostics_file("diagnostics-member1-1.log.gz"));
        assert!(!is_diagnostics_file("dstat-member1.csv"));
    }

    #[test]
    fn metric_line_detection() {
        assert!(is_metric_line(SAMPLE_LINE));
        assert!(!is_metric_line(
            "10-03-2020 14:20:42 1583850042297 SystemProperties[java.version=1.8]"
        ));
    }

    #[test]
    fn parse_reference_line() {
        let sample = parser().parse_line(SAMPLE_LINE).unwrap();
        assert_eq!(sample.node, "member1");
        assert_eq!(sample.timestamp.to_string(), "2020-03-10T14:20:42Z");
        assert_eq!(sample.metric, "operation.thread.priorityPendingCount");
        assert_eq!(sample.unit, "count");
        assert_eq!(sample.value, 0.0);
        assert_eq!(sample.tags.len(), 1);
        assert_eq!(sample.tags["thread"], "hz.foo.thread-1");
    }

    #[test]
    fn parse_without_unit_defaults_to_count() {
        let line = "10-03-2020 14:20:42 1583850042297 Metric[[metric=runtime.usedMemory]=1048576]";
        let sample = parser().parse_line(line).unwrap();
        assert_eq!(sample.unit, "count");
        assert_eq!(sample.value, 1_048_576.0);
        assert!(sample.tags.is_empty());
    }

    #[test]
    fn parse_without_inner_bracket() {
        let line = "10-03-2020 14:20:42 1 Metric[unit=ms,metric=gc.minorTime]=12.5]";
        let sample = parser().parse_line(line).unwrap();
        assert_eq!(sample.metric, "gc.minorTime");
        assert_eq!(sample.unit, "ms");
        assert_eq!(sample.value, 12.5);
    }

    #[test]
    fn parse_splits_tag_on_first_equals() {
        let line =
            "10-03-2020 14:20:42 1 Metric[[name=a=b,metric=map.putCount]=3]";
        let sample = parser().parse_line(line).unwrap();
        assert_eq!(sample.tags["name"], "a=b");
    }

    #[test]
    fn parse_negative_and_fractional_values() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=os.load]=-0.25]";
        let sample = parser().parse_line(line).unwrap();
        assert_eq!(sample.value, -0.25);
    }

    #[test]
    fn parse_rejects_missing_metric_tag() {
        let line = "10-03-2020 14:20:42 1 Metric[[unit=count,thread=t1]=4]";
        let err = parser().parse_line(line).unwrap_err();
        assert!(err.to_string().contains("metric"));
    }

    #[test]
    fn parse_rejects_missing_delimiter() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y,unit=count 4]";
        assert!(parser().parse_line(line).is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_value() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y]=abc]";
        let err = parser().parse_line(line).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn parse_rejects_non_finite_value() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y]=NaN]";
        assert!(parser().parse_line(line).is_err());
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y]=inf]";
        assert!(parser().parse_line(line).is_err());
    }

    #[test]
    fn parse_rejects_tag_without_equals() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y,orphan]=1]";
        let err = parser().parse_line(line).unwrap_err();
        assert!(err.to_string().contains("orphan"));
    }

    #[test]
    fn parse_rejects_unterminated_value() {
        let line = "10-03-2020 14:20:42 1 Metric[[metric=x.y]=1";
        assert!(parser().parse_line(line).is_err());
    }

    #[test]
    fn parse_rejects_bad_timestamp() {
        let line = "2020-03-10T14:20:42Z 1 Metric[[metric=x.y]=1]";
        assert!(parser().parse_line(line).is_err());
    }

    #[test]
    fn parse_rejects_short_line() {
        assert!(parser().parse_line(" Metric[").is_err());
        assert!(parser().parse_line("").is_err());
    }

    #[test]
    fn for_file_uses_file_node() {
        let parser = DiagnosticsParser::for_file("diagnostics-hz.member-2.log").unwrap();
        assert_eq!(parser.node(), "hz_member");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_text_does_not_panic(line in "\\PC{0,200}") {
                let _ = parser().parse_line(&line);
            }

            #[test]
            fn parse_arbitrary_payload_does_not_panic(payload in "\\PC{0,120}") {
                let line = format!("10-03-2020 14:20:42 1 Metric[{payload}");
                let _ = parser().parse_line(&line);
            }

            #[test]
            fn parse_preserves_integer_values(value in -1_000_000i64..1_000_000) {
                let line = format!("10-03-2020 14:20:42 1 Metric[[metric=m.x]={value}]");
                let sample = parser().parse_line(&line).unwrap();
                prop_assert_eq!(sample.value, value as f64);
            }

            #[test]
            fn parse_keeps_timestamp_second(hour in 0u32..24, minute in 0u32..60, second in 0u32..60) {
                let line = format!(
                    "10-03-2020 {hour:02}:{minute:02}:{second:02} 1 Metric[[metric=m.x]=1]"
                );
                let sample = parser().parse_line(&line).unwrap();
                prop_assert_eq!(
                    sample.timestamp.to_string(),
                    format!("2020-03-10T{hour:02}:{minute:02}:{second:02}Z")
                );
            }
        }
    }
}
