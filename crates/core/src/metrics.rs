//! 메트릭 상수 및 설명 등록
//!
//! 모든 카운터의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더(exporter)는 설치하지 않으므로 레코더가 없을 때는 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `diagflux_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(diagflux_core::metrics::IMPORT_LINES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 싱크 레이블 키 (influx, graphite, stdout)
pub const LABEL_SINK: &str = "sink";

/// 로그 종류 레이블 키 (diagnostics, resource)
pub const LABEL_LOG_KIND: &str = "kind";

// ─── Import 메트릭 ─────────────────────────────────────────────────

/// Import: 처리된 파일 수 (counter, label: kind)
pub const IMPORT_FILES_TOTAL: &str = "diagflux_import_files_total";

/// Import: 처리된 전체 라인 수 (counter)
pub const IMPORT_LINES_PROCESSED_TOTAL: &str = "diagflux_import_lines_processed_total";

/// Import: 메트릭 라인 파싱 에러 수 (counter)
pub const IMPORT_PARSE_ERRORS_TOTAL: &str = "diagflux_import_parse_errors_total";

/// Import: 완료된 사이클 수 (counter)
pub const IMPORT_CYCLES_TOTAL: &str = "diagflux_import_cycles_total";

/// Import: 생성된 파생 샘플 수 (counter)
pub const IMPORT_DERIVED_SAMPLES_TOTAL: &str = "diagflux_import_derived_samples_total";

// ─── Sink 메트릭 ───────────────────────────────────────────────────

/// Sink: 방출된 출력 레코드 수 (counter)
pub const SINK_RECORDS_EMITTED_TOTAL: &str = "diagflux_sink_records_emitted_total";

/// Sink: 플러시 호출 수 (counter, label: sink)
pub const SINK_FLUSHES_TOTAL: &str = "diagflux_sink_flushes_total";

/// Sink: 실패한 플러시 수 (counter, label: sink)
pub const SINK_FLUSH_FAILURES_TOTAL: &str = "diagflux_sink_flush_failures_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더가 없으면 아무 효과가 없습니다. 레코더를 설치한 뒤 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    // Import
    describe_counter!(IMPORT_FILES_TOTAL, "Total number of log files imported");
    describe_counter!(
        IMPORT_LINES_PROCESSED_TOTAL,
        "Total number of log lines read"
    );
    describe_counter!(
        IMPORT_PARSE_ERRORS_TOTAL,
        "Total number of metric lines that failed to parse"
    );
    describe_counter!(
        IMPORT_CYCLES_TOTAL,
        "Total number of completed metric cycles"
    );
    describe_counter!(
        IMPORT_DERIVED_SAMPLES_TOTAL,
        "Total number of derived samples inserted into cycles"
    );

    // Sink
    describe_counter!(
        SINK_RECORDS_EMITTED_TOTAL,
        "Total number of output records buffered for the sink"
    );
    describe_counter!(SINK_FLUSHES_TOTAL, "Total number of batch flushes");
    describe_counter!(
        SINK_FLUSH_FAILURES_TOTAL,
        "Total number of failed batch flushes"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metric_names_have_prefix() {
        let names = [
            IMPORT_FILES_TOTAL,
            IMPORT_LINES_PROCESSED_TOTAL,
            IMPORT_PARSE_ERRORS_TOTAL,
            IMPORT_CYCLES_TOTAL,
            IMPORT_DERIVED_SAMPLES_TOTAL,
            SINK_RECORDS_EMITTED_TOTAL,
            SINK_FLUSHES_TOTAL,
            SINK_FLUSH_FAILURES_TOTAL,
        ];
        for name in &names {
            assert!(
                name.starts_with("diagflux_"),
                "Metric '{}' should start with 'diagflux_'",
                name
            );
            assert!(
                name.ends_with("_total"),
                "Counter '{}' should end with '_total'",
                name
            );
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
