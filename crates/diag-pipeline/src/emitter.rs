//! 레코드 방출기 -- 샘플을 출력 레코드로 바꿔 배치 전송
//!
//! [`RecordEmitter`]는 [`WriteBuffer`]와 싱크를 소유합니다.
//! 샘플마다 [`OutputRecord`]를 만들어 버퍼에 넣고, 버퍼가 배치 크기에 도달하면
//! 즉시 싱크로 플러시합니다. 실행 끝의 [`flush`](RecordEmitter::flush)가 남은 레코드를 보냅니다.
//!
//! # 레코드 구조
//! ```text
//! measurement = metric 이름
//! fields      = { unit: value }
//! tags        = { benchmark, node, import_id } + 전달 태그(thread 등)
//! time        = 샘플 시각 (정규화 옵션 적용)
//! ```
//!
//! # 플러시 실패
//! 어떤 실패든 버퍼를 그대로 두고 에러를 반환합니다. 남은 레코드는 다음 플러시에서
//! 다시 전송됩니다.
//! - 연결 실패: 치명적 에러 (실행 중단)
//! - 서버 거부: 치명적이지 않은 에러 (호출자가 로그를 남기고 계속 진행)

use std::collections::BTreeSet;

use diagflux_core::metrics as m;
use diagflux_core::pipeline::PointSink;
use diagflux_core::types::{OutputRecord, Sample};
use tracing::debug;

use crate::buffer::WriteBuffer;
use crate::error::ImportError;

/// 파일마다 외부에서 주어지는 식별 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    /// 벤치마크(실행) 라벨
    pub benchmark: String,
    /// 노드 이름
    pub node: String,
    /// 임포트 ID
    pub import_id: String,
}

/// 출력 레코드 생성 규칙
#[derive(Debug, Clone, Default)]
pub struct RecordShape {
    /// 원본 샘플에서 그대로 전달할 태그
    pub passthrough_tags: Vec<String>,
    /// 모든 태그를 전달할 메트릭 (파생 메트릭)
    pub derived_metrics: BTreeSet<String>,
    /// 타임스탬프 정규화 여부
    pub normalize: bool,
}

impl RecordShape {
    /// 샘플 하나를 출력 레코드로 변환합니다.
    ///
    /// 식별 태그는 원본 태그보다 우선합니다.
    pub fn to_record(&self, sample: &Sample, identity: &RunIdentity) -> OutputRecord {
        let time = if self.normalize {
            sample.timestamp.normalized()
        } else {
            sample.timestamp
        };
        let mut record = OutputRecord::new(&sample.metric, time, &sample.unit, sample.value);

        if self.derived_metrics.contains(&sample.metric) {
            for (key, value) in &sample.tags {
                record.tags.insert(key.clone(), value.clone());
            }
        } else {
            for key in &self.passthrough_tags {
                if let Some(value) = sample.tags.get(key).filter(|v| !v.is_empty()) {
                    record.tags.insert(key.clone(), value.clone());
                }
            }
        }

        record
            .with_tag("benchmark", &identity.benchmark)
            .with_tag("node", &identity.node)
            .with_tag("import_id", &identity.import_id)
    }
}

/// 출력 레코드 방출기
pub struct RecordEmitter<S> {
    sink: S,
    buffer: WriteBuffer,
    shape: RecordShape,
    flushes: u64,
    failed_flushes: u64,
}

impl<S: PointSink> RecordEmitter<S> {
    /// 새 방출기를 생성합니다.
    pub fn new(sink: S, batch_size: usize, shape: RecordShape) -> Self {
        Self {
            sink,
            buffer: WriteBuffer::new(batch_size),
            shape,
            flushes: 0,
            failed_flushes: 0,
        }
    }

    /// 샘플 하나를 방출합니다. 버퍼가 가득 차면 플러시합니다.
    pub async fn emit_sample(
        &mut self,
        sample: &Sample,
        identity: &RunIdentity,
    ) -> Result<(), ImportError> {
        let record = self.shape.to_record(sample, identity);
        self.emit_record(record).await
    }

    /// 이미 만들어진 레코드를 버퍼에 넣습니다.
    ///
    /// 플러시가 실패해도 레코드는 버퍼에 남아 있습니다.
    pub async fn emit_record(&mut self, record: OutputRecord) -> Result<(), ImportError> {
        metrics::counter!(m::SINK_RECORDS_EMITTED_TOTAL).increment(1);
        if self.buffer.push(record) {
            self.flush().await?;
        }
        Ok(())
    }

    /// 버퍼를 싱크로 전송합니다. 버퍼가 비어 있으면 아무것도 하지 않습니다.
    ///
    /// 버퍼는 전송이 성공한 뒤에만 비워집니다.
    pub async fn flush(&mut self) -> Result<(), ImportError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch_len = self.buffer.len();
        let result = self.sink.write_points(self.buffer.records()).await;
        let sink_name = self.sink.name().to_owned();

        match result {
            Ok(()) => {
                self.flushes += 1;
                self.buffer.mark_flushed();
                metrics::counter!(m::SINK_FLUSHES_TOTAL, m::LABEL_SINK => sink_name.clone())
                    .increment(1);
                debug!(sink = %sink_name, records = batch_len, "batch flushed");
                Ok(())
            }
            Err(source) => {
                self.failed_flushes += 1;
                metrics::counter!(m::SINK_FLUSH_FAILURES_TOTAL, m::LABEL_SINK => sink_name.clone())
                    .increment(1);
                Err(ImportError::Sink {
                    sink: sink_name,
                    source,
                })
            }
        }
    }

    /// 성공한 플러시 횟수
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// 실패한 플러시 횟수
    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes
    }

    /// 쓰기 버퍼
    pub fn buffer(&self) -> &WriteBuffer {
        &self.buffer
    }

    /// 싱크 참조
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// 싱크 가변 참조
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// 방출기를 해체하고 싱크를 돌려받습니다.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use diagflux_core::types::Timestamp;

    use super::*;
    use crate::sink::MemorySink;

    fn identity() -> RunIdentity {
        RunIdentity {
            benchmark: "wan-bench".to_owned(),
            node: "member1".to_owned(),
            import_id: "1583850042000000000".to_owned(),
        }
    }

    fn shape() -> RecordShape {
        RecordShape {
            passthrough_tags: vec!["thread".to_owned()],
            derived_metrics: BTreeSet::from(["wan.publishLatencyAvg".to_owned()]),
            normalize: false,
        }
    }

    fn sample(metric: &str, tags: &[(&str, &str)]) -> Sample {
        Sample {
            node: "member1".to_owned(),
            timestamp: Timestamp::parse_log("10-03-2020 14:20:42").unwrap(),
            metric: metric.to_owned(),
            unit: "count".to_owned(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<BTreeMap<_, _>>(),
            value: 7.0,
        }
    }

    #[test]
    fn record_has_identity_and_thread_tags() {
        let record = shape().to_record(
            &sample("operation.thread.priorityPendingCount", &[("thread", "hz.t-1"), ("name", "x")]),
            &identity(),
        );
        assert_eq!(record.measurement, "operation.thread.priorityPendingCount");
        assert_eq!(record.fields.get("count"), Some(&7.0));
        assert_eq!(record.tags.len(), 4);
        assert_eq!(record.tags["thread"], "hz.t-1");
        assert_eq!(record.tags["benchmark"], "wan-bench");
        assert_eq!(record.tags["node"], "member1");
        assert_eq!(record.tags["import_id"], "1583850042000000000");
        assert_eq!(record.time.to_string(), "2020-03-10T14:20:42Z");
    }

    #[test]
    fn record_without_thread_has_only_identity_tags() {
        let record = shape().to_record(&sample("runtime.usedMemory", &[]), &identity());
        assert_eq!(record.tags.len(), 3);
        assert!(!record.tags.contains_key("thread"));
    }

    #[test]
    fn derived_record_keeps_carried_tags() {
        let record = shape().to_record(
            &sample("wan.publishLatencyAvg", &[("replication", "dc2"), ("publisherId", "p")]),
            &identity(),
        );
        assert_eq!(record.tags["replication"], "dc2");
        assert_eq!(record.tags["publisherId"], "p");
    }

    #[test]
    fn identity_tags_win_over_source_tags() {
        let shape = RecordShape {
            derived_metrics: BTreeSet::from(["x".to_owned()]),
            ..shape()
        };
        let record = shape.to_record(&sample("x", &[("node", "spoofed")]), &identity());
        assert_eq!(record.tags["node"], "member1");
    }

    #[test]
    fn normalized_record_time() {
        let shape = RecordShape {
            normalize: true,
            ..shape()
        };
        let record = shape.to_record(&sample("a", &[]), &identity());
        assert_eq!(record.time.to_string(), "2020-01-01T12:20:42Z");
    }

    #[tokio::test]
    async fn flushes_ceil_of_records_over_batch() {
        let mut emitter = RecordEmitter::new(MemorySink::new(), 4, shape());
        for _ in 0..10 {
            emitter.emit_sample(&sample("a", &[]), &identity()).await.unwrap();
        }
        emitter.flush().await.unwrap();

        let sink = emitter.into_sink();
        let sizes: Vec<_> = sink.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn exact_multiple_of_batch_has_no_empty_flush() {
        let mut emitter = RecordEmitter::new(MemorySink::new(), 5, shape());
        for _ in 0..10 {
            emitter.emit_sample(&sample("a", &[]), &identity()).await.unwrap();
        }
        emitter.flush().await.unwrap();
        assert_eq!(emitter.flushes(), 2);
        assert_eq!(emitter.sink().batches().len(), 2);
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_is_noop() {
        let mut emitter = RecordEmitter::new(MemorySink::new(), 5, shape());
        emitter.flush().await.unwrap();
        assert_eq!(emitter.flushes(), 0);
        assert!(emitter.sink().batches().is_empty());
    }

    #[tokio::test]
    async fn connection_failure_keeps_buffer_and_propagates() {
        let sink = MemorySink::new().fail_with_connection_error();
        let mut emitter = RecordEmitter::new(sink, 2, shape());
        emitter.emit_sample(&sample("a", &[]), &identity()).await.unwrap();
        let err = emitter
            .emit_sample(&sample("b", &[]), &identity())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(emitter.buffer().len(), 2);
        assert_eq!(emitter.failed_flushes(), 1);
    }

    #[tokio::test]
    async fn rejected_batch_is_kept_and_resent_on_next_flush() {
        let sink = MemorySink::new().reject_batches(1);
        let mut emitter = RecordEmitter::new(sink, 2, shape());

        emitter.emit_sample(&sample("a", &[]), &identity()).await.unwrap();
        let err = emitter
            .emit_sample(&sample("b", &[]), &identity())
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(emitter.buffer().len(), 2);
        assert!(emitter.sink().batches().is_empty());

        emitter.emit_sample(&sample("c", &[]), &identity()).await.unwrap();
        emitter.flush().await.unwrap();

        assert_eq!(emitter.failed_flushes(), 1);
        assert_eq!(emitter.flushes(), 1);
        assert!(emitter.buffer().is_empty());
        let delivered: Vec<_> = emitter
            .sink()
            .records()
            .map(|r| r.measurement.as_str())
            .collect();
        assert_eq!(delivered, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn rejected_final_flush_propagates_and_keeps_records() {
        let sink = MemorySink::new().reject_batches(1);
        let mut emitter = RecordEmitter::new(sink, 10, shape());
        emitter.emit_sample(&sample("a", &[]), &identity()).await.unwrap();

        let err = emitter.flush().await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(emitter.buffer().len(), 1);

        emitter.flush().await.unwrap();
        assert_eq!(emitter.sink().records().count(), 1);
    }
}
