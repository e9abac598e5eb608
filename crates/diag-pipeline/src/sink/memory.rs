//! 인메모리 싱크 -- 전송된 배치를 그대로 보관합니다.
//!
//! 테스트와 드라이런 검증용입니다. 연결 실패나 배치 거부를 흉내 낼 수 있습니다.

use diagflux_core::error::{DiagfluxError, StorageError};
use diagflux_core::pipeline::PointSink;
use diagflux_core::types::OutputRecord;

/// 전송된 배치를 메모리에 쌓는 싱크
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<Vec<OutputRecord>>,
    prepared: bool,
    closed: bool,
    fail_connection: bool,
    reject_remaining: usize,
}

impl MemorySink {
    /// 빈 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 전송을 연결 실패로 처리합니다.
    pub fn fail_with_connection_error(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// 처음 `count`개의 배치를 서버 거부로 처리합니다.
    pub fn reject_batches(mut self, count: usize) -> Self {
        self.reject_remaining = count;
        self
    }

    /// 성공적으로 전송된 배치
    pub fn batches(&self) -> &[Vec<OutputRecord>] {
        &self.batches
    }

    /// 전송된 모든 레코드
    pub fn records(&self) -> impl Iterator<Item = &OutputRecord> {
        self.batches.iter().flatten()
    }

    /// `prepare`가 호출되었는지 여부
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// `close`가 호출되었는지 여부
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl PointSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn prepare(&mut self) -> Result<(), DiagfluxError> {
        if self.fail_connection {
            return Err(StorageError::Connection("memory sink offline".to_owned()).into());
        }
        self.prepared = true;
        Ok(())
    }

    async fn write_points(&mut self, records: &[OutputRecord]) -> Result<(), DiagfluxError> {
        if self.fail_connection {
            return Err(StorageError::Connection("memory sink offline".to_owned()).into());
        }
        if self.reject_remaining > 0 {
            self.reject_remaining -= 1;
            return Err(StorageError::Rejected {
                status: 400,
                reason: "rejected by memory sink".to_owned(),
            }
            .into());
        }
        self.batches.push(records.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DiagfluxError> {
        self.closed = true;
        Ok(())
    }
}
