//! 쓰기 버퍼 -- 출력 레코드 배치 적재
//!
//! [`WriteBuffer`]는 싱크로 보낼 출력 레코드를 배치 크기만큼 모읍니다.
//! 버퍼는 [`RecordEmitter`](crate::emitter::RecordEmitter)가 단독으로 소유하며,
//! 전송이 성공한 뒤에만 비웁니다.
//!
//! ```text
//! push ─▶ [r1 r2 ... rN] ─(가득 참)─▶ records() 전송 ─┬─ 성공 ─▶ mark_flushed()
//!                                                     └─ 실패 ─▶ 유지, 다음 push에서 재전송
//! ```

use diagflux_core::types::OutputRecord;

/// 배치 크기 상한이 있는 출력 레코드 버퍼
pub struct WriteBuffer {
    /// 적재된 레코드 (순서 유지)
    records: Vec<OutputRecord>,
    /// 배치 크기
    batch_size: usize,
}

impl WriteBuffer {
    /// 새 쓰기 버퍼를 생성합니다. `batch_size`가 0이면 1로 취급합니다.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            records: Vec::with_capacity(batch_size.min(10_000)),
            batch_size,
        }
    }

    /// 레코드를 추가합니다. 배치 크기에 도달하면 `true`를 반환합니다.
    pub fn push(&mut self, record: OutputRecord) -> bool {
        self.records.push(record);
        self.is_full()
    }

    /// 전송할 레코드
    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    /// 전송 성공 후 버퍼를 비웁니다.
    pub fn mark_flushed(&mut self) {
        self.records.clear();
    }

    /// 배치 크기에 도달했는지 확인합니다.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.batch_size
    }

    /// 현재 적재된 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
