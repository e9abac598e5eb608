//! JSON Lines 싱크 -- 드라이런용
//!
//! 레코드마다 JSON 객체 한 줄을 출력합니다. 기본 출력 대상은 표준 출력입니다.

use diagflux_core::error::{DiagfluxError, StorageError};
use diagflux_core::pipeline::PointSink;
use diagflux_core::types::OutputRecord;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// 레코드를 JSON Lines로 쓰는 싱크
pub struct StdoutSink<W = tokio::io::Stdout> {
    writer: W,
    written: u64,
}

impl StdoutSink {
    /// 표준 출력에 쓰는 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// 임의의 writer에 쓰는 싱크를 생성합니다.
    pub fn with_writer(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// 지금까지 쓴 레코드 수
    pub fn written(&self) -> u64 {
        self.written
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> PointSink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "stdout"
    }

    async fn prepare(&mut self) -> Result<(), DiagfluxError> {
        Ok(())
    }

    async fn write_points(&mut self, records: &[OutputRecord]) -> Result<(), DiagfluxError> {
        let mut buf = Vec::with_capacity(records.len() * 160);
        for record in records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| DiagfluxError::Import(format!("serializing record: {e}")))?;
            buf.push(b'\n');
        }
        self.writer
            .write_all(&buf)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        self.written += records.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DiagfluxError> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use diagflux_core::types::Timestamp;

    use super::*;

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let mut sink = StdoutSink::with_writer(Vec::new());
        let record = OutputRecord::new(
            "runtime.usedMemory",
            Timestamp::from_epoch_secs(1_583_850_042).unwrap(),
            "count",
            42.0,
        )
        .with_tag("node", "member1");

        sink.write_points(&[record.clone(), record]).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["measurement"], "runtime.usedMemory");
        assert_eq!(value["time"], "2020-03-10T14:20:42Z");
        assert_eq!(value["tags"]["node"], "member1");
        assert_eq!(value["fields"]["count"], 42.0);
    }
}
