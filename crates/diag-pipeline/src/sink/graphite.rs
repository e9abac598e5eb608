//! Graphite plaintext 싱크
//!
//! carbon의 plaintext 프로토콜(`<path> <value> <epoch>\n`)로 TCP 전송합니다.
//! 경로는 `prefix.benchmark.node.measurement`이며 [`KeySanitizer`]를 거칩니다.

use diagflux_core::config::GraphiteConfig;
use diagflux_core::error::{DiagfluxError, StorageError};
use diagflux_core::pipeline::PointSink;
use diagflux_core::types::OutputRecord;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::ImportError;

/// IPv4 주소와 포트 (`10.0.0.1:5701`)
const IPV4_PORT_PATTERN: &str = r"(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3}):(\d{2,5})";

/// 치환 패턴
#[derive(Debug, Clone)]
enum Pattern {
    Literal(&'static str),
    Regex(Regex),
}

/// Graphite 경로 정리 규칙
///
/// 규칙은 등록 순서대로 적용됩니다.
/// 1. `[`, `]` 제거
/// 2. `->`, `/` → `.`
/// 3. `..` → `.`
/// 4. `a.b.c.d:port` → `a_b_c_d_port`
/// 5. 남은 `:` → `_`
#[derive(Debug, Clone)]
pub struct KeySanitizer {
    rules: Vec<(Pattern, &'static str)>,
}

impl KeySanitizer {
    /// 기본 규칙으로 생성합니다.
    pub fn new() -> Result<Self, ImportError> {
        Ok(Self {
            rules: vec![
                (Pattern::Literal("["), ""),
                (Pattern::Literal("]"), ""),
                (Pattern::Literal("->"), "."),
                (Pattern::Literal("/"), "."),
                (Pattern::Literal(".."), "."),
                (Pattern::Regex(Regex::new(IPV4_PORT_PATTERN)?), "${1}_${2}_${3}_${4}_${5}"),
                (Pattern::Literal(":"), "_"),
            ],
        })
    }

    /// 키에 모든 규칙을 적용합니다.
    pub fn sanitize(&self, key: &str) -> String {
        let mut out = key.to_owned();
        for (pattern, replacement) in &self.rules {
            out = match pattern {
                Pattern::Literal(literal) => out.replace(*literal, replacement),
                Pattern::Regex(re) => re.replace_all(&out, *replacement).into_owned(),
            };
        }
        out
    }
}

/// Graphite plaintext TCP 싱크
pub struct GraphiteSink {
    address: String,
    prefix: String,
    sanitizer: KeySanitizer,
    stream: Option<TcpStream>,
}

impl GraphiteSink {
    /// 설정으로 싱크를 생성합니다. 연결은 `prepare`에서 맺습니다.
    pub fn new(config: &GraphiteConfig) -> Result<Self, ImportError> {
        Ok(Self {
            address: config.address.clone(),
            prefix: config.prefix.clone(),
            sanitizer: KeySanitizer::new()?,
            stream: None,
        })
    }

    /// 레코드 하나를 plaintext 라인들로 변환합니다.
    ///
    /// 필드가 여러 개면 필드 이름을 경로 끝에 붙입니다. 유한하지 않은 값은 건너뜁니다.
    pub fn format_record(&self, record: &OutputRecord) -> Vec<String> {
        let mut segments: Vec<&str> = Vec::with_capacity(4);
        for part in [
            Some(self.prefix.as_str()),
            record.tags.get("benchmark").map(String::as_str),
            record.tags.get("node").map(String::as_str),
        ]
        .into_iter()
        .flatten()
        {
            if !part.is_empty() {
                segments.push(part);
            }
        }
        segments.push(&record.measurement);
        let base = self.sanitizer.sanitize(&segments.join("."));

        let epoch = record.time.epoch_secs();
        let multi_field = record.fields.len() > 1;
        record
            .fields
            .iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(field, value)| {
                if multi_field {
                    let path = self.sanitizer.sanitize(&format!("{base}.{field}"));
                    format!("{path} {value} {epoch}\n")
                } else {
                    format!("{base} {value} {epoch}\n")
                }
            })
            .collect()
    }
}

impl PointSink for GraphiteSink {
    fn name(&self) -> &str {
        "graphite"
    }

    async fn prepare(&mut self) -> Result<(), DiagfluxError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| StorageError::Connection(format!("{}: {e}", self.address)))?;
        info!(address = %self.address, "connected to carbon");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write_points(&mut self, records: &[OutputRecord]) -> Result<(), DiagfluxError> {
        let payload: String = records
            .iter()
            .flat_map(|record| self.format_record(record))
            .collect();

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| StorageError::Connection("graphite sink is not connected".to_owned()))?;
        stream
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DiagfluxError> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush().await?;
            stream.shutdown().await?;
            debug!(address = %self.address, "carbon connection closed");
        }
        Ok(())
    }
}
