//! 출력 싱크 구현
//!
//! 모든 싱크는 [`PointSink`](diagflux_core::pipeline::PointSink)를 구현합니다.
//! 설정의 `[sink] kind`로 실행 시점에 고르려면 [`build_sink`]를 사용합니다.
//!
//! | kind       | 타입             | 전송                               |
//! |------------|------------------|------------------------------------|
//! | `influx`   | [`InfluxSink`]   | InfluxDB 1.x HTTP line protocol    |
//! | `graphite` | [`GraphiteSink`] | carbon plaintext TCP               |
//! | `stdout`   | [`StdoutSink`]   | JSON Lines                         |
//! | (테스트)   | [`MemorySink`]   | 메모리 보관                        |

pub mod graphite;
pub mod influx;
pub mod memory;
pub mod stdout;

pub use graphite::{GraphiteSink, KeySanitizer};
pub use influx::InfluxSink;
pub use memory::MemorySink;
pub use stdout::StdoutSink;

use diagflux_core::config::{SINK_KINDS, SinkConfig};
use diagflux_core::pipeline::DynPointSink;

use crate::error::ImportError;

/// 설정에 맞는 싱크를 생성합니다.
pub fn build_sink(config: &SinkConfig) -> Result<Box<dyn DynPointSink>, ImportError> {
    match config.kind.as_str() {
        "influx" => Ok(Box::new(InfluxSink::new(&config.influx)?)),
        "graphite" => Ok(Box::new(GraphiteSink::new(&config.graphite)?)),
        "stdout" => Ok(Box::new(StdoutSink::new())),
        other => Err(ImportError::Config {
            field: "sink.kind".to_owned(),
            reason: format!("unknown sink '{}', expected one of {:?}", other, SINK_KINDS),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_known_sink() {
        for kind in SINK_KINDS {
            let config = SinkConfig {
                kind: kind.to_owned(),
                ..Default::default()
            };
            let sink = build_sink(&config).unwrap();
            assert_eq!(sink.name(), kind);
        }
    }

    #[test]
    fn unknown_sink_is_config_error() {
        let config = SinkConfig {
            kind: "kafka".to_owned(),
            ..Default::default()
        };
        let err = build_sink(&config).err().unwrap();
        assert!(matches!(err, ImportError::Config { .. }));
    }
}
