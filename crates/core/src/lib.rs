//! diagflux 공통 타입, trait, 에러, 설정
//!
//! 파이프라인 크레이트와 CLI가 공유하는 기반 계층입니다.
//!
//! - [`config`] -- `diagflux.toml` 파싱, 환경변수 오버라이드, 검증
//! - [`error`] -- 도메인별 에러 타입
//! - [`metrics`] -- 카운터 이름 상수
//! - [`pipeline`] -- 출력 싱크 trait
//! - [`types`] -- 타임스탬프, 샘플, 출력 레코드

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DiagfluxError, ParseError, StorageError};

// 설정
pub use config::DiagfluxConfig;

// 싱크 trait
pub use pipeline::{BoxFuture, DynPointSink, PointSink};

// 도메인 타입
pub use types::{OutputRecord, Sample, Timestamp};
