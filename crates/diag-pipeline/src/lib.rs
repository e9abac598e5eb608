//! diagflux 임포트 파이프라인
//!
//! Hazelcast 진단 로그(`diagnostics-*.log`)와 dstat 리소스 로그(`*.csv`)를 읽어
//! 시계열 저장소로 배치 전송합니다.
//!
//! # 모듈 구성
//!
//! - [`parser`]: 진단 로그 메트릭 라인, 리소스 CSV 행 파서
//! - [`cycle`]: 같은 타임스탬프의 샘플을 사이클로 묶는 집계기
//! - [`derive`]: 사이클 안의 카운터 쌍으로 평균값 등을 계산하는 파생 메트릭 엔진
//! - [`emitter`]: 샘플을 출력 레코드로 바꿔 배치 전송
//! - [`buffer`]: 배치 크기 상한이 있는 쓰기 버퍼
//! - [`scanner`]: 디렉토리 탐색과 완료 마커 관리
//! - [`importer`]: 전체 실행 오케스트레이션
//! - [`sink`]: InfluxDB, Graphite, JSON Lines, 메모리 싱크
//! - [`config`]: 임포터 설정 (core 설정에서 생성)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Scanner -> Parser -> CycleAggregator -> DerivedMetricEngine -> RecordEmitter -> PointSink
//!    |          |              |                    |                   |
//!  marker   line/row      tick grouping        avg metrics        WriteBuffer batches
//! ```

pub mod buffer;
pub mod config;
pub mod cycle;
pub mod derive;
pub mod emitter;
pub mod error;
pub mod importer;
pub mod parser;
pub mod scanner;
pub mod sink;

// --- 주요 타입 re-export ---

// 임포터
pub use importer::{ImportStats, Importer};

// 설정
pub use config::{ImporterConfig, ImporterConfigBuilder};

// 에러
pub use error::ImportError;

// 파서
pub use parser::{DiagnosticsParser, LogKind, ResourceParser, ResourceRow};

// 집계와 파생
pub use cycle::{Cycle, CycleAggregator};
pub use derive::{DerivationRule, DerivedMetricEngine};

// 방출
pub use buffer::WriteBuffer;
pub use emitter::{RecordEmitter, RecordShape, RunIdentity};

// 스캔
pub use scanner::{DirectoryScanner, ScanState};

// 싱크
pub use sink::{GraphiteSink, InfluxSink, KeySanitizer, MemorySink, StdoutSink, build_sink};
