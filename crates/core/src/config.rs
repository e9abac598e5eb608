//! 설정 관리 -- diagflux.toml 파싱 및 런타임 설정
//!
//! [`DiagfluxConfig`]는 임포터와 싱크의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DIAGFLUX_IMPORT_BATCH_SIZE=500` 형식)
//! 3. 설정 파일 (`diagflux.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), diagflux_core::error::DiagfluxError> {
//! use diagflux_core::config::DiagfluxConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DiagfluxConfig::load("diagflux.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DiagfluxConfig::parse("[import]\nbatch_size = 500")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DiagfluxError};

/// 배치 크기 상한
pub const MAX_BATCH_SIZE: usize = 100_000;

/// 지원하는 싱크 종류
pub const SINK_KINDS: [&str; 3] = ["influx", "graphite", "stdout"];

/// diagflux 통합 설정
///
/// `diagflux.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagfluxConfig {
    /// 일반 설정
    pub general: GeneralConfig,
    /// 임포트 설정
    pub import: ImportConfig,
    /// 싱크 설정
    pub sink: SinkConfig,
    /// 파생 메트릭 규칙 (생략 시 기본 규칙)
    pub derive: Vec<DeriveRuleConfig>,
}

impl Default for DiagfluxConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            import: ImportConfig::default(),
            sink: SinkConfig::default(),
            derive: DeriveRuleConfig::defaults(),
        }
    }
}

impl DiagfluxConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DiagfluxError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DiagfluxError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DiagfluxError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DiagfluxError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DiagfluxError> {
        toml::from_str(toml_str).map_err(|e| {
            DiagfluxError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DIAGFLUX_{SECTION}_{FIELD}`
    /// 예: `DIAGFLUX_SINK_INFLUX_URL=http://tsdb:8086`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DIAGFLUX_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DIAGFLUX_GENERAL_LOG_FORMAT");

        // Import
        override_string(&mut self.import.root_dir, "DIAGFLUX_IMPORT_ROOT_DIR");
        override_bool(&mut self.import.recursive, "DIAGFLUX_IMPORT_RECURSIVE");
        override_bool(&mut self.import.force, "DIAGFLUX_IMPORT_FORCE");
        override_usize(&mut self.import.batch_size, "DIAGFLUX_IMPORT_BATCH_SIZE");
        override_string(&mut self.import.import_id, "DIAGFLUX_IMPORT_IMPORT_ID");
        override_bool(&mut self.import.normalize, "DIAGFLUX_IMPORT_NORMALIZE");
        override_bool(
            &mut self.import.include_resource_logs,
            "DIAGFLUX_IMPORT_INCLUDE_RESOURCE_LOGS",
        );
        override_string(&mut self.import.benchmark, "DIAGFLUX_IMPORT_BENCHMARK");
        override_csv(
            &mut self.import.passthrough_tags,
            "DIAGFLUX_IMPORT_PASSTHROUGH_TAGS",
        );

        // Sink
        override_string(&mut self.sink.kind, "DIAGFLUX_SINK_KIND");
        override_string(&mut self.sink.influx.url, "DIAGFLUX_SINK_INFLUX_URL");
        override_string(
            &mut self.sink.influx.database,
            "DIAGFLUX_SINK_INFLUX_DATABASE",
        );
        override_u64(
            &mut self.sink.influx.timeout_secs,
            "DIAGFLUX_SINK_INFLUX_TIMEOUT_SECS",
        );
        override_string(
            &mut self.sink.influx.username,
            "DIAGFLUX_SINK_INFLUX_USERNAME",
        );
        override_string(
            &mut self.sink.influx.password,
            "DIAGFLUX_SINK_INFLUX_PASSWORD",
        );
        override_string(
            &mut self.sink.graphite.address,
            "DIAGFLUX_SINK_GRAPHITE_ADDRESS",
        );
        override_string(&mut self.sink.graphite.prefix, "DIAGFLUX_SINK_GRAPHITE_PREFIX");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DiagfluxError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // batch_size 검증
        if self.import.batch_size == 0 || self.import.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "import.batch_size",
                format!("must be between 1 and {MAX_BATCH_SIZE}"),
            ));
        }

        if self.import.root_dir.is_empty() {
            return Err(invalid("import.root_dir", "must not be empty".to_owned()));
        }

        if self
            .import
            .passthrough_tags
            .iter()
            .any(|t| t.is_empty() || RESERVED_TAGS.contains(&t.as_str()))
        {
            return Err(invalid(
                "import.passthrough_tags",
                format!(
                    "tags must be non-empty and not one of: {}",
                    RESERVED_TAGS.join(", ")
                ),
            ));
        }

        // sink 검증
        if !SINK_KINDS.contains(&self.sink.kind.as_str()) {
            return Err(invalid(
                "sink.kind",
                format!("must be one of: {}", SINK_KINDS.join(", ")),
            ));
        }

        match self.sink.kind.as_str() {
            "influx" => {
                let url = &self.sink.influx.url;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid(
                        "sink.influx.url",
                        "must start with http:// or https://".to_owned(),
                    ));
                }
                if self.sink.influx.database.is_empty() {
                    return Err(invalid(
                        "sink.influx.database",
                        "must not be empty".to_owned(),
                    ));
                }
                if self.sink.influx.timeout_secs == 0 {
                    return Err(invalid(
                        "sink.influx.timeout_secs",
                        "must be greater than 0".to_owned(),
                    ));
                }
            }
            "graphite" => {
                if self.sink.graphite.address.is_empty() {
                    return Err(invalid(
                        "sink.graphite.address",
                        "must not be empty".to_owned(),
                    ));
                }
            }
            _ => {}
        }

        // 파생 규칙 검증
        for (idx, rule) in self.derive.iter().enumerate() {
            if rule.numerator.is_empty() || rule.denominator.is_empty() || rule.output.is_empty()
            {
                return Err(invalid(
                    &format!("derive[{idx}]"),
                    "numerator, denominator and output must not be empty".to_owned(),
                ));
            }
            if rule.numerator == rule.denominator {
                return Err(invalid(
                    &format!("derive[{idx}]"),
                    "numerator and denominator must differ".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

/// 출력 레코드에 항상 붙는 태그. 원본 태그로 덮어쓸 수 없습니다.
pub const RESERVED_TAGS: [&str; 3] = ["benchmark", "node", "import_id"];

fn invalid(field: &str, reason: String) -> DiagfluxError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 임포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 스캔을 시작할 디렉토리
    pub root_dir: String,
    /// 하위 디렉토리 재귀 여부
    pub recursive: bool,
    /// 완료 마커가 있는 디렉토리도 다시 임포트할지 여부
    pub force: bool,
    /// 싱크 한 번에 보낼 레코드 수
    pub batch_size: usize,
    /// 임포트 식별 태그 (비어 있으면 실행 시점의 나노초)
    pub import_id: String,
    /// 타임스탬프 정규화 여부 (2020-01-01 12:MM:SS)
    pub normalize: bool,
    /// 리소스 CSV 로그도 임포트할지 여부
    pub include_resource_logs: bool,
    /// 벤치마크 라벨 (비어 있으면 디렉토리 구조에서 추론)
    pub benchmark: String,
    /// 출력 레코드에 그대로 전달할 원본 태그
    pub passthrough_tags: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            root_dir: ".".to_owned(),
            recursive: false,
            force: false,
            batch_size: 1000,
            import_id: String::new(),
            normalize: false,
            include_resource_logs: false,
            benchmark: String::new(),
            passthrough_tags: vec!["thread".to_owned()],
        }
    }
}

/// 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// 싱크 종류 (influx, graphite, stdout)
    pub kind: String,
    /// InfluxDB 설정
    pub influx: InfluxConfig,
    /// Graphite 설정
    pub graphite: GraphiteConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: "influx".to_owned(),
            influx: InfluxConfig::default(),
            graphite: GraphiteConfig::default(),
        }
    }
}

/// InfluxDB 1.x HTTP 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// 서버 URL
    pub url: String,
    /// 데이터베이스 이름 (없으면 생성)
    pub database: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 사용자 이름 (비어 있으면 인증 없음)
    pub username: String,
    /// 비밀번호
    pub password: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8086".to_owned(),
            database: "diagnostics".to_owned(),
            timeout_secs: 30,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Graphite plaintext 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphiteConfig {
    /// carbon 수신 주소
    pub address: String,
    /// 메트릭 경로 접두어
    pub prefix: String,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:2003".to_owned(),
            prefix: "diagnostics".to_owned(),
        }
    }
}

/// 파생 메트릭 규칙: `output = numerator / denominator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveRuleConfig {
    /// 분자 메트릭 이름
    pub numerator: String,
    /// 분모 메트릭 이름
    pub denominator: String,
    /// 생성할 메트릭 이름
    pub output: String,
    /// 원본 샘플에서 복사할 태그
    #[serde(default)]
    pub carry_tags: Vec<String>,
}

impl DeriveRuleConfig {
    /// 기본 파생 규칙 (WAN 발행 지연 평균, map put 지연 평균)
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                numerator: "wan.totalPublishLatency".to_owned(),
                denominator: "wan.totalPublishedEventCount".to_owned(),
                output: "wan.publishLatencyAvg".to_owned(),
                carry_tags: vec!["replication".to_owned(), "publisherId".to_owned()],
            },
            Self {
                numerator: "map.totalPutLatency".to_owned(),
                denominator: "map.putCount".to_owned(),
                output: "map.putLatencyAvg".to_owned(),
                carry_tags: vec!["name".to_owned()],
            },
        ]
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
