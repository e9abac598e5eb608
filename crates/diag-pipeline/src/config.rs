//! 임포터 설정
//!
//! [`ImporterConfig`]는 core의 [`DiagfluxConfig`](diagflux_core::config::DiagfluxConfig)에서
//! 임포트에 필요한 값만 모아 실행 시점 값(임포트 ID 등)을 확정한 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use diagflux_core::config::DiagfluxConfig;
//! use diagflux_pipeline::config::ImporterConfig;
//!
//! let core_config = DiagfluxConfig::default();
//! let config = ImporterConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use diagflux_core::config::{DeriveRuleConfig, DiagfluxConfig, MAX_BATCH_SIZE};

use crate::error::ImportError;

/// 진행 상황 로그 간격 (처리 라인 수)
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// 현재 시각의 나노초 값을 임포트 ID로 생성합니다.
pub fn generate_import_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .to_string()
}

/// 임포터 설정
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// 스캔 시작 디렉토리
    pub root_dir: PathBuf,
    /// 하위 디렉토리 재귀 여부
    pub recursive: bool,
    /// 완료 마커 무시 여부
    pub force: bool,
    /// 배치 크기
    pub batch_size: usize,
    /// 임포트 식별 태그 (확정된 값)
    pub import_id: String,
    /// 타임스탬프 정규화 여부
    pub normalize: bool,
    /// 리소스 CSV 임포트 여부
    pub include_resource_logs: bool,
    /// 벤치마크 라벨 지정값 (없으면 디렉토리 구조에서 추론)
    pub benchmark: Option<String>,
    /// 그대로 전달할 원본 태그
    pub passthrough_tags: Vec<String>,
    /// 파생 메트릭 규칙
    pub derive_rules: Vec<DeriveRuleConfig>,
    /// 진행 상황 로그 간격 (라인 수)
    pub progress_interval: u64,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            recursive: false,
            force: false,
            batch_size: 1000,
            import_id: generate_import_id(),
            normalize: false,
            include_resource_logs: false,
            benchmark: None,
            passthrough_tags: vec!["thread".to_owned()],
            derive_rules: DeriveRuleConfig::defaults(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ImporterConfig {
    /// core 설정에서 임포터 설정을 생성합니다.
    ///
    /// `import_id`가 비어 있으면 지금 시각으로 생성합니다.
    pub fn from_core(core: &DiagfluxConfig) -> Self {
        let import = &core.import;
        Self {
            root_dir: PathBuf::from(&import.root_dir),
            recursive: import.recursive,
            force: import.force,
            batch_size: import.batch_size,
            import_id: if import.import_id.is_empty() {
                generate_import_id()
            } else {
                import.import_id.clone()
            },
            normalize: import.normalize,
            include_resource_logs: import.include_resource_logs,
            benchmark: Some(import.benchmark.clone()).filter(|b| !b.is_empty()),
            passthrough_tags: import.passthrough_tags.clone(),
            derive_rules: core.derive.clone(),
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ImportError::Config {
                field: "batch_size".to_owned(),
                reason: format!("must be 1-{}", MAX_BATCH_SIZE),
            });
        }

        if self.import_id.is_empty() {
            return Err(ImportError::Config {
                field: "import_id".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.progress_interval == 0 {
            return Err(ImportError::Config {
                field: "progress_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.root_dir.as_os_str().is_empty() {
            return Err(ImportError::Config {
                field: "root_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 임포터 설정 빌더
#[derive(Default)]
pub struct ImporterConfigBuilder {
    config: ImporterConfig,
}

impl ImporterConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 스캔 시작 디렉토리를 설정합니다.
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    /// 재귀 여부를 설정합니다.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// 완료 마커 무시 여부를 설정합니다.
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    /// 배치 크기를 설정합니다.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// 임포트 ID를 설정합니다.
    pub fn import_id(mut self, id: impl Into<String>) -> Self {
        self.config.import_id = id.into();
        self
    }

    /// 타임스탬프 정규화 여부를 설정합니다.
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// 리소스 로그 임포트 여부를 설정합니다.
    pub fn include_resource_logs(mut self, include: bool) -> Self {
        self.config.include_resource_logs = include;
        self
    }

    /// 벤치마크 라벨을 고정합니다.
    pub fn benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.config.benchmark = Some(benchmark.into());
        self
    }

    /// 전달할 원본 태그를 설정합니다.
    pub fn passthrough_tags(mut self, tags: Vec<String>) -> Self {
        self.config.passthrough_tags = tags;
        self
    }

    /// 파생 규칙을 설정합니다.
    pub fn derive_rules(mut self, rules: Vec<DeriveRuleConfig>) -> Self {
        self.config.derive_rules = rules;
        self
    }

    /// 진행 상황 로그 간격을 설정합니다.
    pub fn progress_interval(mut self, lines: u64) -> Self {
        self.config.progress_interval = lines;
        self
    }

    /// 설정을 검증하고 `ImporterConfig`를 생성합니다.
    pub fn build(self) -> Result<ImporterConfig, ImportError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
