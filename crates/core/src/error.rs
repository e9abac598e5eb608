//! 에러 타입 -- 도메인별 에러 정의

/// diagflux 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DiagfluxError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 스토리지(싱크) 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 임포트 처리 에러
    #[error("import error: {0}")]
    Import(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagfluxError {
    /// 실행 전체를 중단해야 하는 에러인지 여부
    ///
    /// 싱크 연결 실패만 치명적입니다. 나머지는 라인/파일 단위로 건너뜁니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Connection(_)))
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 타임스탬프 형식 불일치
    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    /// 라인 파싱 실패
    #[error("parse failed at offset {offset}: {reason}")]
    Failed { offset: usize, reason: String },

    /// 파일 이름에서 노드 이름을 추출할 수 없음
    #[error("cannot derive node name from file '{file}'")]
    NodeName { file: String },
}

/// 스토리지(싱크) 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 실패 (치명적)
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 서버가 배치를 거부함
    #[error("write rejected (status {status}): {reason}")]
    Rejected { status: u16, reason: String },
}
