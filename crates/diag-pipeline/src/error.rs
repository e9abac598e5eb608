//! 임포트 파이프라인 에러 타입
//!
//! [`ImportError`]는 파싱, 디렉토리 스캔, 싱크 전송 등 파이프라인 내부에서 발생하는
//! 에러를 표현합니다. `From<ImportError> for DiagfluxError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use diagflux_core::error::{ConfigError, DiagfluxError, ParseError};

/// 임포트 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// 라인/행 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 입력 형식 (diagnostics, resource)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 파일 이름에서 노드 이름을 얻을 수 없음
    #[error("cannot derive node name from file '{file}'")]
    NodeName {
        /// 파일 이름
        file: String,
    },

    /// 디렉토리 스캔 실패
    #[error("scan error: {path}: {reason}")]
    Scan {
        /// 디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 싱크 전송 실패
    #[error("sink error: {sink}: {source}")]
    Sink {
        /// 싱크 이름
        sink: String,
        /// 원인
        source: DiagfluxError,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl ImportError {
    /// 진단 로그 파싱 에러를 생성합니다.
    pub(crate) fn diagnostics(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            format: "diagnostics".to_owned(),
            offset,
            reason: reason.into(),
        }
    }

    /// 실행을 중단해야 하는 에러인지 여부 (싱크 연결 실패)
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Sink { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<ImportError> for DiagfluxError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Parse { offset, reason, .. } => {
                DiagfluxError::Parse(ParseError::Failed { offset, reason })
            }
            ImportError::NodeName { file } => DiagfluxError::Parse(ParseError::NodeName { file }),
            ImportError::Config { field, reason } => {
                DiagfluxError::Config(ConfigError::InvalidValue { field, reason })
            }
            ImportError::Sink { source, .. } => source,
            ImportError::Io(e) => DiagfluxError::Io(e),
            other => DiagfluxError::Import(other.to_string()),
        }
    }
}
