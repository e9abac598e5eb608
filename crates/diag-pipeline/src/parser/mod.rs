//! 로그 파싱 모듈 -- 진단 로그 메트릭 라인, 리소스 CSV 행
//!
//! # 지원 형식
//! - 진단 로그 `diagnostics-<node>-*.log` ([`DiagnosticsParser`])
//! - 리소스 로그 `*.csv` (dstat, [`ResourceParser`])
//!
//! 파일 종류는 이름으로 판별합니다 ([`LogKind::from_file_name`]).

pub mod diagnostics;
pub mod resource;

use std::fmt;

pub use diagnostics::DiagnosticsParser;
pub use resource::{ResourceParser, ResourceRow};

/// 임포트 대상 파일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// 진단 로그
    Diagnostics,
    /// 리소스 CSV 로그
    Resource,
}

impl LogKind {
    /// 파일 이름으로 종류를 판별합니다. 임포트 대상이 아니면 `None`.
    pub fn from_file_name(file_name: &str, include_resource: bool) -> Option<Self> {
        if diagnostics::is_diagnostics_file(file_name) {
            Some(Self::Diagnostics)
        } else if include_resource && resource::is_resource_file(file_name) {
            Some(Self::Resource)
        } else {
            None
        }
    }

    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostics => "diagnostics",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
