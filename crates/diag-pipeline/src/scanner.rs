//! 디렉토리 스캐너 -- 임포트 대상 파일 탐색과 완료 마커 관리
//!
//! 벤치마크 결과는 보통 다음과 같이 배치됩니다.
//! ```text
//! <root>/<benchmark>/<member>/diagnostics-<node>-*.log
//!                             dstat-<host>.csv
//! ```
//!
//! 처리가 끝난 하위 디렉토리에는 빈 마커 파일([`SCANNED_DIR_MARKER`])을 만들어
//! 다음 실행에서 중복 임포트를 막습니다. `force`가 켜져 있으면 마커를 무시합니다.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ImportError;
use crate::parser::LogKind;

/// 스캔 완료 마커 파일 이름
pub const SCANNED_DIR_MARKER: &str = ".diag_viewer_done";

/// 디렉토리 스캔 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// 아직 임포트하지 않음
    Unscanned,
    /// 마커가 있음
    Scanned,
}

/// 디렉토리 하나의 목록 (이름 순 정렬)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirListing {
    /// 임포트 대상 파일
    pub files: Vec<(PathBuf, LogKind)>,
    /// 하위 디렉토리
    pub subdirs: Vec<PathBuf>,
}

/// 디렉토리 스캐너
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    force: bool,
    include_resource_logs: bool,
    benchmark: Option<String>,
}

impl DirectoryScanner {
    /// 새 스캐너를 생성합니다.
    pub fn new(force: bool, include_resource_logs: bool, benchmark: Option<String>) -> Self {
        Self {
            force,
            include_resource_logs,
            benchmark,
        }
    }

    /// 마커 파일로 디렉토리 상태를 확인합니다.
    pub async fn state(&self, dir: &Path) -> ScanState {
        match tokio::fs::try_exists(dir.join(SCANNED_DIR_MARKER)).await {
            Ok(true) => ScanState::Scanned,
            _ => ScanState::Unscanned,
        }
    }

    /// 디렉토리를 처리해야 하는지 판단합니다.
    pub async fn should_scan(&self, dir: &Path) -> bool {
        self.force || self.state(dir).await == ScanState::Unscanned
    }

    /// 디렉토리 항목을 읽어 임포트 대상 파일과 하위 디렉토리로 나눕니다.
    ///
    /// # Errors
    /// 디렉토리를 열 수 없으면 [`ImportError::Scan`]을 반환합니다.
    /// 개별 항목 읽기 실패는 건너뜁니다.
    pub async fn list(&self, dir: &Path) -> Result<DirListing, ImportError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ImportError::Scan {
                path: dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut listing = DirListing::default();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                    break;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read file type");
                    continue;
                }
            };

            if file_type.is_dir() {
                listing.subdirs.push(path);
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!(path = %path.display(), "non UTF-8 file name, skipping");
                continue;
            };
            if let Some(kind) = LogKind::from_file_name(name, self.include_resource_logs) {
                listing.files.push((path, kind));
            }
        }

        listing.files.sort_by(|a, b| a.0.cmp(&b.0));
        listing.subdirs.sort();
        Ok(listing)
    }

    /// 디렉토리에 완료 마커를 만듭니다.
    pub async fn mark_scanned(&self, dir: &Path) -> Result<(), ImportError> {
        tokio::fs::write(dir.join(SCANNED_DIR_MARKER), b"").await?;
        debug!(dir = %dir.display(), "directory marked as scanned");
        Ok(())
    }

    /// 디렉토리의 파일에 붙일 벤치마크 라벨을 결정합니다.
    ///
    /// 지정값이 있으면 그대로 쓰고, 없으면 상위 디렉토리 이름,
    /// 그것도 없으면 디렉토리 자신의 이름을 씁니다.
    pub fn benchmark_label(&self, dir: &Path) -> String {
        if let Some(benchmark) = &self.benchmark {
            return benchmark.clone();
        }

        let name_of = |p: &Path| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
        };

        dir.parent()
            .and_then(name_of)
            .or_else(|| name_of(dir))
            .unwrap_or_default()
    }
}
