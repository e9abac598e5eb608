//! 임포터 -- 디렉토리 트리 전체를 싱크로 임포트하는 실행 단위
//!
//! [`Importer`]는 스캐너, 파서, 사이클 집계기, 파생 메트릭 엔진, 방출기를 연결합니다.
//!
//! # 실행 흐름
//! ```text
//! sink.prepare()
//!   └─▶ import_dir(root)
//!         ├─ 파일: 라인 → Sample → Cycle → 파생 메트릭 → OutputRecord → 배치 전송
//!         └─ 하위 디렉토리: 재귀 후 완료 마커 생성
//!   └─▶ 최종 플러시
//! sink.close()   (실패한 경우에도 시도)
//! ```
//!
//! 라인/파일/디렉토리 단위 실패는 로그를 남기고 건너뜁니다.
//! 싱크가 배치를 거부하면 레코드는 버퍼에 남아 다음 플러시에서 다시 전송되고,
//! 그 사이 처리한 하위 디렉토리에는 완료 마커를 만들지 않습니다.
//! 싱크 연결 실패만 실행을 중단합니다.
//!
//! # 사용 예시
//! ```ignore
//! use diagflux_pipeline::{ImporterConfigBuilder, Importer, MemorySink};
//!
//! let config = ImporterConfigBuilder::new().root_dir("/data/bench").build()?;
//! let mut importer = Importer::new(config, MemorySink::new())?;
//! let stats = importer.run().await?;
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use diagflux_core::metrics as m;
use diagflux_core::pipeline::{BoxFuture, PointSink};
use diagflux_core::types::Sample;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::ImporterConfig;
use crate::cycle::{Cycle, CycleAggregator};
use crate::derive::DerivedMetricEngine;
use crate::emitter::{RecordEmitter, RecordShape, RunIdentity};
use crate::error::ImportError;
use crate::parser::diagnostics::{self, DiagnosticsParser};
use crate::parser::{LogKind, ResourceParser, ResourceRow};
use crate::scanner::DirectoryScanner;

/// 임포트 진행 카운터
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// 처리한 파일 수
    pub files: u64,
    /// 건너뛴 파일 수 (열기 실패, 노드 이름 없음)
    pub failed_files: u64,
    /// 완료 마커 때문에 건너뛴 디렉토리 수
    pub skipped_dirs: u64,
    /// 처리한 라인 수 (모든 라인)
    pub lines_processed: u64,
    /// 메트릭 마커가 있는 라인 수
    pub metric_lines: u64,
    /// 파싱 실패 라인 수
    pub parse_failures: u64,
    /// 완성된 사이클 수
    pub cycles: u64,
    /// 생성된 파생 샘플 수
    pub derived_samples: u64,
    /// 샘플을 만든 리소스 행 수
    pub resource_rows: u64,
    /// 방출한 레코드 수
    pub records_emitted: u64,
    /// 성공한 배치 전송 수
    pub flushes: u64,
    /// 실패한 배치 전송 수 (레코드는 다음 전송에서 재시도)
    pub failed_flushes: u64,
}

/// 디렉토리 트리 임포터
pub struct Importer<S> {
    config: ImporterConfig,
    scanner: DirectoryScanner,
    engine: DerivedMetricEngine,
    emitter: RecordEmitter<S>,
    stats: ImportStats,
}

impl<S: PointSink> Importer<S> {
    /// 설정을 검증하고 임포터를 생성합니다.
    pub fn new(config: ImporterConfig, sink: S) -> Result<Self, ImportError> {
        config.validate()?;

        let engine = DerivedMetricEngine::from_config(&config.derive_rules);
        let shape = RecordShape {
            passthrough_tags: config.passthrough_tags.clone(),
            derived_metrics: engine
                .rules()
                .iter()
                .map(|rule| rule.output.clone())
                .collect::<BTreeSet<_>>(),
            normalize: config.normalize,
        };
        let scanner = DirectoryScanner::new(
            config.force,
            config.include_resource_logs,
            config.benchmark.clone(),
        );
        let emitter = RecordEmitter::new(sink, config.batch_size, shape);

        Ok(Self {
            config,
            scanner,
            engine,
            emitter,
            stats: ImportStats::default(),
        })
    }

    /// 전체 실행: 준비 → 루트부터 임포트 → 최종 플러시 → 닫기
    ///
    /// `close`는 실패한 경우에도 호출됩니다. 먼저 발생한 에러가 우선합니다.
    pub async fn run(&mut self) -> Result<ImportStats, ImportError> {
        let sink_name = self.emitter.sink().name().to_owned();
        info!(
            root = %self.config.root_dir.display(),
            sink = %sink_name,
            import_id = %self.config.import_id,
            "import started"
        );

        let result = self.run_inner(&sink_name).await;

        let closed = self.emitter.sink_mut().close().await;
        if let Err(e) = &closed {
            warn!(sink = %sink_name, error = %e, "failed to close sink");
        } else {
            debug!(sink = %sink_name, "sink closed");
        }

        result?;
        closed.map_err(|source| ImportError::Sink {
            sink: sink_name,
            source,
        })?;

        self.sync_emitter_stats();
        info!(
            files = self.stats.files,
            lines = self.stats.lines_processed,
            records = self.stats.records_emitted,
            flushes = self.stats.flushes,
            parse_failures = self.stats.parse_failures,
            "import finished"
        );
        Ok(self.stats.clone())
    }

    async fn run_inner(&mut self, sink_name: &str) -> Result<(), ImportError> {
        self.emitter
            .sink_mut()
            .prepare()
            .await
            .map_err(|source| ImportError::Sink {
                sink: sink_name.to_owned(),
                source,
            })?;

        let root = absolute_root(&self.config.root_dir).await;
        match self.import_dir(&root).await {
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(dir = %root.display(), error = %e, "failed to import root directory"),
            Ok(()) => {}
        }

        self.emitter.flush().await?;
        self.sync_emitter_stats();
        Ok(())
    }

    /// 디렉토리 하나를 임포트합니다. `recursive`이면 하위 디렉토리도 처리합니다.
    ///
    /// 완료 마커가 있으면 (`force`가 아닌 한) 건너뜁니다.
    /// 하위 디렉토리는 처리가 끝난 뒤 마커를 만듭니다. 이 함수에 직접 넘긴
    /// 디렉토리에는 마커를 만들지 않습니다.
    pub fn import_dir<'a>(&'a mut self, dir: &'a Path) -> BoxFuture<'a, Result<(), ImportError>> {
        Box::pin(async move {
            if !self.scanner.should_scan(dir).await {
                info!(dir = %dir.display(), "directory already imported, skipping");
                self.stats.skipped_dirs += 1;
                return Ok(());
            }

            info!(dir = %dir.display(), "scanning directory");
            let listing = self.scanner.list(dir).await?;
            let benchmark = self.scanner.benchmark_label(dir);

            for (path, kind) in &listing.files {
                match self.import_file(path, *kind, &benchmark).await {
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        self.stats.failed_files += 1;
                        warn!(file = %path.display(), error = %e, "failed to import file, skipping");
                    }
                    Ok(()) => {}
                }
            }

            if !self.config.recursive {
                return Ok(());
            }

            for subdir in &listing.subdirs {
                if !self.scanner.should_scan(subdir).await {
                    info!(dir = %subdir.display(), "directory already imported, skipping");
                    self.stats.skipped_dirs += 1;
                    continue;
                }

                let failed_before = self.emitter.failed_flushes();
                match self.import_dir(subdir).await {
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(dir = %subdir.display(), error = %e, "failed to import directory, skipping");
                    }
                    Ok(()) if self.emitter.failed_flushes() > failed_before => {
                        warn!(
                            dir = %subdir.display(),
                            "sink rejected a batch while importing directory, leaving it unmarked"
                        );
                    }
                    Ok(()) => {
                        if let Err(e) = self.scanner.mark_scanned(subdir).await {
                            warn!(dir = %subdir.display(), error = %e, "failed to write scan marker");
                        }
                    }
                }
            }

            Ok(())
        })
    }

    /// 파일 하나를 종류에 맞게 임포트합니다.
    pub async fn import_file(
        &mut self,
        path: &Path,
        kind: LogKind,
        benchmark: &str,
    ) -> Result<(), ImportError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        info!(file = %path.display(), kind = %kind, "importing file");

        match kind {
            LogKind::Diagnostics => {
                let parser = DiagnosticsParser::for_file(&file_name)?;
                let file = tokio::fs::File::open(path).await?;
                let identity = RunIdentity {
                    benchmark: benchmark.to_owned(),
                    node: parser.node().to_owned(),
                    import_id: self.config.import_id.clone(),
                };
                self.process_reader(BufReader::new(file), &parser, &identity, &file_name)
                    .await?;
            }
            LogKind::Resource => {
                let data = tokio::fs::read(path).await?;
                self.process_resource(&data, &file_name, benchmark).await?;
            }
        }

        self.stats.files += 1;
        metrics::counter!(m::IMPORT_FILES_TOTAL, m::LABEL_LOG_KIND => kind.as_str()).increment(1);
        Ok(())
    }

    /// 진단 로그 스트림을 라인 단위로 처리합니다.
    ///
    /// UTF-8이 아닌 바이트는 대체 문자로 바꿔 읽습니다.
    pub async fn process_reader<R>(
        &mut self,
        mut reader: R,
        parser: &DiagnosticsParser,
        identity: &RunIdentity,
        file_name: &str,
    ) -> Result<(), ImportError>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut aggregator = CycleAggregator::new();
        let mut buf = Vec::with_capacity(512);
        let mut line_no: u64 = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;
            self.count_line();

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if !diagnostics::is_metric_line(line) {
                continue;
            }
            self.stats.metric_lines += 1;

            match parser.parse_line(line) {
                Ok(sample) => {
                    if let Some(cycle) = aggregator.push(sample) {
                        self.complete_cycle(cycle, identity, file_name, line_no).await?;
                    }
                }
                Err(e) => {
                    self.stats.parse_failures += 1;
                    metrics::counter!(m::IMPORT_PARSE_ERRORS_TOTAL, m::LABEL_LOG_KIND => "diagnostics")
                        .increment(1);
                    warn!(file = file_name, line = line_no, error = %e, "failed to parse metric line");
                }
            }
        }

        if let Some(cycle) = aggregator.finish() {
            self.complete_cycle(cycle, identity, file_name, line_no).await?;
        }
        Ok(())
    }

    /// 리소스 CSV 내용을 처리합니다. 유효한 행마다 샘플을 바로 방출합니다.
    pub async fn process_resource(
        &mut self,
        data: &[u8],
        file_name: &str,
        benchmark: &str,
    ) -> Result<(), ImportError> {
        let mut parser = ResourceParser::for_file(file_name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut row_no: u64 = 0;
        for record in reader.records() {
            row_no += 1;
            self.count_line();
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    debug!(file = file_name, error = %e, "skipping unreadable resource row");
                    continue;
                }
            };

            let samples = match parser.parse_record(&record) {
                ResourceRow::Samples(samples) => samples,
                ResourceRow::Host(host) => {
                    debug!(file = file_name, host = %host, "resource host");
                    continue;
                }
                ResourceRow::Skipped => continue,
            };

            self.stats.resource_rows += 1;
            let identity = RunIdentity {
                benchmark: benchmark.to_owned(),
                node: parser.node().to_owned(),
                import_id: self.config.import_id.clone(),
            };
            for sample in &samples {
                self.emit(sample, &identity, file_name, row_no).await?;
            }
        }
        Ok(())
    }

    async fn complete_cycle(
        &mut self,
        mut cycle: Cycle,
        identity: &RunIdentity,
        file_name: &str,
        line_no: u64,
    ) -> Result<(), ImportError> {
        let derived = self.engine.apply(&mut cycle);
        self.stats.cycles += 1;
        self.stats.derived_samples += derived as u64;
        metrics::counter!(m::IMPORT_CYCLES_TOTAL).increment(1);
        if derived > 0 {
            metrics::counter!(m::IMPORT_DERIVED_SAMPLES_TOTAL).increment(derived as u64);
        }

        for sample in cycle.samples() {
            self.emit(sample, identity, file_name, line_no).await?;
        }
        Ok(())
    }

    /// 샘플 하나를 방출합니다. 싱크 연결 실패만 호출자에게 전파합니다.
    async fn emit(
        &mut self,
        sample: &Sample,
        identity: &RunIdentity,
        file_name: &str,
        line_no: u64,
    ) -> Result<(), ImportError> {
        let result = self.emitter.emit_sample(sample, identity).await;
        self.stats.records_emitted += 1;
        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.stats.failed_flushes = self.emitter.failed_flushes();
                error!(
                    file = file_name,
                    line = line_no,
                    pending = self.emitter.buffer().len(),
                    error = %e,
                    "sink rejected batch, records kept for the next flush"
                );
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn count_line(&mut self) {
        self.stats.lines_processed += 1;
        metrics::counter!(m::IMPORT_LINES_PROCESSED_TOTAL).increment(1);
        if self.stats.lines_processed % self.config.progress_interval == 0 {
            info!(
                lines = self.stats.lines_processed,
                records = self.stats.records_emitted,
                "import progress"
            );
        }
    }

    fn sync_emitter_stats(&mut self) {
        self.stats.flushes = self.emitter.flushes();
        self.stats.failed_flushes = self.emitter.failed_flushes();
    }

    /// 현재까지의 진행 카운터
    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// 임포터 설정
    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// 싱크 참조
    pub fn sink(&self) -> &S {
        self.emitter.sink()
    }

    /// 임포터를 해체하고 싱크를 돌려받습니다.
    pub fn into_sink(self) -> S {
        self.emitter.into_sink()
    }
}

/// 루트 경로를 절대 경로로 바꿉니다.
///
/// 벤치마크 라벨을 상위 디렉토리 이름에서 얻으므로 `.` 같은 상대 경로는 먼저 풀어야 합니다.
async fn absolute_root(root: &Path) -> PathBuf {
    match tokio::fs::canonicalize(root).await {
        Ok(path) => path,
        Err(e) => {
            debug!(root = %root.display(), error = %e, "cannot canonicalize root directory");
            std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
        }
    }
}
