//! 리소스 로그(dstat CSV) 행 파서
//!
//! 리소스 로그 한 행은 한 노드의 한 시점을 완결된 형태로 담고 있으므로
//! 사이클 집계 없이 바로 샘플로 변환합니다.
//!
//! # 행 종류
//! - `"Host:","hz-member1",...` → 이후 행의 노드 이름
//! - `"epoch","used",...` → 컬럼 헤더, 건너뜀
//! - 22개 컬럼 데이터 행 → 샘플 9개
//! - 그 외 → 건너뜀

use csv::StringRecord;
use diagflux_core::types::{Sample, Timestamp};
use tracing::debug;

/// 데이터 행의 컬럼 수
pub const RESOURCE_COLUMNS: usize = 22;

/// 노드 이름 행의 첫 번째 셀
pub const HOST_LABEL: &str = "Host:";

/// 컬럼 헤더 행의 첫 번째 셀
pub const HEADER_LABEL: &str = "epoch";

/// 리소스 로그 파일 확장자
pub const FILE_EXTENSION: &str = ".csv";

/// 방출할 컬럼: (인덱스, 측정값 이름, 단위)
///
/// 컬럼 순서: epoch, mem used/buff/cach/free, cpu usr/sys/idl/wai/hiq/siq,
/// disk read/writ, net recv/send, paging in/out, system int/csw, load 1m/5m/15m
const EMITTED_COLUMNS: [(usize, &str, &str); 9] = [
    (13, "net.recv", "bytes"),
    (14, "net.send", "bytes"),
    (1, "mem.used", "bytes"),
    (2, "mem.buff", "bytes"),
    (3, "mem.cach", "bytes"),
    (4, "mem.free", "bytes"),
    (5, "cpu.usr", "percent"),
    (6, "cpu.sys", "percent"),
    (7, "cpu.idl", "percent"),
];

/// 리소스 로그 파일인지 확인합니다.
pub fn is_resource_file(file_name: &str) -> bool {
    file_name.ends_with(FILE_EXTENSION)
}

/// 행 하나의 해석 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRow {
    /// 노드 이름 행
    Host(String),
    /// 데이터 행에서 만든 샘플
    Samples(Vec<Sample>),
    /// 형식이 맞지 않아 건너뛴 행
    Skipped,
}

/// 리소스 로그 파서
///
/// `Host:` 행을 만나기 전까지는 생성 시 지정한 노드 이름을 사용합니다.
#[derive(Debug, Clone)]
pub struct ResourceParser {
    node: String,
}

impl ResourceParser {
    /// 기본 노드 이름으로 생성합니다.
    pub fn new(default_node: impl Into<String>) -> Self {
        Self {
            node: default_node.into(),
        }
    }

    /// 파일 이름(확장자 제외)을 기본 노드 이름으로 사용해 생성합니다.
    pub fn for_file(file_name: &str) -> Self {
        let stem = file_name.strip_suffix(FILE_EXTENSION).unwrap_or(file_name);
        Self::new(stem.replace('.', "_"))
    }

    /// 현재 노드 이름
    pub fn node(&self) -> &str {
        &self.node
    }

    /// CSV 행 하나를 해석합니다.
    pub fn parse_record(&mut self, record: &StringRecord) -> ResourceRow {
        let first = record.get(0).map(str::trim).unwrap_or_default();

        if first == HOST_LABEL {
            return match record.get(1).map(str::trim).filter(|h| !h.is_empty()) {
                Some(host) => {
                    self.node = host.replace('.', "_");
                    ResourceRow::Host(self.node.clone())
                }
                None => ResourceRow::Skipped,
            };
        }

        if first == HEADER_LABEL || record.len() != RESOURCE_COLUMNS {
            return ResourceRow::Skipped;
        }

        match self.samples_from_row(record) {
            Some(samples) => ResourceRow::Samples(samples),
            None => {
                debug!(row = ?record, "skipping resource row with unparsable values");
                ResourceRow::Skipped
            }
        }
    }

    fn samples_from_row(&self, record: &StringRecord) -> Option<Vec<Sample>> {
        let epoch = parse_number(record.get(0)?)?;
        let timestamp = Timestamp::from_epoch_secs(epoch.floor() as i64)?;

        EMITTED_COLUMNS
            .iter()
            .map(|&(idx, metric, unit)| {
                let value = parse_number(record.get(idx)?)?;
                Some(Sample {
                    node: self.node.clone(),
                    timestamp,
                    metric: metric.to_owned(),
                    unit: unit.to_owned(),
                    tags: Default::default(),
                    value,
                })
            })
            .collect()
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
