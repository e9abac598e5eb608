//! 파서 벤치마크
//!
//! 진단 로그 메트릭 라인과 dstat CSV 행 파서의 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use csv::StringRecord;
use diagflux_pipeline::cycle::CycleAggregator;
use diagflux_pipeline::parser::{DiagnosticsParser, ResourceParser};

/// 태그가 적은 메트릭 라인
const METRIC_SHORT: &str = "10-03-2020 14:20:42 1583850042297 Metric[[unit=bytes,metric=runtime.usedMemory]=104857600]";

/// 태그가 많은 메트릭 라인
const METRIC_LONG: &str = "10-03-2020 14:20:42 1583850042297 Metric[[thread=hz.wan-bench.partition-operation.thread-7,replication=to-dc2,publisherId=batch-publisher,unit=ms,metric=wan.totalPublishLatency]=123456]";

/// 메트릭이 아닌 라인
const PLAIN_LINE: &str = "10-03-2020 14:20:42 1583850042297 BuildInfo[BuildNumber=20200310, Version=4.0.1]";

const RESOURCE_ROW: [&str; 22] = [
    "1583850042.412", "1073741824", "134217728", "268435456", "536870912", "12.5", "3.5",
    "84.0", "0.0", "0.0", "0.0", "0", "4096", "5000", "6000", "0", "0", "1100", "2200", "0.5",
    "0.4", "0.3",
];

fn bench_metric_line(c: &mut Criterion) {
    let parser = DiagnosticsParser::new("member1");
    let mut group = c.benchmark_group("metric_line");

    group.throughput(Throughput::Elements(1));
    group.bench_function("short", |b| {
        b.iter(|| parser.parse_line(black_box(METRIC_SHORT)).unwrap())
    });
    group.bench_function("long_with_tags", |b| {
        b.iter(|| parser.parse_line(black_box(METRIC_LONG)).unwrap())
    });
    group.bench_function("marker_check_non_metric", |b| {
        b.iter(|| diagflux_pipeline::parser::diagnostics::is_metric_line(black_box(PLAIN_LINE)))
    });

    group.throughput(Throughput::Elements(1000));
    group.bench_function("throughput_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                parser.parse_line(black_box(METRIC_LONG)).unwrap();
            }
        })
    });

    group.finish();
}

fn bench_cycle_grouping(c: &mut Criterion) {
    let parser = DiagnosticsParser::new("member1");
    let mut group = c.benchmark_group("cycle_grouping");

    for per_tick in [10usize, 100, 1000] {
        let lines: Vec<String> = (0..per_tick * 10)
            .map(|i| {
                let second = i / per_tick;
                format!(
                    "10-03-2020 14:20:{second:02} 1 Metric[[unit=count,metric=m.{}]={i}]",
                    i % per_tick
                )
            })
            .collect();

        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", per_tick), &lines, |b, lines| {
            b.iter(|| {
                let mut aggregator = CycleAggregator::new();
                let mut cycles = 0;
                for line in lines {
                    let sample = parser.parse_line(line).unwrap();
                    if aggregator.push(sample).is_some() {
                        cycles += 1;
                    }
                }
                if aggregator.finish().is_some() {
                    cycles += 1;
                }
                cycles
            })
        });
    }

    group.finish();
}

fn bench_resource_row(c: &mut Criterion) {
    let record = StringRecord::from(RESOURCE_ROW.to_vec());
    let mut group = c.benchmark_group("resource_row");

    group.throughput(Throughput::Elements(1));
    group.bench_function("data_row", |b| {
        let mut parser = ResourceParser::new("host");
        b.iter(|| parser.parse_record(black_box(&record)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_metric_line,
    bench_cycle_grouping,
    bench_resource_row
);
criterion_main!(benches);
