//! 사이클 집계 -- 같은 타임스탬프의 샘플 묶음
//!
//! 진단 로그는 한 tick(초)마다 모든 메트릭을 연달아 기록합니다.
//! [`CycleAggregator`]는 파일 하나의 샘플 스트림을 받아 타임스탬프가 바뀔 때마다
//! 완성된 [`Cycle`]을 돌려줍니다.
//!
//! # 상태 전이
//! ```text
//! (없음) ──push(T1)──▶ 열림(T1) ──push(T1)──▶ 열림(T1, upsert)
//!                          │
//!                          └──push(T2)──▶ Cycle(T1) 반환, 열림(T2) ← T2 샘플로 시작
//!
//! finish() ──▶ 열린 사이클 반환 (비어 있으면 None)
//! ```

use std::collections::BTreeMap;

use diagflux_core::types::{Sample, Timestamp};

/// 같은 tick에 속한 샘플 묶음
///
/// 같은 메트릭이 두 번 나오면 나중 값이 남습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    tick: Timestamp,
    entries: BTreeMap<String, Sample>,
}

impl Cycle {
    /// 빈 사이클을 생성합니다.
    pub fn new(tick: Timestamp) -> Self {
        Self {
            tick,
            entries: BTreeMap::new(),
        }
    }

    /// 사이클의 tick
    pub fn tick(&self) -> Timestamp {
        self.tick
    }

    /// 샘플을 메트릭 이름으로 upsert 합니다.
    pub fn upsert(&mut self, sample: Sample) {
        self.entries.insert(sample.metric.clone(), sample);
    }

    /// 메트릭 이름으로 샘플을 찾습니다.
    pub fn get(&self, metric: &str) -> Option<&Sample> {
        self.entries.get(metric)
    }

    /// 메트릭 이름 순으로 샘플을 순회합니다.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.entries.values()
    }

    /// 샘플 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 샘플을 소비하며 꺼냅니다.
    pub fn into_samples(self) -> impl Iterator<Item = Sample> {
        self.entries.into_values()
    }
}

/// 파일 하나에 대한 사이클 집계기
#[derive(Debug, Default)]
pub struct CycleAggregator {
    open: Option<Cycle>,
}

impl CycleAggregator {
    /// 새 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 샘플을 넣습니다.
    ///
    /// 타임스탬프가 열린 사이클과 다르면 그 사이클을 완성해 반환하고,
    /// 새 샘플로 다음 사이클을 시작합니다.
    pub fn push(&mut self, sample: Sample) -> Option<Cycle> {
        if let Some(cycle) = self.open.as_mut() {
            if cycle.tick == sample.timestamp {
                cycle.upsert(sample);
                return None;
            }
        }

        let mut next = Cycle::new(sample.timestamp);
        next.upsert(sample);
        self.open.replace(next).filter(|c| !c.is_empty())
    }

    /// 파일 끝에서 열린 사이클을 반환합니다. 비어 있으면 `None`.
    pub fn finish(&mut self) -> Option<Cycle> {
        self.open.take().filter(|c| !c.is_empty())
    }

    /// 열린 사이클의 tick
    pub fn open_tick(&self) -> Option<Timestamp> {
        self.open.as_ref().map(Cycle::tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: &str, metric: &str, value: f64) -> Sample {
        Sample {
            node: "member1".to_owned(),
            timestamp: Timestamp::parse_log(ts).unwrap(),
            metric: metric.to_owned(),
            unit: "count".to_owned(),
            tags: BTreeMap::new(),
            value,
        }
    }

    const T1: &str = "10-03-2020 14:20:42";
    const T2: &str = "10-03-2020 14:20:43";
    const T3: &str = "10-03-2020 14:20:44";

    #[test]
    fn first_sample_opens_cycle() {
        let mut agg = CycleAggregator::new();
        assert!(agg.open_tick().is_none());
        assert!(agg.push(sample(T1, "a", 1.0)).is_none());
        assert_eq!(agg.open_tick(), Some(Timestamp::parse_log(T1).unwrap()));
    }

    #[test]
    fn groups_two_ticks_into_two_cycles() {
        let mut agg = CycleAggregator::new();
        let mut cycles = Vec::new();
        for s in [
            sample(T1, "a", 1.0),
            sample(T1, "b", 2.0),
            sample(T1, "c", 3.0),
            sample(T2, "a", 4.0),
            sample(T2, "b", 5.0),
        ] {
            cycles.extend(agg.push(s));
        }
        cycles.extend(agg.finish());

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].len(), 3);
        assert_eq!(cycles[1].len(), 2);
        assert_eq!(cycles[0].tick(), Timestamp::parse_log(T1).unwrap());
        assert_eq!(cycles[1].tick(), Timestamp::parse_log(T2).unwrap());
    }

    #[test]
    fn sample_that_changes_tick_starts_next_cycle() {
        let mut agg = CycleAggregator::new();
        agg.push(sample(T1, "a", 1.0));
        let done = agg.push(sample(T2, "b", 2.0)).unwrap();
        assert!(done.get("b").is_none());

        let last = agg.finish().unwrap();
        assert_eq!(last.get("b").unwrap().value, 2.0);
    }

    #[test]
    fn same_metric_in_same_tick_is_last_write_wins() {
        let mut agg = CycleAggregator::new();
        agg.push(sample(T1, "a", 1.0));
        agg.push(sample(T1, "a", 9.0));
        let cycle = agg.finish().unwrap();
        assert_eq!(cycle.len(), 1);
        assert_eq!(cycle.get("a").unwrap().value, 9.0);
    }

    #[test]
    fn single_sample_ticks_each_form_a_cycle() {
        let mut agg = CycleAggregator::new();
        let mut count = 0;
        for ts in [T1, T2, T3] {
            count += agg.push(sample(ts, "a", 1.0)).into_iter().count();
        }
        count += agg.finish().into_iter().count();
        assert_eq!(count, 3);
    }

    #[test]
    fn finish_without_samples_is_none() {
        let mut agg = CycleAggregator::new();
        assert!(agg.finish().is_none());
    }

    #[test]
    fn finish_resets_state() {
        let mut agg = CycleAggregator::new();
        agg.push(sample(T1, "a", 1.0));
        assert!(agg.finish().is_some());
        assert!(agg.finish().is_none());
        assert!(agg.open_tick().is_none());
    }

    #[test]
    fn tick_going_backwards_still_closes_cycle() {
        let mut agg = CycleAggregator::new();
        agg.push(sample(T2, "a", 1.0));
        let done = agg.push(sample(T1, "a", 2.0)).unwrap();
        assert_eq!(done.tick(), Timestamp::parse_log(T2).unwrap());
    }

    #[test]
    fn samples_iterate_in_metric_order() {
        let mut cycle = Cycle::new(Timestamp::parse_log(T1).unwrap());
        cycle.upsert(sample(T1, "z", 1.0));
        cycle.upsert(sample(T1, "a", 2.0));
        let names: Vec<_> = cycle.samples().map(|s| s.metric.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }
}
