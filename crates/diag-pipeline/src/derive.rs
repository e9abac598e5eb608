//! 파생 메트릭 엔진
//!
//! 완성된 사이클 안의 두 원시 카운터로부터 새 메트릭을 계산합니다.
//! 예: `wan.totalPublishLatency / wan.totalPublishedEventCount` → `wan.publishLatencyAvg`
//!
//! 두 메트릭 중 하나라도 없거나 값이 0이면 아무것도 만들지 않습니다.
//! 원본 샘플은 수정하지 않습니다.

use std::collections::BTreeMap;

use diagflux_core::config::DeriveRuleConfig;
use diagflux_core::types::Sample;

use crate::cycle::Cycle;

/// 파생 샘플의 단위
pub const DERIVED_UNIT: &str = "avg";

/// 파생 규칙 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationRule {
    /// 분자 메트릭
    pub numerator: String,
    /// 분모 메트릭
    pub denominator: String,
    /// 결과 메트릭
    pub output: String,
    /// 원본에서 복사할 태그
    pub carry_tags: Vec<String>,
}

impl From<&DeriveRuleConfig> for DerivationRule {
    fn from(config: &DeriveRuleConfig) -> Self {
        Self {
            numerator: config.numerator.clone(),
            denominator: config.denominator.clone(),
            output: config.output.clone(),
            carry_tags: config.carry_tags.clone(),
        }
    }
}

impl DerivationRule {
    /// 사이클에 규칙을 적용해 파생 샘플을 계산합니다.
    pub fn evaluate(&self, cycle: &Cycle) -> Option<Sample> {
        let numerator = cycle.get(&self.numerator)?;
        let denominator = cycle.get(&self.denominator)?;
        if numerator.value == 0.0 || denominator.value == 0.0 {
            return None;
        }

        let mut tags = BTreeMap::new();
        for key in &self.carry_tags {
            let value = numerator
                .tags
                .get(key)
                .or_else(|| denominator.tags.get(key));
            if let Some(value) = value {
                tags.insert(key.clone(), value.clone());
            }
        }

        Some(Sample {
            node: numerator.node.clone(),
            timestamp: cycle.tick(),
            metric: self.output.clone(),
            unit: DERIVED_UNIT.to_owned(),
            tags,
            value: numerator.value / denominator.value,
        })
    }
}

/// 설정된 규칙 집합을 사이클에 적용하는 엔진
#[derive(Debug, Clone)]
pub struct DerivedMetricEngine {
    rules: Vec<DerivationRule>,
}

impl Default for DerivedMetricEngine {
    fn default() -> Self {
        Self::from_config(&DeriveRuleConfig::defaults())
    }
}

impl DerivedMetricEngine {
    /// 규칙 목록으로 엔진을 생성합니다.
    pub fn new(rules: Vec<DerivationRule>) -> Self {
        Self { rules }
    }

    /// 설정의 `[[derive]]` 항목으로 엔진을 생성합니다.
    pub fn from_config(rules: &[DeriveRuleConfig]) -> Self {
        Self::new(rules.iter().map(DerivationRule::from).collect())
    }

    /// 등록된 규칙
    pub fn rules(&self) -> &[DerivationRule] {
        &self.rules
    }

    /// 사이클을 읽기만 하고 파생 샘플 목록을 계산합니다.
    pub fn derive(&self, cycle: &Cycle) -> Vec<Sample> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(cycle))
            .collect()
    }

    /// 파생 샘플을 사이클에 삽입하고 삽입한 개수를 반환합니다.
    ///
    /// 같은 사이클에 여러 번 적용해도 결과는 같습니다.
    pub fn apply(&self, cycle: &mut Cycle) -> usize {
        let derived = self.derive(cycle);
        let count = derived.len();
        for sample in derived {
            cycle.upsert(sample);
        }
        count
    }
}
