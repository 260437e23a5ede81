//! 分区与分区聚合（Partition / PartitionAggregator）
//!
//! 一次查询返回的原始记录按判别属性分组：同一判别值的记录组成一个 `Aggregate`，
//! 全部 `Aggregate` 组成一个 `Partition`。分组为单遍 O(n)，组的顺序与组内记录顺序
//! 均为首次出现顺序。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    record::Record,
};
use std::collections::HashMap;

/// 共享同一判别值的一组记录
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    discriminator: String,
    records: Vec<Record>,
}

impl Aggregate {
    pub fn new(discriminator: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            discriminator: discriminator.into(),
            records,
        }
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_singular(&self) -> bool {
        self.records.len() == 1
    }
}

/// 一次查询结果的全部聚合；判别值在分区内唯一
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    aggregates: Vec<Aggregate>,
}

impl Partition {
    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn find(&self, discriminator: &str) -> Option<&Aggregate> {
        self.aggregates
            .iter()
            .find(|agg| agg.discriminator == discriminator)
    }

    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.aggregates.iter().map(Aggregate::discriminator)
    }

    pub fn record_count(&self) -> usize {
        self.aggregates.iter().map(Aggregate::len).sum()
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

impl TryFrom<Vec<Aggregate>> for Partition {
    type Error = MapperError;

    /// 由现成的聚合构造分区，重复的判别值视为无效分区
    fn try_from(aggregates: Vec<Aggregate>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for agg in &aggregates {
            if !seen.insert(agg.discriminator.as_str()) {
                return Err(MapperError::DuplicateAggregate {
                    discriminator: agg.discriminator.clone(),
                });
            }
        }
        Ok(Self { aggregates })
    }
}

/// 分区聚合器
pub struct PartitionAggregator;

impl PartitionAggregator {
    /// 按 `discriminator_attr` 的取值对记录分组
    pub fn aggregate<I>(discriminator_attr: &str, records: I) -> Result<Partition>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut aggregates: Vec<Aggregate> = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let Some(discriminator) = record.discriminator(discriminator_attr) else {
                return Err(MapperError::MissingDiscriminator {
                    attribute: discriminator_attr.to_string(),
                    index,
                });
            };

            match slots.get(discriminator) {
                Some(&slot) => aggregates[slot].records.push(record),
                None => {
                    let discriminator = discriminator.to_string();
                    slots.insert(discriminator.clone(), aggregates.len());
                    aggregates.push(Aggregate::new(discriminator, vec![record]));
                }
            }
        }

        tracing::debug!(
            aggregates = aggregates.len(),
            attribute = discriminator_attr,
            "partition aggregated"
        );

        Ok(Partition { aggregates })
    }
}
