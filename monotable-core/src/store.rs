//! 存储协作方（TableStore）
//!
//! 映射层只依赖两个能力：按查询条件取回有序记录（分页对上层透明），以及按批写入。
//! 具体后端（网络协议、鉴权、重试、超时）由实现方负责。
//!
//! `InMemoryTableStore` 为基于 `DashMap` 的内存实现，用于测试、示例与本地开发。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    record::Record,
};
use async_trait::async_trait;
use bon::Builder;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// 查询条件；对映射层不透明，由存储实现解释
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Query {
    #[builder(into)]
    table: String,
    /// 分区键属性名
    #[builder(into)]
    partition_attribute: String,
    /// 分区键取值
    #[builder(into)]
    partition_value: Value,
    /// 排序键属性名（与 `sort_prefix` 搭配使用）
    #[builder(into)]
    sort_attribute: Option<String>,
    /// 排序键前缀（begins_with）
    #[builder(into)]
    sort_prefix: Option<String>,
    /// 二级索引名
    #[builder(into)]
    index: Option<String>,
    /// 返回条数上限
    limit: Option<usize>,
}

impl Query {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn partition_attribute(&self) -> &str {
        &self.partition_attribute
    }

    pub fn partition_value(&self) -> &Value {
        &self.partition_value
    }

    pub fn sort_attribute(&self) -> Option<&str> {
        self.sort_attribute.as_deref()
    }

    pub fn sort_prefix(&self) -> Option<&str> {
        self.sort_prefix.as_deref()
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// 判断记录是否满足查询条件
    pub fn matches(&self, record: &Record) -> bool {
        if record.get(&self.partition_attribute) != Some(&self.partition_value) {
            return false;
        }
        match (&self.sort_attribute, &self.sort_prefix) {
            (Some(attr), Some(prefix)) => record
                .get(attr)
                .and_then(Value::as_str)
                .is_some_and(|v| v.starts_with(prefix.as_str())),
            _ => true,
        }
    }
}

/// 存储协作方
#[async_trait]
pub trait TableStore: Send + Sync {
    /// 执行查询，返回按存储顺序排列的全部记录
    async fn query(&self, query: &Query) -> Result<Vec<Record>>;

    /// 写入一个批次；失败以单批为粒度报告
    async fn batch_write(&self, table: &str, batch: Vec<Record>) -> Result<()>;
}

#[async_trait]
impl<S> TableStore for Arc<S>
where
    S: TableStore + ?Sized,
{
    async fn query(&self, query: &Query) -> Result<Vec<Record>> {
        (**self).query(query).await
    }

    async fn batch_write(&self, table: &str, batch: Vec<Record>) -> Result<()> {
        (**self).batch_write(table, batch).await
    }
}

type WriteFault = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// 内存表存储
///
/// - 主键由分区键与可选排序键组成，同键写入覆盖旧记录（put 语义）；
/// - 查询结果保持首次写入顺序；
/// - 可为某张表注入写入故障，用于演练部分批次失败。
pub struct InMemoryTableStore {
    partition_attribute: String,
    sort_attribute: Option<String>,
    tables: DashMap<String, Vec<Record>>,
    faults: DashMap<String, WriteFault>,
}

impl InMemoryTableStore {
    pub fn new(partition_attribute: impl Into<String>) -> Self {
        Self {
            partition_attribute: partition_attribute.into(),
            sort_attribute: None,
            tables: DashMap::new(),
            faults: DashMap::new(),
        }
    }

    pub fn with_sort_attribute(mut self, sort_attribute: impl Into<String>) -> Self {
        self.sort_attribute = Some(sort_attribute.into());
        self
    }

    /// 含有满足 `predicate` 记录的批次整体写入失败
    pub fn fail_writes_containing<F>(&self, table: impl Into<String>, predicate: F)
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.faults.insert(table.into(), Arc::new(predicate));
    }

    /// 表内全部记录（按写入顺序）
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.tables
            .get(table)
            .map(|t| t.value().clone())
            .unwrap_or_default()
    }

    fn key_of(&self, record: &Record) -> Result<(Value, Option<Value>)> {
        let partition = record
            .get(&self.partition_attribute)
            .cloned()
            .ok_or_else(|| {
                MapperError::store(format!(
                    "record is missing key attribute '{}'",
                    self.partition_attribute
                ))
            })?;

        let sort = match &self.sort_attribute {
            Some(attr) => Some(record.get(attr).cloned().ok_or_else(|| {
                MapperError::store(format!("record is missing key attribute '{attr}'"))
            })?),
            None => None,
        };

        Ok((partition, sort))
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn query(&self, query: &Query) -> Result<Vec<Record>> {
        if query.index().is_some() {
            return Err(MapperError::store(
                "secondary indexes are not supported by the in-memory store",
            ));
        }

        let Some(table) = self.tables.get(query.table()) else {
            return Ok(Vec::new());
        };

        let matched = table.iter().filter(|r| query.matches(r)).cloned();
        Ok(match query.limit() {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        })
    }

    async fn batch_write(&self, table: &str, batch: Vec<Record>) -> Result<()> {
        if let Some(fault) = self.faults.get(table) {
            if batch.iter().any(|r| fault.value()(r)) {
                return Err(MapperError::store("injected write fault"));
            }
        }

        // 先校验整批主键，保证批次要么全部写入、要么全部不写
        let keyed = batch
            .into_iter()
            .map(|r| self.key_of(&r).map(|k| (k, r)))
            .collect::<Result<Vec<_>>>()?;

        let mut stored = self.tables.entry(table.to_string()).or_default();
        for (key, record) in keyed {
            let existing = stored
                .iter()
                .position(|r| self.key_of(r).ok().as_ref() == Some(&key));
            match existing {
                Some(pos) => stored[pos] = record,
                None => stored.push(record),
            }
        }

        Ok(())
    }
}
