//! 表映射客户端（TableMapper）
//!
//! 把读写路径与存储协作方串起来：
//! - `load`：查询 → 分区聚合 → 装配根对象；
//! - `query_many`：查询 → 分区聚合 → 扁平解码 `T` 的全部记录；
//! - `write_all`：展开根对象 → 分批 → 有界并发写入，逐批汇报结果。
//!
use crate::{
    batch::BatchPlanner,
    config::MapperConfig,
    error::{MapperError, MapperResult as Result},
    partition::{Partition, PartitionAggregator},
    record::Record,
    registry::Registry,
    store::{Query, TableStore},
    transform::{DomainTransformer, PartitionTransformer},
};
use bon::Builder;
use futures_util::{StreamExt, stream};
use std::sync::Arc;

/// 单批写入结果
#[derive(Debug)]
pub struct BatchOutcome {
    /// 批次序号（从 0 开始，与分批顺序一致）
    pub index: usize,
    /// 批内记录数
    pub size: usize,
    pub result: Result<()>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 一次 `write_all` 的全部批次结果（按批次顺序）
#[derive(Debug)]
pub struct WriteReport {
    table: String,
    outcomes: Vec<BatchOutcome>,
}

impl WriteReport {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    /// 所有批次均写入成功（空写入亦视为完成）
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(BatchOutcome::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// 成功写入的记录数
    pub fn written_records(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.size)
            .sum()
    }

    /// 存在失败批次时，以第一个失败批次转换为 `MapperError::BatchWrite`
    pub fn into_result(self) -> Result<WriteReport> {
        let first_failure = self.outcomes.iter().find_map(|o| match &o.result {
            Ok(()) => None,
            Err(e) => Some((o.index, e.to_string())),
        });

        match first_failure {
            Some((batch, reason)) => Err(MapperError::BatchWrite {
                table: self.table,
                batch,
                reason,
            }),
            None => Ok(self),
        }
    }
}

/// 表映射客户端
#[derive(Builder)]
pub struct TableMapper {
    store: Arc<dyn TableStore>,
    #[builder(into)]
    registry: Arc<Registry>,
    #[builder(default)]
    config: MapperConfig,
}

impl TableMapper {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// 查询分区并装配为 `T`
    #[tracing::instrument(
        skip_all,
        fields(root = std::any::type_name::<T>(), table = query.table())
    )]
    pub async fn load<T: 'static>(&self, query: &Query) -> Result<T> {
        let partition = self.fetch_partition(query).await?;
        PartitionTransformer::new(&self.registry).transform::<T>(&partition)
    }

    /// 查询分区并返回其中 `T` 的全部实例；其他判别值的记录被忽略
    #[tracing::instrument(
        skip_all,
        fields(item = std::any::type_name::<T>(), table = query.table())
    )]
    pub async fn query_many<T: 'static>(&self, query: &Query) -> Result<Vec<T>> {
        let partition = self.fetch_partition(query).await?;
        PartitionTransformer::new(&self.registry).instances::<T>(&partition)
    }

    /// 展开根对象并分批写入 `table`；根可以是已注册类型的 `Vec`，未注册的根在写入前报错
    #[tracing::instrument(skip_all, fields(root = std::any::type_name::<T>(), table = table))]
    pub async fn write_all<T: 'static>(&self, root: &T, table: &str) -> Result<WriteReport> {
        self.config.validate()?;
        let records = DomainTransformer::new(&self.registry, &self.config.discriminator_attribute)
            .transform(root)?;
        self.dispatch(records, table).await
    }

    /// 写入同构集合；仅具有判别值的元素会被写入
    #[tracing::instrument(skip_all, fields(item = std::any::type_name::<T>(), table = table))]
    pub async fn write_all_items<T: 'static>(
        &self,
        items: &[T],
        table: &str,
    ) -> Result<WriteReport> {
        self.config.validate()?;
        let records = DomainTransformer::new(&self.registry, &self.config.discriminator_attribute)
            .transform_collection(items)?;
        self.dispatch(records, table).await
    }

    async fn fetch_partition(&self, query: &Query) -> Result<Partition> {
        let records = self.store.query(query).await?;
        tracing::debug!(records = records.len(), "query returned");
        PartitionAggregator::aggregate(&self.config.discriminator_attribute, records)
    }

    /// 所有批次都会被尝试；单批失败不影响其他批次
    async fn dispatch(&self, records: Vec<Record>, table: &str) -> Result<WriteReport> {
        let batches = BatchPlanner::plan(records, self.config.batch_size)?;
        let total = batches.len();

        let outcomes: Vec<BatchOutcome> = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| async move {
                let size = batch.len();
                let result = self.store.batch_write(table, batch).await;
                if let Err(e) = &result {
                    tracing::warn!(table, batch = index, size, error = %e, "batch write failed");
                }
                BatchOutcome {
                    index,
                    size,
                    result,
                }
            })
            .buffered(self.config.write_concurrency)
            .collect()
            .await;

        let report = WriteReport {
            table: table.to_string(),
            outcomes,
        };
        tracing::debug!(
            batches = total,
            written = report.written_records(),
            complete = report.is_complete(),
            "write finished"
        );
        Ok(report)
    }
}
