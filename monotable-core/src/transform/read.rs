//! 读路径：分区 → 聚合根
//!
//! 1. 目标类型有判别值时，分区内必须恰好存在一条对应记录，解码为根实例；
//!    否则以默认实例为根；
//! 2. 逐个关系字段查找同判别值的聚合，解码其中全部记录；缺失则保持未赋值；
//! 3. 所有解码完成后再统一写入根实例，任一环节失败整个根实例被丢弃。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    partition::Partition,
    registry::{AnyBox, Cardinality, Registry, RelationDescriptor, TypeDescriptor},
};
use std::any::Any;

/// 待写入的关系字段
struct PendingAssignment<'d> {
    relation: &'d RelationDescriptor,
    values: Vec<AnyBox>,
}

/// 瞬态聚合根：根实例 + 待原子写入的关系字段
struct AggregateRoot<'d> {
    descriptor: &'d TypeDescriptor,
    root: AnyBox,
    pending: Vec<PendingAssignment<'d>>,
}

impl<'d> AggregateRoot<'d> {
    fn new(descriptor: &'d TypeDescriptor, root: AnyBox) -> Self {
        Self {
            descriptor,
            root,
            pending: Vec::new(),
        }
    }

    fn stage(&mut self, relation: &'d RelationDescriptor, values: Vec<AnyBox>) {
        self.pending.push(PendingAssignment { relation, values });
    }

    /// 依次写入全部关系字段；失败时根实例随 `self` 一并丢弃，调用方不可见
    fn apply(mut self) -> Result<AnyBox> {
        for PendingAssignment { relation, values } in self.pending {
            let owner: &mut dyn Any = &mut *self.root;
            relation
                .accessor()
                .assign(owner, values)
                .map_err(|reason| MapperError::Assignment {
                    type_name: self.descriptor.type_name(),
                    field: relation.field(),
                    reason,
                })?;
        }
        Ok(self.root)
    }
}

/// 分区转换器
pub struct PartitionTransformer<'r> {
    registry: &'r Registry,
}

impl<'r> PartitionTransformer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// 将分区装配为 `T` 的实例
    pub fn transform<T: 'static>(&self, partition: &Partition) -> Result<T> {
        let descriptor = self.registry.descriptor::<T>()?;
        let root = self.transform_with(partition, descriptor)?;

        root.downcast::<T>()
            .map(|root| *root)
            .map_err(|_| MapperError::Assignment {
                type_name: descriptor.type_name(),
                field: "<root>",
                reason: "root instance has an unexpected type".to_string(),
            })
    }

    /// 按给定描述装配根实例（类型擦除版本）
    pub fn transform_with(
        &self,
        partition: &Partition,
        descriptor: &TypeDescriptor,
    ) -> Result<Box<dyn Any + Send>> {
        let root = self.root_instance(partition, descriptor)?;
        let mut aggregate_root = AggregateRoot::new(descriptor, root);

        for relation in descriptor.relations() {
            let Some(aggregate) = partition.find(relation.related_discriminator()) else {
                tracing::debug!(
                    root = descriptor.type_name(),
                    field = relation.field(),
                    discriminator = relation.related_discriminator(),
                    "relation has no records, left unset"
                );
                continue;
            };

            if relation.cardinality() == Cardinality::One && aggregate.len() > 1 {
                return Err(MapperError::AmbiguousRelationRecord {
                    type_name: descriptor.type_name(),
                    field: relation.field(),
                    discriminator: relation.related_discriminator().to_string(),
                    count: aggregate.len(),
                });
            }

            let related = self
                .registry
                .descriptor_of(relation.related_type())
                .ok_or(MapperError::UnregisteredType {
                    type_name: relation.related_type_name(),
                })?;

            let values = aggregate
                .records()
                .iter()
                .map(|record| related.decode(record))
                .collect::<Result<Vec<_>>>()?;

            tracing::debug!(
                root = descriptor.type_name(),
                field = relation.field(),
                records = values.len(),
                "relation matched"
            );

            aggregate_root.stage(relation, values);
        }

        aggregate_root.apply()
    }

    /// 将分区中 `T` 对应的聚合扁平解码为列表（不装配关系）
    pub fn instances<T: 'static>(&self, partition: &Partition) -> Result<Vec<T>> {
        let descriptor = self.registry.descriptor::<T>()?;
        let Some(discriminator) = descriptor.discriminator() else {
            return Err(MapperError::NotAnItem {
                type_name: descriptor.type_name(),
            });
        };

        let Some(aggregate) = partition.find(discriminator) else {
            return Ok(Vec::new());
        };

        aggregate
            .records()
            .iter()
            .map(|record| {
                descriptor.decode(record)?.downcast::<T>().map(|v| *v).map_err(|_| {
                    MapperError::Decode {
                        type_name: descriptor.type_name(),
                        reason: "decoded value has an unexpected type".to_string(),
                    }
                })
            })
            .collect()
    }

    fn root_instance(&self, partition: &Partition, descriptor: &TypeDescriptor) -> Result<AnyBox> {
        let Some(discriminator) = descriptor.discriminator() else {
            return descriptor
                .default_instance()
                .ok_or(MapperError::NotAnItem {
                    type_name: descriptor.type_name(),
                });
        };

        let Some(aggregate) = partition.find(discriminator) else {
            return Err(MapperError::MissingRootRecord {
                type_name: descriptor.type_name(),
                discriminator: discriminator.to_string(),
            });
        };

        match aggregate.records() {
            [record] => descriptor.decode(record),
            records => Err(MapperError::AmbiguousRootRecord {
                type_name: descriptor.type_name(),
                discriminator: discriminator.to_string(),
                count: records.len(),
            }),
        }
    }
}
