//! 转换（transform）
//!
//! 读写两条路径：
//! - 读：`PartitionTransformer` 将分区装配为聚合根实例；
//! - 写：`DomainTransformer` 将聚合根的关系图展开为有序记录列表。
//!
//! 两者均为纯同步计算，不做任何 I/O，只依赖冻结后的 `Registry`。
//!
mod read;
mod write;

pub use read::PartitionTransformer;
pub use write::DomainTransformer;
