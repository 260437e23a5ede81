//! 单表设计映射库（monotable-core）
//!
//! 在“一张表承载多种实体类型”的存储模型与领域聚合之间做双向映射：
//! - 记录（`record`）与分区聚合（`partition`）：按判别属性把一次查询的记录分组；
//! - 类型注册表（`registry`）：启动期显式注册类型、判别值、编解码器与关系字段，随后冻结；
//! - 转换（`transform`）：读路径把分区装配为聚合根，写路径把聚合根展开为有序记录；
//! - 分批（`batch`）：按批次上限切分写入记录；
//! - 存储协作方与客户端（`store` / `client`，`client` feature）：查询、装配与分批并发写入。
//!
//! 本 crate 不绑定具体存储后端，仅定义 `TableStore` 接口，并提供内存实现用于测试与本地开发。
//!
//! 典型用法：
//! 1. 用 `#[model]` 宏（或手写 `TypeSpec`）描述类型与关系；
//! 2. 通过 `Registry::builder()` 注册全部类型并 `build` 得到只读注册表；
//! 3. 以存储实现与注册表构建 `TableMapper`，调用 `load` / `query_many` / `write_all`。
//!
pub mod batch;
#[cfg(feature = "client")]
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod partition;
pub mod record;
pub mod registry;
#[cfg(feature = "client")]
pub mod store;
pub mod transform;

pub use batch::{BatchPlanner, DEFAULT_BATCH_SIZE};
#[cfg(feature = "client")]
pub use client::{BatchOutcome, TableMapper, WriteReport};
pub use codec::{ItemCodec, SerdeCodec};
pub use config::MapperConfig;
pub use error::{MapperError, MapperResult};
pub use partition::{Aggregate, Partition, PartitionAggregator};
pub use record::Record;
pub use registry::{Cardinality, Model, Registry, RegistryBuilder, TypeDescriptor, TypeSpec};
#[cfg(feature = "client")]
pub use store::{InMemoryTableStore, Query, TableStore};
pub use transform::{DomainTransformer, PartitionTransformer};

// 允许在本 crate 内部通过 ::monotable_core 进行自引用，
// 以便 `#[model]` 宏在本 crate 的单元测试中也能解析到 ::monotable_core 路径。
extern crate self as monotable_core;
