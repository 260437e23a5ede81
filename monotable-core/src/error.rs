//! 映射层统一错误定义
//!
//! 覆盖注册、读路径（分区 → 聚合根）、写路径（聚合根 → 记录）与存储协作方四类失败，
//! 每个变体都携带出错的类型名/字段名，便于在上层直接定位到具体模型。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MapperError {
    // --- 注册 ---
    #[error("registration error: type={type_name}, reason={reason}")]
    Registration {
        type_name: &'static str,
        reason: String,
    },
    #[error(
        "ambiguous relation: type={type_name}, discriminator={discriminator}, fields=[{first_field}, {second_field}]"
    )]
    AmbiguousRelation {
        type_name: &'static str,
        discriminator: String,
        first_field: &'static str,
        second_field: &'static str,
    },
    #[error("type not registered: {type_name}")]
    UnregisteredType { type_name: &'static str },

    // --- 分区聚合 ---
    #[error("record #{index} has no string discriminator attribute '{attribute}'")]
    MissingDiscriminator { attribute: String, index: usize },
    #[error("duplicate aggregate in partition: discriminator={discriminator}")]
    DuplicateAggregate { discriminator: String },

    // --- 读路径 ---
    #[error("missing root record: type={type_name}, discriminator={discriminator}")]
    MissingRootRecord {
        type_name: &'static str,
        discriminator: String,
    },
    #[error(
        "ambiguous root record: type={type_name}, discriminator={discriminator}, count={count}"
    )]
    AmbiguousRootRecord {
        type_name: &'static str,
        discriminator: String,
        count: usize,
    },
    #[error(
        "ambiguous relation record: type={type_name}, field={field}, discriminator={discriminator}, count={count}"
    )]
    AmbiguousRelationRecord {
        type_name: &'static str,
        field: &'static str,
        discriminator: String,
        count: usize,
    },
    #[error("type is not a stored item: {type_name}")]
    NotAnItem { type_name: &'static str },
    #[error("decode error: type={type_name}, reason={reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },
    #[error("assignment error: type={type_name}, field={field}, reason={reason}")]
    Assignment {
        type_name: &'static str,
        field: &'static str,
        reason: String,
    },

    // --- 写路径 ---
    #[error("encode error: type={type_name}, reason={reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },
    #[error("batch write failed: table={table}, batch={batch}, reason={reason}")]
    BatchWrite {
        table: String,
        batch: usize,
        reason: String,
    },

    // --- 存储/配置 ---
    #[error("store error: {reason}")]
    Store { reason: String },
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl MapperError {
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    /// 是否为注册阶段的错误（启动期即应暴露）
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::Registration { .. } | Self::AmbiguousRelation { .. } | Self::UnregisteredType { .. }
        )
    }
}

/// 统一 Result 类型别名
pub type MapperResult<T> = Result<T, MapperError>;
