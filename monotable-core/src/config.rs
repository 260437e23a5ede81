//! 映射配置
//!
//! 仅定义配置结构与校验；从文件/环境变量加载由宿主程序负责，
//! 结构体可直接通过 serde 反序列化，缺省字段取默认值。
//!
use crate::{
    batch::DEFAULT_BATCH_SIZE,
    error::{MapperError, MapperResult as Result},
};
use bon::Builder;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DISCRIMINATOR_ATTRIBUTE: &str = "ItemType";

/// 映射配置
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// 承载判别值的属性名
    #[builder(into, default = DEFAULT_DISCRIMINATOR_ATTRIBUTE.to_string())]
    pub discriminator_attribute: String,
    /// 单批写入的记录数上限
    #[builder(default = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// 同时在途的批次数
    #[builder(default = 4)]
    pub write_concurrency: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MapperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.discriminator_attribute.is_empty() {
            return Err(MapperError::InvalidConfig {
                reason: "discriminator_attribute must not be empty".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(MapperError::InvalidConfig {
                reason: "batch_size must be > 0".into(),
            });
        }
        if self.write_concurrency == 0 {
            return Err(MapperError::InvalidConfig {
                reason: "write_concurrency must be > 0".into(),
            });
        }
        Ok(())
    }
}
