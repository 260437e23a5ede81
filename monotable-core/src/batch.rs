//! 批次规划（BatchPlanner）
//!
//! 将有序记录切分为连续、不超过批大小的批次，最后一批可以更小。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    record::Record,
};

/// 单次批量写入的记录数上限（存储接口的硬性限制）
pub const DEFAULT_BATCH_SIZE: usize = 25;

pub struct BatchPlanner;

impl BatchPlanner {
    pub fn plan(records: Vec<Record>, batch_size: usize) -> Result<Vec<Vec<Record>>> {
        if batch_size == 0 {
            return Err(MapperError::InvalidConfig {
                reason: "batch_size must be > 0".into(),
            });
        }

        let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            batches.push(records.by_ref().take(batch_size).collect());
        }
        Ok(batches)
    }
}
