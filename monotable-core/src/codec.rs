//! 记录编解码（ItemCodec）
//!
//! 负责“单个类型实例 ↔ 单条记录”的转换。默认实现 `SerdeCodec` 通过 `serde_json`
//! 在结构体与属性映射之间转换；关系字段应标注 `#[serde(skip)]`，由转换器负责装配。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    record::Record,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// 单类型编解码器
pub trait ItemCodec<T>: Send + Sync {
    /// 由记录构造实例；形状不匹配时返回 `MapperError::Decode`
    fn decode(&self, record: &Record) -> Result<T>;

    /// 将实例编码为记录（不含判别属性，由写路径补齐）
    fn encode(&self, value: &T) -> Result<Record>;
}

/// 基于 serde 的默认编解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeCodec;

impl<T> ItemCodec<T> for SerdeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn decode(&self, record: &Record) -> Result<T> {
        serde_json::from_value(Value::Object(record.attributes().clone())).map_err(|e| {
            MapperError::Decode {
                type_name: std::any::type_name::<T>(),
                reason: e.to_string(),
            }
        })
    }

    fn encode(&self, value: &T) -> Result<Record> {
        let encoded = serde_json::to_value(value).map_err(|e| MapperError::Encode {
            type_name: std::any::type_name::<T>(),
            reason: e.to_string(),
        })?;

        match encoded {
            Value::Object(attributes) => Ok(Record::new(attributes)),
            other => Err(MapperError::Encode {
                type_name: std::any::type_name::<T>(),
                reason: format!("expected an object, found {}", kind(&other)),
            }),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TwoField {
        val1: String,
        val2: i32,
        #[serde(skip)]
        members: Vec<String>,
    }

    #[test]
    fn decode_encode_is_stable() {
        let x = TwoField {
            val1: "A".into(),
            val2: 1,
            members: vec![],
        };
        let record = SerdeCodec.encode(&x).unwrap();
        assert_eq!(record.get("val1"), Some(&json!("A")));
        assert!(record.get("members").is_none());

        let back: TwoField = SerdeCodec.decode(&record).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn decode_ignores_foreign_attributes() {
        let record: Record = [
            ("ItemType", json!("TwoField")),
            ("val1", json!("B")),
            ("val2", json!(2)),
        ]
        .into_iter()
        .collect();
        let x: TwoField = SerdeCodec.decode(&record).unwrap();
        assert_eq!(x.val1, "B");
        assert_eq!(x.val2, 2);
    }

    #[test]
    fn shape_mismatch_is_a_decode_error() {
        let record: Record = [("val1", json!(7))].into_iter().collect();
        let err = ItemCodec::<TwoField>::decode(&SerdeCodec, &record).unwrap_err();
        match err {
            MapperError::Decode { type_name, .. } => assert!(type_name.ends_with("TwoField")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_object_values_cannot_be_encoded() {
        let err = SerdeCodec.encode(&42_i32).unwrap_err();
        match err {
            MapperError::Encode { reason, .. } => assert!(reason.contains("number")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
