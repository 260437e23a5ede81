//! 存储记录（Record）
//!
//! 单表中的一条原始记录：属性名到属性值的不可变映射。属性值以 `serde_json::Value`
//! 表达，具体存储后端的类型编码（如字符串/数字/二进制）由存储适配层负责转换。
//!
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 单条存储记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attributes: Map<String, Value>,
}

impl Record {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// 读取判别属性的字符串值；缺失或非字符串时返回 `None`
    pub fn discriminator(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).and_then(Value::as_str)
    }

    /// 返回追加（或覆盖）了一个属性的新记录
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

impl From<Map<String, Value>> for Record {
    fn from(attributes: Map<String, Value>) -> Self {
        Self::new(attributes)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
