//! 写路径：聚合根 → 有序记录
//!
//! 按关系声明顺序递归展开子对象，一对多关系内保持集合顺序；若根自身为存储项，
//! 其记录追加在全部子记录之后。集合根仅保留具有判别值的元素，其余静默丢弃。
//!
use crate::{
    error::{MapperError, MapperResult as Result},
    record::Record,
    registry::{Registry, TypeDescriptor},
};
use std::any::Any;

/// 领域对象转换器
pub struct DomainTransformer<'r> {
    registry: &'r Registry,
    discriminator_attr: &'r str,
}

impl<'r> DomainTransformer<'r> {
    pub fn new(registry: &'r Registry, discriminator_attr: &'r str) -> Self {
        Self {
            registry,
            discriminator_attr,
        }
    }

    /// 展开根对象
    /// - 已注册类型：按关系递归展开；
    /// - 已注册类型 `T` 的 `Vec<T>`：按集合根处理，等同 `transform_collection`；
    /// - 其他类型返回 `UnregisteredType`。
    pub fn transform<T: 'static>(&self, root: &T) -> Result<Vec<Record>> {
        let root: &dyn Any = root;

        if let Some(descriptor) = self.registry.descriptor_of(root.type_id()) {
            let mut records = Vec::new();
            self.collect(descriptor, root, &mut records)?;
            return Ok(records);
        }

        if let Some(collection) = self.registry.collection_of(root.type_id()) {
            return self.transform_objects(collection.elements(root));
        }

        Err(MapperError::UnregisteredType {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// 展开同构集合
    pub fn transform_collection<T: 'static>(&self, items: &[T]) -> Result<Vec<Record>> {
        self.transform_objects(items.iter().map(|item| item as &dyn Any))
    }

    /// 展开任意对象序列：仅编码运行时类型具有判别值的元素，其余丢弃
    pub fn transform_objects<'a, I>(&self, items: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = &'a dyn Any>,
    {
        let mut records = Vec::new();
        let mut dropped = 0usize;

        for item in items {
            match self.registry.descriptor_of(item.type_id()) {
                Some(descriptor) if descriptor.has_discriminator() => {
                    records.push(self.own_record(descriptor, item)?);
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "dropped collection elements without discriminator");
        }

        Ok(records)
    }

    fn collect(
        &self,
        descriptor: &TypeDescriptor,
        value: &dyn Any,
        out: &mut Vec<Record>,
    ) -> Result<()> {
        for relation in descriptor.relations() {
            let Some(related) = self.registry.descriptor_of(relation.related_type()) else {
                continue;
            };
            for child in relation.accessor().children(value) {
                self.collect(related, child, out)?;
            }
        }

        if descriptor.has_discriminator() {
            out.push(self.own_record(descriptor, value)?);
        }

        Ok(())
    }

    /// 编码自身记录并写入判别属性
    fn own_record(&self, descriptor: &TypeDescriptor, value: &dyn Any) -> Result<Record> {
        let record = descriptor.encode(value)?;
        Ok(match descriptor.discriminator() {
            Some(d) => record.with_attribute(self.discriminator_attr, d),
            None => record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeSpec;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TwoField {
        val1: String,
        val2: i32,
    }

    #[derive(Debug, Default)]
    struct Blank;

    #[derive(Debug, Default)]
    struct NonItemRoot {
        members: Vec<TwoField>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct ItemRoot {
        example: String,
        #[serde(skip)]
        members: Vec<TwoField>,
    }

    fn registry() -> Registry {
        let mut builder = Registry::builder();
        builder
            .register(TypeSpec::<Blank>::container())
            .unwrap()
            .register(TypeSpec::<TwoField>::item("TwoField"))
            .unwrap()
            .register(TypeSpec::<NonItemRoot>::container().many::<TwoField>(
                "members",
                |r| r.members.as_slice(),
                |r, v| r.members = v,
            ))
            .unwrap()
            .register(TypeSpec::<ItemRoot>::item("Root").many::<TwoField>(
                "members",
                |r| r.members.as_slice(),
                |r, v| r.members = v,
            ))
            .unwrap();
        builder.build().unwrap()
    }

    fn members() -> Vec<TwoField> {
        vec![
            TwoField {
                val1: "A".into(),
                val2: 1,
            },
            TwoField {
                val1: "B".into(),
                val2: 2,
            },
        ]
    }

    #[test]
    fn blank_container_yields_nothing() {
        let registry = registry();
        let records = DomainTransformer::new(&registry, "ItemType")
            .transform(&Blank)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn container_yields_only_children() {
        let registry = registry();
        let root = NonItemRoot { members: members() };
        let records = DomainTransformer::new(&registry, "ItemType")
            .transform(&root)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("val1"), Some(&json!("A")));
        assert_eq!(records[1].get("val2"), Some(&json!(2)));
        assert!(
            records
                .iter()
                .all(|r| r.discriminator("ItemType") == Some("TwoField"))
        );
    }

    #[test]
    fn item_root_is_written_after_children() {
        let registry = registry();
        let root = ItemRoot {
            example: "C".into(),
            members: members(),
        };
        let records = DomainTransformer::new(&registry, "ItemType")
            .transform(&root)
            .unwrap();
        let types: Vec<_> = records
            .iter()
            .map(|r| r.discriminator("ItemType").unwrap_or_default())
            .collect();
        assert_eq!(types, vec!["TwoField", "TwoField", "Root"]);
        assert_eq!(records[2].get("example"), Some(&json!("C")));
        assert!(records[2].get("members").is_none());
    }

    #[test]
    fn collection_keeps_only_discriminated_elements() {
        let registry = registry();
        let transformer = DomainTransformer::new(&registry, "ItemType");

        let records = transformer.transform_collection(&members()).unwrap();
        assert_eq!(records.len(), 2);

        let blanks = transformer.transform_collection(&[Blank, Blank]).unwrap();
        assert!(blanks.is_empty());

        let list = members();
        let mixed: Vec<&dyn Any> = vec![
            &list[0] as &dyn Any,
            &Blank as &dyn Any,
            &42_u8 as &dyn Any,
            &list[1] as &dyn Any,
        ];
        let records = transformer.transform_objects(mixed).unwrap();
        let vals: Vec<_> = records.iter().map(|r| r.get("val1").cloned()).collect();
        assert_eq!(vals, vec![Some(json!("A")), Some(json!("B"))]);
    }

    #[test]
    fn vec_root_is_written_as_collection() {
        let registry = registry();
        let transformer = DomainTransformer::new(&registry, "ItemType");

        let records = transformer.transform(&members()).unwrap();
        let vals: Vec<_> = records.iter().map(|r| r.get("val1").cloned()).collect();
        assert_eq!(vals, vec![Some(json!("A")), Some(json!("B"))]);
        assert!(
            records
                .iter()
                .all(|r| r.discriminator("ItemType") == Some("TwoField"))
        );

        let containers = transformer
            .transform(&vec![NonItemRoot { members: members() }])
            .unwrap();
        assert!(containers.is_empty());
    }

    #[test]
    fn unregistered_root_is_rejected() {
        let registry = registry();
        let transformer = DomainTransformer::new(&registry, "ItemType");

        let err = transformer
            .transform(&"not a model".to_string())
            .unwrap_err();
        assert!(matches!(err, MapperError::UnregisteredType { .. }));

        let err = transformer.transform(&vec![1_u8, 2]).unwrap_err();
        assert!(matches!(err, MapperError::UnregisteredType { .. }));
    }
}
