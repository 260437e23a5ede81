//! 类型描述与注册表（TypeDescriptor / Registry）
//!
//! 每个参与映射的类型在启动期显式注册：是否为存储项（判别值）、使用的编解码器，
//! 以及按声明顺序排列的关系字段（字段名、基数、关联类型与存取函数）。
//!
//! 生命周期为“先注册、后冻结”：`RegistryBuilder` 收集注册，`build` 统一校验并产出
//! 只读的 `Registry`，此后不再允许修改，可通过 `Arc` 在多个调用方之间共享。
//!
//! 关系字段的读写不依赖运行时反射，而是由注册时提供的普通函数完成，
//! 注册表内部以 `Any` 擦除具体类型。
//!
use crate::{
    codec::{ItemCodec, SerdeCodec},
    error::{MapperError, MapperResult as Result},
    record::Record,
};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

/// 类型擦除后的实例
pub(crate) type AnyBox = Box<dyn Any + Send>;

/// 关系基数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

/// 可自描述注册信息的模型，通常由 `#[model]` 宏生成
pub trait Model: Sized + Send + Sync + 'static {
    fn type_spec() -> TypeSpec<Self>;
}

// ---------------------------------------------------------------------------
// 注册输入：TypeSpec
// ---------------------------------------------------------------------------

enum SpecKind<T> {
    Item {
        discriminator: String,
        codec: Arc<dyn ItemCodec<T>>,
    },
    Container {
        default: fn() -> T,
    },
}

/// 单个类型的注册说明
pub struct TypeSpec<T> {
    kind: SpecKind<T>,
    relations: Vec<PendingRelation>,
}

struct PendingRelation {
    field: &'static str,
    cardinality: Cardinality,
    related_type: TypeId,
    related_type_name: &'static str,
    accessor: Arc<dyn RelationAccessor>,
}

impl<T> TypeSpec<T>
where
    T: Send + Sync + 'static,
{
    /// 存储项：具有自身判别值，默认使用 `SerdeCodec`
    pub fn item(discriminator: impl Into<String>) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::item_with_codec(discriminator, SerdeCodec)
    }

    /// 存储项：使用自定义编解码器
    pub fn item_with_codec<C>(discriminator: impl Into<String>, codec: C) -> Self
    where
        C: ItemCodec<T> + 'static,
    {
        Self {
            kind: SpecKind::Item {
                discriminator: discriminator.into(),
                codec: Arc::new(codec),
            },
            relations: Vec::new(),
        }
    }

    /// 容器：自身不落库，仅承载关系字段，读路径以默认实例为根
    pub fn container() -> Self
    where
        T: Default,
    {
        Self {
            kind: SpecKind::Container {
                default: T::default,
            },
            relations: Vec::new(),
        }
    }

    /// 替换存储项的编解码器；对容器无效
    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: ItemCodec<T> + 'static,
    {
        if let SpecKind::Item { codec: slot, .. } = &mut self.kind {
            *slot = Arc::new(codec);
        }
        self
    }

    /// 声明一对多关系
    pub fn many<C>(
        mut self,
        field: &'static str,
        get: fn(&T) -> &[C],
        set: fn(&mut T, Vec<C>),
    ) -> Self
    where
        C: Send + Sync + 'static,
    {
        self.relations.push(PendingRelation {
            field,
            cardinality: Cardinality::Many,
            related_type: TypeId::of::<C>(),
            related_type_name: std::any::type_name::<C>(),
            accessor: Arc::new(ManyAccessor::<T, C> {
                get,
                set,
                _marker: PhantomData,
            }),
        });
        self
    }

    /// 声明一对一关系
    pub fn one<C>(
        mut self,
        field: &'static str,
        get: fn(&T) -> Option<&C>,
        set: fn(&mut T, C),
    ) -> Self
    where
        C: Send + Sync + 'static,
    {
        self.relations.push(PendingRelation {
            field,
            cardinality: Cardinality::One,
            related_type: TypeId::of::<C>(),
            related_type_name: std::any::type_name::<C>(),
            accessor: Arc::new(OneAccessor::<T, C> {
                get,
                set,
                _marker: PhantomData,
            }),
        });
        self
    }
}

// ---------------------------------------------------------------------------
// 类型擦除的存取器与编解码器
// ---------------------------------------------------------------------------

/// 关系字段的擦除存取器
pub(crate) trait RelationAccessor: Send + Sync {
    /// 关系字段当前持有的子对象（写路径），按集合顺序
    fn children<'a>(&self, owner: &'a dyn Any) -> Vec<&'a dyn Any>;

    /// 将解码后的子对象写入关系字段（读路径）
    fn assign(&self, owner: &mut dyn Any, values: Vec<AnyBox>) -> std::result::Result<(), String>;
}

struct ManyAccessor<T, C> {
    get: fn(&T) -> &[C],
    set: fn(&mut T, Vec<C>),
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T, C> RelationAccessor for ManyAccessor<T, C>
where
    T: 'static,
    C: 'static,
{
    fn children<'a>(&self, owner: &'a dyn Any) -> Vec<&'a dyn Any> {
        match owner.downcast_ref::<T>() {
            Some(owner) => (self.get)(owner).iter().map(|c| c as &dyn Any).collect(),
            None => Vec::new(),
        }
    }

    fn assign(&self, owner: &mut dyn Any, values: Vec<AnyBox>) -> std::result::Result<(), String> {
        let owner = owner
            .downcast_mut::<T>()
            .ok_or_else(|| format!("owner is not {}", std::any::type_name::<T>()))?;
        let children = values
            .into_iter()
            .map(|v| v.downcast::<C>().map(|c| *c))
            .collect::<std::result::Result<Vec<C>, _>>()
            .map_err(|_| format!("child is not {}", std::any::type_name::<C>()))?;
        (self.set)(owner, children);
        Ok(())
    }
}

struct OneAccessor<T, C> {
    get: fn(&T) -> Option<&C>,
    set: fn(&mut T, C),
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T, C> RelationAccessor for OneAccessor<T, C>
where
    T: 'static,
    C: 'static,
{
    fn children<'a>(&self, owner: &'a dyn Any) -> Vec<&'a dyn Any> {
        owner
            .downcast_ref::<T>()
            .and_then(|owner| (self.get)(owner))
            .map(|c| vec![c as &dyn Any])
            .unwrap_or_default()
    }

    fn assign(&self, owner: &mut dyn Any, values: Vec<AnyBox>) -> std::result::Result<(), String> {
        if values.len() != 1 {
            return Err(format!("expected exactly one value, got {}", values.len()));
        }
        let owner = owner
            .downcast_mut::<T>()
            .ok_or_else(|| format!("owner is not {}", std::any::type_name::<T>()))?;
        let child = values
            .into_iter()
            .next()
            .and_then(|v| v.downcast::<C>().ok())
            .ok_or_else(|| format!("child is not {}", std::any::type_name::<C>()))?;
        (self.set)(owner, *child);
        Ok(())
    }
}

/// 擦除后的编解码器
pub(crate) trait ErasedCodec: Send + Sync {
    fn decode(&self, record: &Record) -> Result<AnyBox>;
    fn encode(&self, value: &dyn Any) -> Result<Record>;
}

struct CodecAdapter<T> {
    inner: Arc<dyn ItemCodec<T>>,
}

impl<T> ErasedCodec for CodecAdapter<T>
where
    T: Send + 'static,
{
    fn decode(&self, record: &Record) -> Result<AnyBox> {
        let value = self.inner.decode(record)?;
        Ok(Box::new(value))
    }

    fn encode(&self, value: &dyn Any) -> Result<Record> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(|| MapperError::Encode {
                type_name: std::any::type_name::<T>(),
                reason: "value type mismatch".to_string(),
            })?;
        self.inner.encode(value)
    }
}

// ---------------------------------------------------------------------------
// 冻结后的描述：TypeDescriptor / RelationDescriptor
// ---------------------------------------------------------------------------

/// 关系描述
#[derive(Clone)]
pub struct RelationDescriptor {
    field: &'static str,
    cardinality: Cardinality,
    related_type: TypeId,
    related_type_name: &'static str,
    related_discriminator: String,
    accessor: Arc<dyn RelationAccessor>,
}

impl RelationDescriptor {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn related_type(&self) -> TypeId {
        self.related_type
    }

    pub fn related_type_name(&self) -> &'static str {
        self.related_type_name
    }

    pub fn related_discriminator(&self) -> &str {
        &self.related_discriminator
    }

    pub(crate) fn accessor(&self) -> &dyn RelationAccessor {
        self.accessor.as_ref()
    }
}

impl fmt::Debug for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDescriptor")
            .field("field", &self.field)
            .field("cardinality", &self.cardinality)
            .field("related_type", &self.related_type_name)
            .field("related_discriminator", &self.related_discriminator)
            .finish()
    }
}

/// 类型描述
pub struct TypeDescriptor {
    type_name: &'static str,
    type_id: TypeId,
    discriminator: Option<String>,
    codec: Option<Arc<dyn ErasedCodec>>,
    default: Option<Arc<dyn Fn() -> AnyBox + Send + Sync>>,
    relations: Vec<RelationDescriptor>,
}

impl TypeDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn has_discriminator(&self) -> bool {
        self.discriminator.is_some()
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    pub fn is_container(&self) -> bool {
        self.discriminator.is_none()
    }

    pub(crate) fn decode(&self, record: &Record) -> Result<AnyBox> {
        match &self.codec {
            Some(codec) => codec.decode(record),
            None => Err(MapperError::NotAnItem {
                type_name: self.type_name,
            }),
        }
    }

    pub(crate) fn encode(&self, value: &dyn Any) -> Result<Record> {
        match &self.codec {
            Some(codec) => codec.encode(value),
            None => Err(MapperError::NotAnItem {
                type_name: self.type_name,
            }),
        }
    }

    pub(crate) fn default_instance(&self) -> Option<AnyBox> {
        self.default.as_ref().map(|f| f())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("discriminator", &self.discriminator)
            .field("relations", &self.relations)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// 集合根：`Vec<T>` 的元素视图
// ---------------------------------------------------------------------------

/// 把 `Vec<T>` 根展开为逐个元素
pub(crate) trait CollectionAccessor: Send + Sync {
    fn elements<'a>(&self, collection: &'a dyn Any) -> Vec<&'a dyn Any>;
}

struct VecAccessor<T>(PhantomData<fn() -> T>);

impl<T: 'static> CollectionAccessor for VecAccessor<T> {
    fn elements<'a>(&self, collection: &'a dyn Any) -> Vec<&'a dyn Any> {
        collection
            .downcast_ref::<Vec<T>>()
            .map(|items| items.iter().map(|item| item as &dyn Any).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// 注册与冻结
// ---------------------------------------------------------------------------

struct Registration {
    type_name: &'static str,
    type_id: TypeId,
    discriminator: Option<String>,
    codec: Option<Arc<dyn ErasedCodec>>,
    default: Option<Arc<dyn Fn() -> AnyBox + Send + Sync>>,
    relations: Vec<PendingRelation>,
}

/// 注册期构建器
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
    index: HashMap<TypeId, usize>,
    collections: HashMap<TypeId, Arc<dyn CollectionAccessor>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个类型；同一类型重复注册视为错误
    pub fn register<T>(&mut self, spec: TypeSpec<T>) -> Result<&mut Self>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        if self.index.contains_key(&type_id) {
            return Err(MapperError::Registration {
                type_name,
                reason: "type registered twice".to_string(),
            });
        }

        let (discriminator, codec, default) = match spec.kind {
            SpecKind::Item {
                discriminator,
                codec,
            } => {
                let erased: Arc<dyn ErasedCodec> = Arc::new(CodecAdapter { inner: codec });
                (Some(discriminator), Some(erased), None)
            }
            SpecKind::Container { default } => {
                let erased: Arc<dyn Fn() -> AnyBox + Send + Sync> =
                    Arc::new(move || Box::new(default()) as AnyBox);
                (None, None, Some(erased))
            }
        };

        self.index.insert(type_id, self.registrations.len());
        self.registrations.push(Registration {
            type_name,
            type_id,
            discriminator,
            codec,
            default,
            relations: spec.relations,
        });
        self.collections.insert(
            TypeId::of::<Vec<T>>(),
            Arc::new(VecAccessor::<T>(PhantomData)),
        );

        Ok(self)
    }

    /// 注册实现了 `Model` 的类型
    pub fn register_model<T: Model>(&mut self) -> Result<&mut Self> {
        self.register(T::type_spec())
    }

    /// 校验并冻结
    pub fn build(self) -> Result<Registry> {
        let mut by_discriminator: HashMap<String, usize> = HashMap::new();
        for (slot, reg) in self.registrations.iter().enumerate() {
            if let Some(d) = &reg.discriminator {
                if let Some(&other) = by_discriminator.get(d) {
                    return Err(MapperError::Registration {
                        type_name: reg.type_name,
                        reason: format!(
                            "discriminator '{d}' already used by {}",
                            self.registrations[other].type_name
                        ),
                    });
                }
                by_discriminator.insert(d.clone(), slot);
            }
        }

        let mut descriptors = Vec::with_capacity(self.registrations.len());
        for reg in &self.registrations {
            let relations = self.resolve_relations(reg)?;
            descriptors.push(TypeDescriptor {
                type_name: reg.type_name,
                type_id: reg.type_id,
                discriminator: reg.discriminator.clone(),
                codec: reg.codec.clone(),
                default: reg.default.clone(),
                relations,
            });
        }

        tracing::debug!(types = descriptors.len(), "type registry frozen");

        Ok(Registry {
            descriptors,
            index: self.index,
            by_discriminator,
            collections: self.collections,
        })
    }

    fn resolve_relations(&self, reg: &Registration) -> Result<Vec<RelationDescriptor>> {
        let mut resolved: Vec<RelationDescriptor> = Vec::with_capacity(reg.relations.len());

        for rel in &reg.relations {
            if resolved.iter().any(|r| r.field == rel.field) {
                return Err(MapperError::Registration {
                    type_name: reg.type_name,
                    reason: format!("relation field '{}' declared twice", rel.field),
                });
            }

            let Some(&slot) = self.index.get(&rel.related_type) else {
                return Err(MapperError::Registration {
                    type_name: reg.type_name,
                    reason: format!(
                        "relation '{}' targets unregistered type {}",
                        rel.field, rel.related_type_name
                    ),
                });
            };

            let Some(discriminator) = self.registrations[slot].discriminator.clone() else {
                return Err(MapperError::Registration {
                    type_name: reg.type_name,
                    reason: format!(
                        "relation '{}' targets {} which has no discriminator",
                        rel.field, rel.related_type_name
                    ),
                });
            };

            if reg.discriminator.as_deref() == Some(discriminator.as_str()) {
                return Err(MapperError::Registration {
                    type_name: reg.type_name,
                    reason: format!(
                        "relation '{}' resolves to the type's own discriminator '{discriminator}'",
                        rel.field
                    ),
                });
            }

            if let Some(first) = resolved
                .iter()
                .find(|r| r.related_discriminator == discriminator)
            {
                return Err(MapperError::AmbiguousRelation {
                    type_name: reg.type_name,
                    discriminator,
                    first_field: first.field,
                    second_field: rel.field,
                });
            }

            resolved.push(RelationDescriptor {
                field: rel.field,
                cardinality: rel.cardinality,
                related_type: rel.related_type,
                related_type_name: rel.related_type_name,
                related_discriminator: discriminator,
                accessor: rel.accessor.clone(),
            });
        }

        Ok(resolved)
    }
}

/// 冻结后的只读注册表
pub struct Registry {
    descriptors: Vec<TypeDescriptor>,
    index: HashMap<TypeId, usize>,
    by_discriminator: HashMap<String, usize>,
    collections: HashMap<TypeId, Arc<dyn CollectionAccessor>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn descriptor<T: 'static>(&self) -> Result<&TypeDescriptor> {
        self.descriptor_of(TypeId::of::<T>())
            .ok_or(MapperError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })
    }

    pub fn descriptor_of(&self, type_id: TypeId) -> Option<&TypeDescriptor> {
        self.index.get(&type_id).map(|&slot| &self.descriptors[slot])
    }

    /// 已注册类型 `T` 对应的 `Vec<T>` 元素视图
    pub(crate) fn collection_of(&self, type_id: TypeId) -> Option<&dyn CollectionAccessor> {
        self.collections.get(&type_id).map(|accessor| accessor.as_ref())
    }

    pub fn by_discriminator(&self, discriminator: &str) -> Option<&TypeDescriptor> {
        self.by_discriminator
            .get(discriminator)
            .map(|&slot| &self.descriptors[slot])
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(TypeDescriptor::type_name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}
