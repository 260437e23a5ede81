use proc_macro::TokenStream;

mod derive_utils;
mod field_utils;
mod model;

/// 模型宏
/// - `#[model(discriminator = "ORDER")]`：存储项，使用给定判别值；
/// - `#[model]`：容器，自身不落库，仅承载关系字段（自动派生 `Default`）；
/// - 可选 `codec = <expr>` 为存储项指定自定义编解码器；
/// - 字段标注 `#[relation(many)]`（`Vec<C>`）或 `#[relation(one)]`（`Option<C>`）声明关系，
///   宏会移除该标注并为字段加上 `#[serde(skip)]`；
/// - 合并派生 `serde::Serialize`、`serde::Deserialize`，并实现 `::monotable_core::registry::Model`。
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model::expand(attr, item)
}
