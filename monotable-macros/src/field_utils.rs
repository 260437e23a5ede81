use syn::{Field, GenericArgument, Ident, PathArguments, Result, Type, spanned::Spanned};

/// 关系基数（宏内部表示）
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Many,
    One,
}

/// 从字段上识别出的关系声明
pub(crate) struct RelationField {
    pub(crate) ident: Ident,
    pub(crate) kind: Relation,
    /// `Vec<C>` / `Option<C>` 中的 `C`
    pub(crate) related: Type,
}

/// 解析并移除字段上的 `#[relation(..)]` 标注；非关系字段返回 `None`
pub(crate) fn take_relation(field: &mut Field) -> Result<Option<RelationField>> {
    let mut kind: Option<Relation> = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("relation") {
            continue;
        }
        if kind.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "duplicate #[relation] on this field",
            ));
        }
        let arg: Ident = attr.parse_args().map_err(|_| {
            syn::Error::new(attr.span(), "expected #[relation(many)] or #[relation(one)]")
        })?;
        let parsed = match arg.to_string().as_str() {
            "many" => Relation::Many,
            "one" => Relation::One,
            _ => {
                return Err(syn::Error::new(
                    arg.span(),
                    "unknown relation kind; expected 'many' | 'one'",
                ));
            }
        };
        kind = Some(parsed);
    }

    let Some(kind) = kind else {
        return Ok(None);
    };

    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(field.span(), "relation field must be named"))?;

    let (expected, marker) = match kind {
        Relation::Many => ("Vec", "many"),
        Relation::One => ("Option", "one"),
    };
    let related = single_generic_of(&field.ty, expected).ok_or_else(|| {
        syn::Error::new(
            field.ty.span(),
            format!("#[relation({marker})] requires a field of type {expected}<T>"),
        )
    })?;

    field.attrs.retain(|a| !a.path().is_ident("relation"));
    field.attrs.push(syn::parse_quote!(#[serde(skip)]));

    Ok(Some(RelationField {
        ident,
        kind,
        related,
    }))
}

// 取出 `Wrapper<T>` 中的 `T`；按最后一段路径名匹配，兼容 `std::vec::Vec<T>` 等写法
fn single_generic_of(ty: &Type, wrapper: &str) -> Option<Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner.clone()),
        _ => None,
    }
}
