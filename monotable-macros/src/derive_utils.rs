use quote::ToTokens;
use syn::{Attribute, Path, Result, Token, punctuated::Punctuated};

// 拆分出 derive 列表与其他属性
fn split_derives(attrs: &[Attribute]) -> Result<(Vec<Attribute>, Vec<Path>)> {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("derive") {
            let list =
                attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
            existing.extend(list);
        } else {
            retained.push(attr.clone());
        }
    }
    Ok((retained, existing))
}

// 归一化 derive 名称，避免 Serialize 与 serde::Serialize 重复派生
fn derive_key(p: &Path) -> String {
    match p.segments.last() {
        Some(last) => match last.ident.to_string().as_str() {
            name @ ("Serialize" | "Deserialize") => format!("serde::{name}"),
            name => name.to_string(),
        },
        None => p.to_token_stream().to_string(),
    }
}

/// 合并所需派生与用户已有派生（去重，所需派生在前），合并后的 derive 置于属性首位
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) -> Result<()> {
    let (retained, existing) = split_derives(attrs)?;

    let mut seen = std::collections::HashSet::<String>::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    let derive: Attribute = syn::parse_quote!(#[derive(#(#merged),*)]);
    *attrs = std::iter::once(derive).chain(retained).collect();
    Ok(())
}
