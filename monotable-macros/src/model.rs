use crate::derive_utils::apply_derives;
use crate::field_utils::{Relation, RelationField, take_relation};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Expr, Ident, Item, ItemStruct, LitStr, Result, Token, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[model] 宏实现
/// - 带 `discriminator` 时生成 `TypeSpec::item`（或 `item_with_codec`），否则生成 `TypeSpec::container`；
/// - 关系按字段声明顺序注册，存取函数以具名函数生成。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ModelAttrConfig);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[model] only on struct")
                .to_compile_error()
                .into();
        }
    };

    match expand_struct(cfg, st) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(cfg: ModelAttrConfig, mut st: ItemStruct) -> Result<proc_macro2::TokenStream> {
    if !st.generics.params.is_empty() {
        return Err(syn::Error::new(
            st.ident.span(),
            "#[model] does not support generic structs",
        ));
    }

    if cfg.discriminator.is_none() {
        if let Some(codec) = &cfg.codec {
            return Err(syn::Error::new(
                codec.span(),
                "'codec' requires 'discriminator'; containers are never encoded",
            ));
        }
    } else if let Some((key, _)) = &cfg.derive_default {
        return Err(syn::Error::new(
            key.span(),
            "'default' only applies to containers",
        ));
    }

    let mut relations: Vec<RelationField> = Vec::new();
    match &mut st.fields {
        syn::Fields::Named(fields_named) => {
            for field in fields_named.named.iter_mut() {
                if let Some(relation) = take_relation(field)? {
                    relations.push(relation);
                }
            }
        }
        syn::Fields::Unit => {}
        syn::Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                st.ident.span(),
                "only supports named-field or unit struct",
            ));
        }
    }

    // 容器以默认实例作为读路径的根，需要 Default；`default = false` 时由调用方自行实现
    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    let derive_default = cfg.derive_default.as_ref().is_none_or(|(_, on)| *on);
    if cfg.discriminator.is_none() && derive_default {
        required.insert(0, syn::parse_quote!(Default));
    }
    apply_derives(&mut st.attrs, required)?;

    let ident = &st.ident;

    let constructor = match (&cfg.discriminator, &cfg.codec) {
        (Some(d), Some(codec)) => {
            quote! { ::monotable_core::registry::TypeSpec::<Self>::item_with_codec(#d, #codec) }
        }
        (Some(d), None) => quote! { ::monotable_core::registry::TypeSpec::<Self>::item(#d) },
        (None, _) => quote! { ::monotable_core::registry::TypeSpec::<Self>::container() },
    };

    let accessors = relations.iter().map(|r| accessor_fns(ident, r));
    let registrations = relations.iter().map(|r| {
        let field = &r.ident;
        let name = LitStr::new(&field.to_string(), field.span());
        let related = &r.related;
        let get = format_ident!("get_{}", field);
        let set = format_ident!("set_{}", field);
        match r.kind {
            Relation::Many => quote! { .many::<#related>(#name, #get, #set) },
            Relation::One => quote! { .one::<#related>(#name, #get, #set) },
        }
    });

    Ok(quote! {
        #st

        impl ::monotable_core::registry::Model for #ident {
            fn type_spec() -> ::monotable_core::registry::TypeSpec<Self> {
                #( #accessors )*

                #constructor
                    #( #registrations )*
            }
        }
    })
}

// 为单个关系字段生成读取/写入函数
fn accessor_fns(owner: &Ident, relation: &RelationField) -> proc_macro2::TokenStream {
    let field = &relation.ident;
    let related = &relation.related;
    let get = format_ident!("get_{}", field);
    let set = format_ident!("set_{}", field);

    match relation.kind {
        Relation::Many => quote! {
            fn #get(owner: &#owner) -> &[#related] {
                owner.#field.as_slice()
            }
            fn #set(owner: &mut #owner, value: ::std::vec::Vec<#related>) {
                owner.#field = value;
            }
        },
        Relation::One => quote! {
            fn #get(owner: &#owner) -> ::std::option::Option<&#related> {
                owner.#field.as_ref()
            }
            fn #set(owner: &mut #owner, value: #related) {
                owner.#field = ::std::option::Option::Some(value);
            }
        },
    }
}

// 解析 model 宏键值参数：discriminator = "<lit>"、codec = <expr>、default = <bool>
struct ModelAttrConfig {
    discriminator: Option<LitStr>,
    codec: Option<Expr>,
    derive_default: Option<(Ident, bool)>,
}

impl Parse for ModelAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut discriminator: Option<LitStr> = None;
        let mut codec: Option<Expr> = None;
        let mut derive_default: Option<(Ident, bool)> = None;

        if input.is_empty() {
            return Ok(Self {
                discriminator,
                codec,
                derive_default,
            });
        }

        let pairs: Punctuated<ModelAttrKv, Token![,]> =
            Punctuated::<ModelAttrKv, Token![,]>::parse_terminated(input)?;

        for kv in pairs {
            match kv.key.to_string().as_str() {
                "discriminator" => {
                    if discriminator.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'discriminator' in attribute",
                        ));
                    }
                    let lit = match kv.value {
                        Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(lit),
                            ..
                        }) => lit,
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected string literal for 'discriminator'",
                            ));
                        }
                    };
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(
                            lit.span(),
                            "'discriminator' must not be empty",
                        ));
                    }
                    discriminator = Some(lit);
                }
                "codec" => {
                    if codec.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'codec' in attribute",
                        ));
                    }
                    codec = Some(kv.value);
                }
                "default" => {
                    if derive_default.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'default' in attribute",
                        ));
                    }
                    let on = match kv.value {
                        Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Bool(b),
                            ..
                        }) => b.value,
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected bool literal for 'default'",
                            ));
                        }
                    };
                    derive_default = Some((kv.key, on));
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'discriminator' | 'codec' | 'default'",
                    ));
                }
            }
        }

        Ok(Self {
            discriminator,
            codec,
            derive_default,
        })
    }
}

struct ModelAttrKv {
    key: Ident,
    #[allow(dead_code)]
    eq: Token![=],
    value: Expr,
}

impl Parse for ModelAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self {
            key: input.parse()?,
            eq: input.parse()?,
            value: input.parse()?,
        })
    }
}
