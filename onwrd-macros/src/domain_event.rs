use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, Ident, Item, LitStr, Result, Token, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[domain_event] 宏实现
/// - 支持枚举与结构体；
/// - 追加默认派生：`Debug, Clone, PartialEq, Serialize, Deserialize`；
/// - 生成 `::onwrd_domain::domain_event::DomainEvent` 实现；
/// - 枚举默认类型名为 `Enum.Variant`，`#[domain_event(prefix = "...")]` 可替换前缀，
///   变体可用 `#[event(event_type = "...")]` 覆写；
/// - 结构体默认类型名为结构体名，可用 `#[domain_event(event_type = "...")]` 覆写。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];

    let result = match &mut input {
        Item::Enum(e) => {
            apply_derives(&mut e.attrs, required);
            expand_enum(&cfg, e)
        }
        Item::Struct(s) => {
            apply_derives(&mut s.attrs, required);
            expand_struct(&cfg, s)
        }
        other => Err(syn::Error::new(
            other.span(),
            "#[domain_event] can only be used on enum or struct types",
        )),
    };

    match result {
        Ok(event_impl) => TokenStream::from(quote! {
            #input
            #event_impl
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_enum(cfg: &EventAttrConfig, e: &mut syn::ItemEnum) -> Result<proc_macro2::TokenStream> {
    if let Some(lit) = &cfg.event_type {
        return Err(syn::Error::new(
            lit.span(),
            "'event_type' applies to structs; use 'prefix' or a variant #[event(...)] on enums",
        ));
    }

    let prefix = cfg
        .prefix
        .as_ref()
        .map(LitStr::value)
        .unwrap_or_else(|| e.ident.to_string());

    let mut overrides: HashMap<String, LitStr> = HashMap::new();
    for v in &mut e.variants {
        let (retained, ty) = take_variant_event_type(&v.attrs)?;
        v.attrs = retained;
        if let Some(lit) = ty {
            overrides.insert(v.ident.to_string(), lit);
        }
    }

    let arms = e.variants.iter().map(|v| {
        let v_ident = &v.ident;
        let lit = overrides.get(&v_ident.to_string()).cloned().unwrap_or_else(|| {
            LitStr::new(&format!("{prefix}.{v_ident}"), v_ident.span())
        });
        quote! { Self::#v_ident { .. } => #lit }
    });

    let ident = &e.ident;
    let (impl_generics, ty_generics, where_clause) = e.generics.split_for_impl();

    // 空枚举没有可匹配的变体
    let body = if e.variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! { match self { #( #arms, )* } }
    };

    Ok(quote! {
        impl #impl_generics ::onwrd_domain::domain_event::DomainEvent for #ident #ty_generics #where_clause {
            fn event_type(&self) -> &str { #body }
        }
    })
}

fn expand_struct(
    cfg: &EventAttrConfig,
    s: &mut syn::ItemStruct,
) -> Result<proc_macro2::TokenStream> {
    if let Some(lit) = &cfg.prefix {
        return Err(syn::Error::new(
            lit.span(),
            "'prefix' applies to enums; use 'event_type' on structs",
        ));
    }

    let ident = &s.ident;
    let lit = cfg
        .event_type
        .clone()
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let (impl_generics, ty_generics, where_clause) = s.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::onwrd_domain::domain_event::DomainEvent for #ident #ty_generics #where_clause {
            fn event_type(&self) -> &str { #lit }
        }
    })
}

// 取出变体上的 #[event(event_type = "...")]，其余属性保留
fn take_variant_event_type(attrs: &[Attribute]) -> Result<(Vec<Attribute>, Option<LitStr>)> {
    let mut retained = Vec::new();
    let mut found: Option<LitStr> = None;

    for attr in attrs {
        if !attr.path().is_ident("event") {
            retained.push(attr.clone());
            continue;
        }

        let pairs = attr.parse_args_with(Punctuated::<KeyValue, Token![,]>::parse_terminated)?;
        for kv in pairs {
            if kv.key != "event_type" {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key; expected 'event_type'",
                ));
            }
            if found.is_some() {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "duplicate 'event_type' specified for this variant",
                ));
            }
            found = Some(expect_str(&kv.key, kv.value)?);
        }
    }

    Ok((retained, found))
}

fn expect_str(key: &Ident, value: Expr) -> Result<LitStr> {
    match value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) if !lit.value().is_empty() => Ok(lit),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected non-empty string literal for '{key}'"),
        )),
    }
}

// -------- parsing --------

struct KeyValue {
    key: Ident,
    value: Expr,
}

impl Parse for KeyValue {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}

// 宏参数：`prefix`（枚举）或 `event_type`（结构体）
#[derive(Default)]
struct EventAttrConfig {
    prefix: Option<LitStr>,
    event_type: Option<LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();
        if input.is_empty() {
            return Ok(cfg);
        }

        let pairs = Punctuated::<KeyValue, Token![,]>::parse_terminated(input)?;
        for kv in pairs {
            let slot = match kv.key.to_string().as_str() {
                "prefix" => &mut cfg.prefix,
                "event_type" => &mut cfg.event_type,
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'prefix' | 'event_type'",
                    ));
                }
            };
            if slot.is_some() {
                return Err(syn::Error::new(
                    kv.key.span(),
                    format!("duplicate key '{}' in attribute", kv.key),
                ));
            }
            *slot = Some(expect_str(&kv.key, kv.value)?);
        }

        Ok(cfg)
    }
}
