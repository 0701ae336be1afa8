use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Field, FieldsNamed, Token, Type};

// 拆分属性：非 derive 属性原样保留，derive 列表展开为路径
pub(crate) fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut derives = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("derive") {
            retained.push(attr.clone());
            continue;
        }
        if let Ok(list) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
        {
            derives.extend(list);
        }
    }
    (retained, derives)
}

// 归一化 derive 的 key，`Serialize` 与 `serde::Serialize` 视为同一项
pub(crate) fn derive_key(p: &syn::Path) -> String {
    match p.segments.last() {
        Some(last) => {
            let name = last.ident.to_string();
            if name == "Serialize" || name == "Deserialize" {
                format!("serde::{name}")
            } else {
                name
            }
        }
        None => p.to_token_stream().to_string(),
    }
}

pub(crate) fn has_derive(attrs: &[Attribute], key: &str) -> bool {
    split_derives(attrs).1.iter().any(|p| derive_key(p) == key)
}

// 补齐所需 derive：required 在前，已有的去重后跟随，其它属性保持原顺序
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);

    let mut seen = std::collections::HashSet::new();
    let merged: Vec<syn::Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();

    let derive: Attribute = syn::parse_quote!(#[derive(#(#merged),*)]);
    *attrs = std::iter::once(derive).chain(retained).collect();
}

/// 若缺少名为 `name` 的字段，则在末尾追加 `#attrs name: ty`；已存在时保持不变。
/// 返回是否追加了字段。
pub(crate) fn ensure_field(
    fields_named: &mut FieldsNamed,
    name: &syn::Ident,
    ty: &Type,
    attrs: &[Attribute],
) -> bool {
    let exists = fields_named
        .named
        .iter()
        .any(|f| f.ident.as_ref() == Some(name));
    if exists {
        return false;
    }

    let field: Field = syn::parse_quote! { #(#attrs)* #name: #ty };
    fields_named.named.push(field);
    true
}
