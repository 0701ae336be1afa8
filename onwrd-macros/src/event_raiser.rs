use crate::utils::{ensure_field, has_derive};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[event_raiser] 宏实现
/// - 仅支持具名字段结构体；
/// - 若缺失则追加字段 `raised_events: EventBuffer<Event>`；
///   结构体派生了 `Serialize`/`Deserialize` 时该字段带 `#[serde(skip)]`；
/// - 生成 `::onwrd_domain::event_raiser::EventRaiser` 实现；
/// - 参数：`#[event_raiser(event = EventType)]`。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as RaiserAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[event_raiser] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let serde_aware =
        has_derive(&st.attrs, "serde::Serialize") || has_derive(&st.attrs, "serde::Deserialize");

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let event_ty = &cfg.event_ty;
    let field_ident: syn::Ident = syn::parse_quote!(raised_events);
    let buffer_ty: Type = syn::parse_quote! {
        ::onwrd_domain::domain_event::EventBuffer<#event_ty>
    };
    let field_attrs: Vec<syn::Attribute> = if serde_aware {
        vec![syn::parse_quote!(#[serde(skip)])]
    } else {
        Vec::new()
    };
    ensure_field(fields_named, &field_ident, &buffer_ty, &field_attrs);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let expanded = quote! {
        #st

        impl #impl_generics ::onwrd_domain::event_raiser::EventRaiser for #ident #ty_generics #where_clause {
            type Event = #event_ty;

            fn event_buffer(&self) -> &#buffer_ty { &self.#field_ident }

            fn event_buffer_mut(&mut self) -> &mut #buffer_ty { &mut self.#field_ident }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct RaiserAttrConfig {
    event_ty: Type,
}

impl Parse for RaiserAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "missing event type; expected #[event_raiser(event = EventType)]",
            ));
        }

        let key: syn::Ident = input.parse()?;
        if key != "event" {
            return Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'event'",
            ));
        }
        let _eq: Token![=] = input.parse()?;
        let event_ty: Type = input.parse()?;
        let _trailing: Option<Token![,]> = input.parse()?;

        if !input.is_empty() {
            return Err(input.error("unexpected tokens after 'event = ...'"));
        }

        Ok(Self { event_ty })
    }
}
