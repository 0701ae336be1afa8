//! onwrd 过程宏
//!
//! - `#[domain_event]`：为事件枚举/结构体补齐派生并实现 `DomainEvent`；
//! - `#[event_raiser(event = T)]`：为聚合注入事件缓冲字段并实现 `EventRaiser`。
//!
//! 生成代码通过 `::onwrd_domain` 绝对路径引用核心库，使用方需直接依赖
//! `onwrd-domain` 与 `serde`。
//!
use proc_macro::TokenStream;

mod domain_event;
mod event_raiser;
mod utils;

/// 领域事件宏
///
/// ```ignore
/// #[domain_event]
/// enum OrderEvent {
///     #[event(event_type = "OrderPlaced")]
///     Placed { order_id: String },
///     Cancelled { order_id: String },   // "OrderEvent.Cancelled"
/// }
/// ```
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}

/// 事件产生能力宏
///
/// ```ignore
/// #[event_raiser(event = OrderEvent)]
/// #[derive(Default)]
/// struct Order {
///     id: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn event_raiser(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_raiser::expand(attr, item)
}
