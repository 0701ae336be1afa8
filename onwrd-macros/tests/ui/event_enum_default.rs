use onwrd_domain::domain_event::DomainEvent;
use onwrd_macros::domain_event;

#[domain_event]
enum OrderEvent {
    Placed { order_id: String, amount: i64 },
    Shipped(String),
    Cancelled,
}

fn main() {
    let placed = OrderEvent::Placed {
        order_id: "o-1".into(),
        amount: 10,
    };
    assert_eq!(placed.event_type(), "OrderEvent.Placed");
    assert_eq!(OrderEvent::Shipped("o-1".into()).event_type(), "OrderEvent.Shipped");
    assert_eq!(OrderEvent::Cancelled.event_type(), "OrderEvent.Cancelled");

    // 默认派生：Clone + PartialEq + Serialize
    assert_eq!(placed.clone(), placed);
    let json = serde_json::to_string(&placed).unwrap();
    assert_eq!(json, r#"{"Placed":{"order_id":"o-1","amount":10}}"#);
}
