use onwrd_domain::domain_event::DomainEvent;
use onwrd_macros::domain_event;

#[domain_event]
struct OrderPlaced {
    order_id: String,
}

#[domain_event(event_type = "payments.captured")]
struct PaymentCaptured {
    amount: i64,
}

fn main() {
    assert_eq!(
        OrderPlaced {
            order_id: "o-1".into()
        }
        .event_type(),
        "OrderPlaced"
    );
    assert_eq!(PaymentCaptured { amount: 5 }.event_type(), "payments.captured");
}
