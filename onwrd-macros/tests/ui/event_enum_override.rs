use onwrd_domain::domain_event::DomainEvent;
use onwrd_macros::domain_event;
use serde::{Deserialize, Serialize};

#[domain_event(prefix = "inventory")]
#[derive(Debug, Clone, Serialize, Deserialize)]
enum InventoryEvent {
    #[event(event_type = "InventoryReserved")]
    Reserved { sku: String, qty: u32 },
    Released { sku: String },
}

fn main() {
    let reserved = InventoryEvent::Reserved {
        sku: "sku-1".into(),
        qty: 2,
    };
    assert_eq!(reserved.event_type(), "InventoryReserved");
    assert_eq!(
        InventoryEvent::Released { sku: "sku-1".into() }.event_type(),
        "inventory.Released"
    );

    let back: InventoryEvent =
        serde_json::from_str(&serde_json::to_string(&reserved).unwrap()).unwrap();
    assert_eq!(back, reserved);
}
