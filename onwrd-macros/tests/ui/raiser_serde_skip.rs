use onwrd_domain::event_raiser::EventRaiser;
use onwrd_macros::{domain_event, event_raiser};
use serde::{Deserialize, Serialize};

#[domain_event]
struct Renamed {
    to: String,
}

// 缓冲字段不参与序列化
#[event_raiser(event = Renamed)]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Profile {
    name: String,
}

fn main() {
    let mut profile = Profile {
        name: "bob".into(),
        ..Default::default()
    };
    profile.raise(Renamed { to: "bobby".into() });

    let json = serde_json::to_string(&profile).unwrap();
    assert_eq!(json, r#"{"name":"bob"}"#);

    let restored: Profile = serde_json::from_str(&json).unwrap();
    assert!(restored.pending_events().is_empty());
    assert_eq!(profile.drain_events().len(), 1);
}
