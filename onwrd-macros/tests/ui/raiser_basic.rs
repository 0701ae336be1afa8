use onwrd_domain::event_raiser::{EventRaiser, EventSource, OutboxEvent};
use onwrd_macros::{domain_event, event_raiser};

#[domain_event]
enum AccountEvent {
    Opened { owner: String },
    Deposited { amount: i64 },
}

#[event_raiser(event = AccountEvent)]
#[derive(Debug, Default)]
struct Account {
    owner: String,
    balance: i64,
}

impl Account {
    fn open(owner: &str) -> Self {
        let mut account = Account {
            owner: owner.to_string(),
            ..Default::default()
        };
        account.raise(AccountEvent::Opened {
            owner: owner.to_string(),
        });
        account
    }

    fn deposit(&mut self, amount: i64) {
        self.balance += amount;
        self.raise(AccountEvent::Deposited { amount });
    }
}

fn main() {
    let mut account = Account::open("alice");
    account.deposit(30);
    assert_eq!(account.owner, "alice");
    assert_eq!(account.pending_events().len(), 2);

    let taken = EventSource::take_events(&mut account);
    let types: Vec<&str> = taken.iter().map(|e| e.outbox_event_type()).collect();
    assert_eq!(types, vec!["AccountEvent.Opened", "AccountEvent.Deposited"]);
    assert!(account.pending_events().is_empty());
}
