use onwrd_domain::domain_event::EventBuffer;
use onwrd_domain::event_raiser::EventRaiser;
use onwrd_macros::{domain_event, event_raiser};

#[domain_event]
enum TicketEvent {
    Opened,
}

// 已声明缓冲字段时不重复注入
#[event_raiser(event = TicketEvent)]
struct Ticket {
    raised_events: EventBuffer<TicketEvent>,
    title: String,
}

fn main() {
    let mut ticket = Ticket {
        raised_events: EventBuffer::new(),
        title: "printer".into(),
    };
    ticket.raise(TicketEvent::Opened);
    assert_eq!(ticket.title, "printer");
    assert_eq!(ticket.drain_events(), vec![TicketEvent::Opened]);
}
