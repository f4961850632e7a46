use super::*;

#[test]
fn emit_without_subscribers_does_not_panic() {
    let events = SessionEvents::default();
    events.emit(SessionEvent::SignedOut);
}

#[test]
fn subscribers_receive_events_in_order() {
    let events = SessionEvents::new(4);
    let mut rx = events.subscribe();
    events.emit(SessionEvent::SignedIn { username: "alice".to_owned() });
    events.emit(SessionEvent::Invalidated);

    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedIn { username: "alice".to_owned() });
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::Invalidated);
    assert!(rx.try_recv().is_err());
}

#[test]
fn zero_capacity_is_clamped() {
    let events = SessionEvents::new(0);
    let mut rx = events.subscribe();
    events.emit(SessionEvent::SignedOut);
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedOut);
}
