use leadhub_kernel::domain::config::SocketConfig;
use leadhub_kernel::domain::constants::{DEFAULT_GREETING, SYSTEM_SENDER};
use leadhub_kernel::domain::events::ServerEvent;
use leadhub_kernel::domain::leads::{Lead, LeadMessage, LeadStatus, StatusChange};
use leadhub_realtime::{Connection, RealtimeError, Relay};
use serde_json::json;
use std::sync::Arc;

fn relay() -> Relay {
    Relay::new(&SocketConfig::default()).expect("relay")
}

/// Connects and discards the greeting.
fn joined(relay: &Relay) -> Connection {
    let mut connection = relay.connect().expect("connect");
    assert_eq!(connection.drain(8).len(), 1, "exactly one greeting");
    connection
}

fn status_frame(lead_id: &str, status: &str) -> String {
    json!({ "event": "lead:status-changed", "data": { "leadId": lead_id, "status": status } })
        .to_string()
}

#[tokio::test]
async fn new_connection_is_greeted_privately() {
    let relay = relay();
    let mut first = relay.connect().expect("connect");
    let mut second = relay.connect().expect("connect");

    let greeting = first.recv().await.expect("greeting");
    let ServerEvent::Message(message) = greeting.as_ref() else {
        panic!("expected a message event, got {greeting:?}");
    };
    assert_eq!(message.text, DEFAULT_GREETING);
    assert_eq!(message.sender_id, SYSTEM_SENDER);

    // First connection saw only its own greeting.
    assert!(first.drain(8).is_empty());
    assert_eq!(second.drain(8).len(), 1);
}

#[test]
fn custom_greeting_is_used() {
    let config = SocketConfig { greeting: "hello dashboards".into(), ..SocketConfig::default() };
    let relay = Relay::new(&config).expect("relay");
    let mut connection = relay.connect().expect("connect");

    let events = connection.drain(8);
    assert!(matches!(
        events.first().map(Arc::as_ref),
        Some(ServerEvent::Message(m)) if m.text == "hello dashboards"
    ));
}

#[test]
fn status_change_reaches_every_connection_including_sender() {
    let relay = relay();
    let mut a = joined(&relay);
    let mut b = joined(&relay);
    let mut c = joined(&relay);

    let reached = relay.handle_frame(a.id(), &status_frame("42", "QUALIFIED")).expect("frame");
    assert_eq!(reached, 3);

    let expected =
        ServerEvent::LeadStatus(StatusChange::new("42", LeadStatus::Qualified));
    for connection in [&mut a, &mut b, &mut c] {
        let events = connection.drain(8);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref(), &expected);
    }
}

#[test]
fn chat_message_is_echoed_to_sender_only() {
    let relay = relay();
    let mut a = joined(&relay);
    let mut b = joined(&relay);

    let frame = json!({ "event": "message", "data": { "text": "hi", "senderId": "u1" } });
    let reached = relay.handle_frame(a.id(), &frame.to_string()).expect("frame");
    assert_eq!(reached, 1);

    let echoed = a.drain(8);
    assert_eq!(echoed.len(), 1);
    let ServerEvent::Message(echo) = echoed[0].as_ref() else {
        panic!("expected echo, got {:?}", echoed[0]);
    };
    assert_eq!(echo.text, "Echo: hi");
    assert_eq!(echo.sender_id, SYSTEM_SENDER);
    assert!(b.drain(8).is_empty());
}

#[test]
fn events_keep_per_sender_order() {
    let relay = relay();
    let a = joined(&relay);
    let mut b = joined(&relay);

    for status in ["CONTACTED", "QUALIFIED", "PROPOSAL_SENT", "CLOSED_WON"] {
        relay.handle_frame(a.id(), &status_frame("7", status)).expect("frame");
    }

    let seen: Vec<LeadStatus> = b
        .drain(16)
        .iter()
        .filter_map(|event| match event.as_ref() {
            ServerEvent::LeadStatus(change) => Some(change.status.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        seen,
        [
            LeadStatus::Contacted,
            LeadStatus::Qualified,
            LeadStatus::ProposalSent,
            LeadStatus::ClosedWon
        ]
    );
}

#[test]
fn late_joiner_misses_earlier_events() {
    let relay = relay();
    let a = joined(&relay);
    relay.handle_frame(a.id(), &status_frame("1", "CONTACTED")).expect("frame");

    let mut late = joined(&relay);
    assert!(late.drain(8).is_empty());

    relay.handle_frame(a.id(), &status_frame("1", "QUALIFIED")).expect("frame");
    assert_eq!(late.drain(8).len(), 1);
}

#[test]
fn dropping_a_connection_leaves_the_group() {
    let relay = relay();
    let a = joined(&relay);
    let b = joined(&relay);
    let b_id = b.id().clone();
    assert_eq!(relay.connection_count(), 2);

    drop(b);
    assert_eq!(relay.connection_count(), 1);
    assert!(!relay.is_connected(&b_id));
    assert!(relay.is_connected(a.id()));

    let reached = relay.handle_frame(a.id(), &status_frame("9", "NEW")).expect("frame");
    assert_eq!(reached, 1);
}

#[test]
fn malformed_frames_are_rejected_without_disconnecting() {
    let relay = relay();
    let mut a = joined(&relay);
    let mut b = joined(&relay);

    let bad = [
        "not json",
        r#"{"event":"lead:deleted","data":{}}"#,
        r#"{"event":"lead:status-changed","data":{"leadId":"1"}}"#,
        r#"{"event":"lead:status-changed","data":{"leadId":"1","status":"LOST"}}"#,
    ];
    for frame in bad {
        let err = relay.handle_frame(a.id(), frame).expect_err(frame);
        assert!(matches!(err, RealtimeError::Decode { .. }), "{frame}: {err}");
    }
    assert!(b.drain(8).is_empty());

    assert!(relay.is_connected(a.id()));
    relay.handle_frame(a.id(), &status_frame("1", "NEW")).expect("valid frame after bad ones");
    assert_eq!(a.drain(8).len(), 1);
    assert_eq!(b.drain(8).len(), 1);
}

#[test]
fn server_emitters_broadcast_under_outbound_names() {
    let relay = relay();
    let mut a = joined(&relay);

    assert_eq!(relay.emit_new_lead(Lead::new("1", "+15550001")), 1);
    assert_eq!(relay.emit_lead_update(Lead::new("1", "+15550001")), 1);
    assert_eq!(relay.emit_new_message(LeadMessage::incoming("1", "hello")), 1);
    assert_eq!(
        relay.emit_lead_status(StatusChange::new("1", LeadStatus::Contacted)),
        1
    );

    let names: Vec<&str> = a.drain(8).iter().map(|event| event.name()).collect();
    assert_eq!(names, ["lead:new", "lead:update", "message:received", "lead:status"]);
}

#[test]
fn emitting_without_connections_reaches_nobody() {
    let relay = relay();
    assert_eq!(relay.emit_new_lead(Lead::new("1", "+15550001")), 0);
}

#[tokio::test]
async fn shutdown_disconnects_and_refuses_new_connections() {
    let relay = relay();
    let mut a = joined(&relay);
    let _b = joined(&relay);

    assert_eq!(relay.shutdown(), 2);
    assert!(relay.is_closed());
    assert_eq!(relay.connection_count(), 0);
    assert!(a.recv().await.is_none());

    let err = relay.connect().expect_err("closed relay");
    assert!(matches!(err, RealtimeError::Group { .. }), "{err}");
}
