use leadhub_domain::constants::{inbound, outbound};
use leadhub_domain::events::{ClientEvent, EventKind, ServerEvent};
use leadhub_domain::leads::{ChatMessage, Lead, LeadMessage, LeadStatus, MessageDirection, StatusChange};
use leadhub_domain::wire::Field;
use serde_json::json;

fn lead_json() -> serde_json::Value {
    json!({
        "id": "clx42",
        "name": "Maria",
        "phone": "5511999990000",
        "email": null,
        "status": "CONTACTED",
        "source": "whatsapp",
        "notes": "asked for pricing",
        "lastContact": "2024-05-01T12:00:00.000Z",
        "createdAt": "2024-04-30T09:15:00.000Z",
        "messageCount": 3,
        "updatedAt": "2024-05-01T12:00:00Z",
        "messages": []
    })
}

#[test]
fn client_frames_decode_into_the_closed_union() {
    let frame = json!({ "event": "lead:created", "data": lead_json() });
    let event: ClientEvent = serde_json::from_value(frame).expect("lead:created decodes");

    let ClientEvent::LeadCreated(lead) = &event else {
        panic!("expected lead:created, got {event:?}");
    };
    assert_eq!(lead.id, "clx42");
    assert_eq!(lead.status, LeadStatus::Contacted);
    assert_eq!(lead.message_count, Field::Value(3));
    assert_eq!(lead.email, Field::Null);
    assert_eq!(lead.created_at.as_str(), "2024-04-30T09:15:00.000Z");
    assert_eq!(lead.extra.get("updatedAt"), Some(&json!("2024-05-01T12:00:00Z")));
    assert_eq!(event.name(), inbound::LEAD_CREATED);
}

#[test]
fn unknown_fields_survive_a_reencode() {
    let lead: Lead = serde_json::from_value(lead_json()).expect("lead decodes");
    let encoded = serde_json::to_value(ServerEvent::LeadNew(lead.clone())).expect("encodes");

    assert_eq!(encoded["event"], outbound::LEAD_NEW);
    assert_eq!(encoded["data"]["messages"], json!([]));
    assert_eq!(encoded["data"]["updatedAt"], "2024-05-01T12:00:00Z");

    assert_eq!(encoded["data"], lead_json());

    let back: Lead = serde_json::from_value(encoded["data"].clone()).expect("decodes again");
    assert_eq!(back, lead);
}

#[test]
fn explicit_nulls_are_reencoded_as_null() {
    let data = json!({
        "id": "a1",
        "name": null,
        "phone": "123",
        "email": null,
        "status": "NEW",
        "notes": null,
        "lastContact": null,
        "createdAt": "2024-05-01T10:00:00.000Z"
    });
    let lead: Lead = serde_json::from_value(data.clone()).expect("lead decodes");

    assert_eq!(lead.name, Field::Null);
    assert_eq!(lead.last_contact, Field::Null);
    assert_eq!(serde_json::to_value(&lead).expect("encodes"), data);
}

#[test]
fn minimal_lead_gains_no_fields() {
    let data = json!({
        "id": "a1",
        "phone": "123",
        "status": "NEW",
        "createdAt": "2024-01-01T00:00:00Z"
    });
    let lead: Lead = serde_json::from_value(data.clone()).expect("minimal lead decodes");

    assert!(lead.source.is_absent());
    assert!(lead.message_count.is_absent());
    assert!(lead.extra.is_empty());
    assert_eq!(serde_json::to_value(&lead).expect("encodes"), data);
}

#[test]
fn new_leads_carry_the_stored_defaults() {
    let lead = Lead::new("a1", "123");
    let encoded = serde_json::to_value(&lead).expect("encodes");

    assert_eq!(encoded["source"], "whatsapp");
    assert_eq!(encoded["messageCount"], 0);
    assert_eq!(encoded["status"], "NEW");
    assert!(encoded.get("name").is_none());
}

#[test]
fn malformed_frames_are_rejected() {
    let unknown = json!({ "event": "lead:deleted", "data": { "id": "1" } });
    assert!(serde_json::from_value::<ClientEvent>(unknown).is_err());

    let missing_phone = json!({
        "event": "lead:updated",
        "data": { "id": "1", "status": "NEW", "createdAt": "2024-01-01T00:00:00Z" }
    });
    assert!(serde_json::from_value::<ClientEvent>(missing_phone).is_err());

    let numeric_status = json!({
        "event": "lead:status-changed",
        "data": { "leadId": "42", "status": 3 }
    });
    assert!(serde_json::from_value::<ClientEvent>(numeric_status).is_err());

    let bad_timestamp = json!({
        "event": "lead:created",
        "data": { "id": "1", "phone": "1", "status": "NEW", "createdAt": "yesterday" }
    });
    assert!(serde_json::from_value::<ClientEvent>(bad_timestamp).is_err());
}

#[test]
fn status_change_uses_camel_case_on_the_wire() {
    let event = ClientEvent::LeadStatusChanged(StatusChange::new("42", LeadStatus::Qualified));
    let encoded = serde_json::to_value(&event).expect("encodes");
    assert_eq!(
        encoded,
        json!({ "event": "lead:status-changed", "data": { "leadId": "42", "status": "QUALIFIED" } })
    );
}

#[test]
fn chat_and_message_frames_decode() {
    let chat: ClientEvent =
        serde_json::from_value(json!({ "event": "message", "data": { "text": "hi", "senderId": "u1" } }))
            .expect("chat decodes");
    assert_eq!(chat, ClientEvent::Message(ChatMessage { text: "hi".into(), sender_id: "u1".into() }));

    let message: ClientEvent = serde_json::from_value(json!({
        "event": "message:new",
        "data": { "leadId": "42", "timestamp": "2024-05-01T12:00:00Z", "message": "Olá", "direction": "INCOMING" }
    }))
    .expect("message:new decodes");
    let ClientEvent::MessageNew(LeadMessage { lead_id, message, direction, .. }) = message else {
        panic!("expected message:new");
    };
    assert_eq!(lead_id, "42");
    assert_eq!(message.value().map(String::as_str), Some("Olá"));
    assert_eq!(direction, Field::Value(MessageDirection::Incoming));
}

#[test]
fn event_kinds_name_the_outbound_events() {
    let names: Vec<&str> = EventKind::ALL.iter().map(|kind| kind.name()).collect();
    assert_eq!(
        names,
        [
            outbound::LEAD_NEW,
            outbound::LEAD_UPDATE,
            outbound::MESSAGE_RECEIVED,
            outbound::LEAD_STATUS,
            outbound::MESSAGE
        ]
    );
}

#[test]
fn lead_status_parses_case_insensitively() {
    assert_eq!("qualified".parse::<LeadStatus>(), Ok(LeadStatus::Qualified));
    assert_eq!("PROPOSAL_SENT".parse::<LeadStatus>(), Ok(LeadStatus::ProposalSent));
    assert!("LOST".parse::<LeadStatus>().is_err());
    assert_eq!(LeadStatus::ClosedWon.to_string(), "CLOSED_WON");
}

#[test]
fn statuses_outside_the_pipeline_pass_through_verbatim() {
    for raw in ["ARCHIVED", "qualified", ""] {
        let data = json!({ "leadId": "42", "status": raw });
        let change: StatusChange = serde_json::from_value(data.clone()).expect("any string decodes");

        assert_eq!(change.status, LeadStatus::Other(raw.to_owned()));
        assert!(!change.status.is_known());
        assert_eq!(serde_json::to_value(&change).expect("encodes"), data);
    }

    let known: StatusChange =
        serde_json::from_value(json!({ "leadId": "42", "status": "QUALIFIED" })).expect("decodes");
    assert_eq!(known.status, LeadStatus::Qualified);
}
