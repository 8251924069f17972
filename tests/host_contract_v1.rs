use singularity::host::contract::{
    CommandEnvelope, CommandName, ContractErrorKind, EVENT_VERSION, EventEnvelope, EventName,
    ResponseEnvelope,
};
use singularity::host::push::HostPush;
use singularity::state::{AgentStatePatch, LogEntry, LogLevel, OllamaModel, RoleModels};

#[test]
fn command_names_parse_known_and_unknown() {
    let all = [
        (CommandName::UiReady, "ui.ready"),
        (CommandName::ConversationSendMessage, "conversation.send_message"),
        (CommandName::ModelsPull, "models.pull"),
        (CommandName::ModelsSaveSelection, "models.save_selection"),
        (CommandName::FilesList, "files.list"),
        (CommandName::FilesRead, "files.read"),
        (CommandName::FilesWrite, "files.write"),
        (CommandName::CodeExecute, "code.execute"),
        (CommandName::TasksGet, "tasks.get"),
    ];
    for (name, wire) in all {
        assert_eq!(name.as_str(), wire);
        assert_eq!(CommandName::parse(wire), Some(name));
        assert_eq!(
            serde_json::to_value(name).expect("serialize command name"),
            wire
        );
    }
    assert!(CommandName::parse("models.delete").is_none());
}

#[test]
fn command_envelope_json_shape_matches_v1_contract() {
    let envelope = CommandEnvelope::new(
        "req-123",
        CommandName::ConversationSendMessage,
        serde_json::json!({"text": "hi", "attachments": []}),
    );

    let json = serde_json::to_value(&envelope).expect("serialize command envelope");
    assert_eq!(json["v"], EVENT_VERSION);
    assert_eq!(json["request_id"], "req-123");
    assert_eq!(json["command"], "conversation.send_message");
    assert_eq!(json["payload"]["text"], "hi");
}

#[test]
fn command_envelope_rejects_wrong_version() {
    let mut envelope = CommandEnvelope::new("req-1", CommandName::UiReady, serde_json::json!({}));
    envelope.v = EVENT_VERSION + 1;

    let err = envelope.validate().expect_err("version should be rejected");
    assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);
}

#[test]
fn response_envelope_json_shape_matches_v1_contract() {
    let ok = ResponseEnvelope::ok("req-1", serde_json::json!({"accepted": true}));
    let ok_json = serde_json::to_value(&ok).expect("serialize ok response envelope");
    assert_eq!(ok_json["v"], EVENT_VERSION);
    assert_eq!(ok_json["ok"], true);
    assert_eq!(ok_json["payload"]["accepted"], true);
    assert!(ok_json["error"].is_null());

    let err = ResponseEnvelope::error("req-2", "bad payload");
    let err_json = serde_json::to_value(&err).expect("serialize error response envelope");
    assert_eq!(err_json["ok"], false);
    assert_eq!(err_json["payload"], serde_json::Value::Null);
    assert_eq!(err_json["error"], "bad payload");
}

#[test]
fn unknown_event_is_rejected() {
    let envelope = EventEnvelope::new("evt-1", "canvas.draw", serde_json::json!({}));
    let err = envelope.validate().expect_err("unknown event");
    assert_eq!(err.kind, ContractErrorKind::UnknownEvent);
    assert!(HostPush::from_envelope(&envelope).is_err());
}

#[test]
fn every_push_survives_the_wire() {
    let pushes = vec![
        HostPush::Initialize {
            models: vec![OllamaModel {
                name: "llama3".to_owned(),
                modified_at: "2024-05-01T00:00:00Z".to_owned(),
                size: 4_700_000_000,
            }],
            role_models: RoleModels::uniform("llama3"),
        },
        HostPush::AgentMessage {
            content: "Done.".to_owned(),
            attachments: Vec::new(),
        },
        HostPush::SystemMessage {
            content: "Model switched.".to_owned(),
        },
        HostPush::AgentState(AgentStatePatch::typing(true)),
        HostPush::PullProgress {
            status: "downloading 12%".to_owned(),
        },
        HostPush::RefreshModels { models: Vec::new() },
        HostPush::Log(LogEntry::now(LogLevel::Warning, "Ollama", "slow response")),
    ];

    for push in pushes {
        let envelope = push.to_envelope().expect("encode push");
        let line = serde_json::to_string(&envelope).expect("serialize event envelope");
        let parsed: EventEnvelope = serde_json::from_str(&line).expect("parse event envelope");
        assert_eq!(
            parsed.validate().expect("known event"),
            push.event_name()
        );
        assert_eq!(HostPush::from_envelope(&parsed).expect("decode push"), push);
    }
}

#[test]
fn agent_state_payload_carries_only_given_fields() {
    let envelope = HostPush::AgentState(AgentStatePatch::thinking(false))
        .to_envelope()
        .expect("encode agent state");
    assert_eq!(envelope.event, EventName::AgentState.as_str());
    assert_eq!(envelope.payload, serde_json::json!({"is_thinking": false}));
}
