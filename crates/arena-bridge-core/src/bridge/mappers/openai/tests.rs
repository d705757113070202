use std::collections::BTreeMap;

use arena_bridge_types::protocol::{ChatCompletionRequest, ChatMessage, ContentPart, Role};
use arena_bridge_types::{BridgeConfig, BridgeError, ConversationMode, EndpointTable, ModelTable, Participant};
use futures::{stream, StreamExt};

use super::*;
use crate::bridge::decoder::{EventStream, StreamEvent};

fn models() -> ModelTable {
    ModelTable::from_raw(BTreeMap::from([
        ("text-model".to_string(), "text-id".to_string()),
        ("image-model".to_string(), "image-id:image".to_string()),
    ]))
}

fn session() -> ResolvedSession {
    ResolvedSession {
        session_id: "sess".to_string(),
        message_id: "msg".to_string(),
        mode_override: None,
        battle_target_override: None,
    }
}

fn request(model: &str, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest::new(model, messages, false)
}

fn events(items: Vec<StreamEvent>) -> EventStream {
    Box::pin(stream::iter(items))
}

async fn sse_text(items: Vec<StreamEvent>) -> String {
    let chunks: Vec<_> =
        create_openai_sse_stream(events(items), "text-model".into(), "req-1".into()).collect().await;
    chunks.into_iter().map(|c| String::from_utf8(c.unwrap().to_vec()).unwrap()).collect()
}

fn data_lines(sse: &str) -> Vec<serde_json::Value> {
    sse.split("\n\n")
        .filter_map(|l| l.strip_prefix("data: "))
        .filter(|l| *l != "[DONE]")
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// --- translator ---

#[test]
fn test_multipart_text_joined() {
    let req = request(
        "text-model",
        vec![ChatMessage::parts("user", vec![ContentPart::text("a"), ContentPart::text("b")])],
    );
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    assert_eq!(payload.message_templates.len(), 1);
    assert_eq!(payload.message_templates[0].content, "a\n\nb");
    assert_eq!(payload.target_model_id.as_deref(), Some("text-id"));
    assert_eq!(payload.session_id, "sess");
    assert!(!payload.is_image_request);
}

#[test]
fn test_roles_normalized_and_empty_user_text_padded() {
    let req = request(
        "text-model",
        vec![ChatMessage::text("developer", "rules"), ChatMessage::text("tool", ""), ChatMessage::text("assistant", "")],
    );
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    let t = &payload.message_templates;
    assert_eq!(t[0].role, Role::System);
    assert_eq!(t[1].role, Role::User);
    assert_eq!(t[1].content, " ");
    assert_eq!(t[2].role, Role::Assistant);
    assert_eq!(t[2].content, "");
}

#[test]
fn test_direct_chat_participants() {
    let req = request(
        "text-model",
        vec![ChatMessage::text("system", "s"), ChatMessage::text("user", "u"), ChatMessage::text("assistant", "a")],
    );
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    let sides: Vec<_> = payload.message_templates.iter().map(|t| t.participant).collect();
    assert_eq!(sides, vec![Participant::B, Participant::A, Participant::A]);
}

#[test]
fn test_battle_mode_uses_target_everywhere() {
    let policy = TranslationPolicy {
        mode: ConversationMode::Battle,
        battle_target: Participant::B,
        bypass_mode: true,
        ..Default::default()
    };
    let req = request("text-model", vec![ChatMessage::text("system", "s"), ChatMessage::text("user", "u")]);
    let payload = translate_request(&req, &session(), &models(), &policy);
    assert_eq!(payload.message_templates.len(), 3);
    assert!(payload.message_templates.iter().all(|t| t.participant == Participant::B));
}

#[test]
fn test_tavern_mode_merges_system_prompts() {
    let policy = TranslationPolicy { tavern_mode: true, ..Default::default() };
    let req = request(
        "text-model",
        vec![
            ChatMessage::text("user", "hello"),
            ChatMessage::text("system", "one"),
            ChatMessage::text("developer", "two"),
        ],
    );
    let payload = translate_request(&req, &session(), &models(), &policy);
    let t = &payload.message_templates;
    assert_eq!(t.len(), 2);
    assert_eq!(t[0].role, Role::System);
    assert_eq!(t[0].content, "one\n\ntwo");
    assert!(t[0].attachments.is_empty());
    assert_eq!(t[1].content, "hello");
}

#[test]
fn test_bypass_mode_only_for_text_models() {
    let policy = TranslationPolicy { bypass_mode: true, ..Default::default() };
    let msgs = vec![ChatMessage::text("user", "draw a cat")];

    let text = translate_request(&request("text-model", msgs.clone()), &session(), &models(), &policy);
    let last = text.message_templates.last().unwrap();
    assert_eq!((last.role, last.content.as_str(), last.participant), (Role::User, " ", Participant::A));

    let image = translate_request(&request("image-model", msgs), &session(), &models(), &policy);
    assert_eq!(image.message_templates.len(), 1);
    assert!(image.is_image_request);
    assert_eq!(image.target_model_id.as_deref(), Some("image-id"));
}

#[test]
fn test_image_bypass_moves_attachments() {
    let req = request(
        "text-model",
        vec![ChatMessage::parts(
            "user",
            vec![ContentPart::text("describe this --bypass"), ContentPart::image("data:image/png;base64,AAAA")],
        )],
    );
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    let t = &payload.message_templates;

    assert_eq!(t.len(), 3);
    assert_eq!((t[0].role, t[0].content.as_str()), (Role::User, "Hi"));
    assert_eq!(t[1].role, Role::Assistant);
    assert_eq!(t[1].content, "");
    assert_eq!(t[1].attachments.len(), 1);
    assert_eq!(t[1].attachments[0].content_type, "image/png");
    assert_eq!((t[2].role, t[2].content.as_str()), (Role::User, "describe this"));
    assert!(t[2].attachments.is_empty());
}

#[test]
fn test_bypass_suffix_without_image_is_untouched() {
    let req = request("text-model", vec![ChatMessage::text("user", "plain --bypass")]);
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    assert_eq!(payload.message_templates.len(), 1);
    assert_eq!(payload.message_templates[0].content, "plain --bypass");
}

#[test]
fn test_unknown_model_has_no_target_id() {
    let req = request("mystery", vec![ChatMessage::text("user", "hi")]);
    let payload = translate_request(&req, &session(), &models(), &TranslationPolicy::default());
    assert!(payload.target_model_id.is_none());
    assert!(!payload.is_image_request);
}

#[test]
fn test_attachment_naming_and_types() {
    let a = request::build_attachment("data:image/jpeg;base64,/9j/", Some("holiday.jpeg"));
    assert_eq!(a.name, "holiday.jpeg");
    assert_eq!(a.content_type, "image/jpeg");

    let b = request::build_attachment("data:image/webp;base64,UklG", Some("auto"));
    assert!(b.name.starts_with("image_") && b.name.ends_with(".webp"));

    assert_eq!(request::content_type_of("https://cdn.example/x/photo.GIF?sig=1"), "image/gif");
    assert_eq!(request::content_type_of("https://cdn.example/blob"), "application/octet-stream");
}

#[test]
fn test_policy_overrides_from_session() {
    let config = BridgeConfig { tavern_mode_enabled: true, ..Default::default() };
    let session = ResolvedSession {
        mode_override: Some(ConversationMode::Battle),
        battle_target_override: Some(Participant::B),
        ..session()
    };
    let policy = TranslationPolicy::resolve(&config, &session);
    assert!(policy.tavern_mode);
    assert_eq!(policy.mode, ConversationMode::Battle);
    assert_eq!(policy.battle_target, Participant::B);

    let policy = TranslationPolicy::resolve(&config, &self::session());
    assert_eq!(policy.mode, ConversationMode::DirectChat);
}

// --- session resolution ---

fn endpoints(json: &str) -> EndpointTable {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_mapped_model_uses_mapping() {
    let table = endpoints(r#"{"m": {"session_id": "ms", "message_id": "mm", "mode": "battle", "battle_target": "b"}}"#);
    let resolved = resolve_session("m", &BridgeConfig::default(), &table).unwrap();
    assert_eq!(resolved.session_id, "ms");
    assert_eq!(resolved.mode_override, Some(ConversationMode::Battle));
    assert_eq!(resolved.battle_target_override, Some(Participant::B));
}

#[test]
fn test_pool_mapping_picks_one_of_them() {
    let table = endpoints(
        r#"{"m": [{"session_id": "s1", "message_id": "m1"}, {"session_id": "s2", "message_id": "m2"}]}"#,
    );
    for _ in 0..20 {
        let resolved = resolve_session("m", &BridgeConfig::default(), &table).unwrap();
        assert!(["s1", "s2"].contains(&resolved.session_id.as_str()));
    }
}

#[test]
fn test_unmapped_model_falls_back_to_defaults() {
    let config = BridgeConfig {
        session_id: Some("ds".into()),
        message_id: Some("dm".into()),
        ..Default::default()
    };
    let resolved = resolve_session("other", &config, &EndpointTable::default()).unwrap();
    assert_eq!((resolved.session_id.as_str(), resolved.message_id.as_str()), ("ds", "dm"));
    assert!(resolved.mode_override.is_none());
}

#[test]
fn test_unmapped_model_without_fallback_is_rejected() {
    let config = BridgeConfig {
        session_id: Some("ds".into()),
        message_id: Some("dm".into()),
        use_default_ids_if_mapping_not_found: false,
        ..Default::default()
    };
    let err = resolve_session("other", &config, &EndpointTable::default()).unwrap_err();
    assert!(matches!(err, BridgeError::SessionNotConfigured { .. }));
    assert_eq!(err.http_status_code(), 400);
}

#[test]
fn test_placeholder_ids_are_rejected() {
    let config = BridgeConfig {
        session_id: Some("YOUR_SESSION_ID".into()),
        message_id: Some("dm".into()),
        ..Default::default()
    };
    assert!(resolve_session("x", &config, &EndpointTable::default()).is_err());
    assert!(resolve_session("x", &BridgeConfig::default(), &EndpointTable::default()).is_err());
}

// --- formatters ---

#[tokio::test]
async fn test_sse_content_then_finish() {
    let sse = sse_text(vec![
        StreamEvent::Content("Hi".into()),
        StreamEvent::Finish("length".into()),
    ])
    .await;

    assert!(sse.ends_with("data: [DONE]\n\n"));
    let chunks = data_lines(&sse);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0]["object"], "chat.completion.chunk");
    assert_eq!(chunks[0]["choices"][0]["delta"]["content"], "Hi");
    assert!(chunks[0]["choices"][0]["finish_reason"].is_null());
    assert_eq!(chunks[1]["choices"][0]["finish_reason"], "length");
    assert_eq!(chunks[1]["choices"][0]["delta"], serde_json::json!({}));
    assert_eq!(chunks[0]["id"], chunks[1]["id"]);
}

#[tokio::test]
async fn test_sse_defaults_to_stop() {
    let chunks = data_lines(&sse_text(vec![StreamEvent::Content("x".into())]).await);
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_sse_content_filter_notice() {
    let chunks = data_lines(&sse_text(vec![StreamEvent::Finish("content-filter".into())]).await);
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0]["choices"][0]["delta"]["content"].as_str().unwrap().contains("terminated"));
    assert_eq!(chunks[1]["choices"][0]["finish_reason"], "content-filter");
}

#[tokio::test]
async fn test_sse_error_stops_stream() {
    let sse = sse_text(vec![
        StreamEvent::Content("partial".into()),
        StreamEvent::Error(BridgeError::RequestTimeout { duration_secs: 360 }),
        StreamEvent::Content("never".into()),
    ])
    .await;

    assert_eq!(sse.matches("data: [DONE]").count(), 1);
    let chunks = data_lines(&sse);
    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks[1]["choices"][0]["delta"]["content"],
        "\n\n[Arena Bridge Error]: Response timed out after 360 seconds."
    );
    assert_eq!(chunks[2]["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_aggregate_success() {
    let collected = collect_events(
        events(vec![StreamEvent::Content("Hi".into()), StreamEvent::Finish("stop".into())]),
        "req",
    )
    .await
    .unwrap();
    assert_eq!(collected, Collected { content: "Hi".into(), finish_reason: "stop".into() });

    let body = serde_json::to_value(build_completion(collected, "text-model")).unwrap();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "Hi");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["usage"]["prompt_tokens"], 0);
}

#[test]
fn test_usage_approximation() {
    let completion = build_completion(
        Collected { content: "abcdefghij".into(), finish_reason: "stop".into() },
        "m",
    );
    assert_eq!(completion.usage.completion_tokens, 2);
    assert_eq!(completion.usage.total_tokens, 2);
}

#[tokio::test]
async fn test_aggregate_content_filter_appends_notice() {
    let collected = collect_events(
        events(vec![StreamEvent::Content("cut".into()), StreamEvent::Finish("content-filter".into())]),
        "req",
    )
    .await
    .unwrap();
    assert!(collected.content.starts_with("cut\n\n"));
    assert_eq!(collected.finish_reason, "content-filter");
}

#[tokio::test]
async fn test_aggregate_oversized_error() {
    let err = collect_events(
        events(vec![StreamEvent::Content("x".into()), StreamEvent::Error(BridgeError::OversizedAttachment)]),
        "req",
    )
    .await
    .unwrap_err();

    assert_eq!(err.http_status_code(), 413);
    let body = error_body(&err);
    assert_eq!(body["error"]["code"], "attachment_too_large");
    assert_eq!(body["error"]["type"], "bridge_error");
    assert!(body["error"]["message"].as_str().unwrap().starts_with("[Arena Bridge Error]: "));
}

#[test]
fn test_generic_error_body() {
    let err = BridgeError::Upstream { message: "boom".into() };
    assert_eq!(err.http_status_code(), 500);
    assert_eq!(error_body(&err)["error"]["code"], "processing_error");
}
