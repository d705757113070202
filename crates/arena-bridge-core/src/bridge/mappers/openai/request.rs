//! OpenAI request → arena conversation payload.
//!
//! Pure transformation, no I/O. Attachments must already be uploaded (or
//! left inline) by the time a request reaches [`translate_request`].

use arena_bridge_types::protocol::{
    Attachment, ChatCompletionRequest, ChatMessage, ContentPart, ConversationPayload, MessageContent,
    MessageTemplate, Role,
};
use arena_bridge_types::{BridgeConfig, ConversationMode, Modality, ModelTable, Participant};
use uuid::Uuid;

use super::session::ResolvedSession;

/// Suffix on the last user message that requests the image bypass trick.
pub const BYPASS_SUFFIX: &str = "--bypass";

/// Conversation shaping switches for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationPolicy {
    /// Merge all system prompts into one leading system turn
    pub tavern_mode: bool,
    /// Append an empty user turn (text models only)
    pub bypass_mode: bool,
    pub mode: ConversationMode,
    pub battle_target: Participant,
}

impl TranslationPolicy {
    /// Global config, overridden by the per-model mode of the chosen session.
    pub fn resolve(config: &BridgeConfig, session: &ResolvedSession) -> Self {
        Self {
            tavern_mode: config.tavern_mode_enabled,
            bypass_mode: config.bypass_enabled,
            mode: session.mode_override.unwrap_or(config.mode),
            battle_target: session.battle_target_override.unwrap_or(config.battle_target),
        }
    }
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        Self {
            tavern_mode: false,
            bypass_mode: false,
            mode: ConversationMode::DirectChat,
            battle_target: Participant::A,
        }
    }
}

/// Build the payload sent to the agent.
pub fn translate_request(
    request: &ChatCompletionRequest,
    session: &ResolvedSession,
    models: &ModelTable,
    policy: &TranslationPolicy,
) -> ConversationPayload {
    let mut templates: Vec<MessageTemplate> = request.messages.iter().map(convert_message).collect();

    if policy.tavern_mode {
        templates = merge_system_prompts(templates);
    }

    let entry = models.get(&request.model);
    let target_model_id = entry.and_then(|e| e.id.clone());
    if target_model_id.is_none() {
        tracing::warn!("Model '{}' has no id in the model table, sending without one", request.model);
    }
    let modality = entry.map(|e| e.modality).unwrap_or_default();

    apply_image_bypass(&mut templates);

    if policy.bypass_mode && modality == Modality::Text {
        tracing::debug!("Bypass mode: appending empty user turn");
        templates.push(MessageTemplate::new(Role::User, " "));
    }

    assign_participants(&mut templates, policy.mode, policy.battle_target);

    ConversationPayload {
        message_templates: templates,
        target_model_id,
        session_id: session.session_id.clone(),
        message_id: session.message_id.clone(),
        is_image_request: modality == Modality::Image,
    }
}

/// Split one OpenAI message into text and attachments.
pub fn convert_message(message: &ChatMessage) -> MessageTemplate {
    let role = Role::normalize(&message.role);
    let mut attachments = Vec::new();

    let mut content = match &message.content {
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Parts(parts)) => {
            let mut texts = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text } => texts.push(text.as_str()),
                    ContentPart::ImageUrl { image_url } => {
                        attachments.push(build_attachment(&image_url.url, image_url.detail.as_deref()))
                    },
                    _ => tracing::debug!("Dropping unsupported content part"),
                }
            }
            texts.join("\n\n")
        },
        _ => String::new(),
    };

    if role == Role::User && content.trim().is_empty() {
        content = " ".to_string();
    }

    MessageTemplate { role, content, attachments, participant: Participant::A }
}

/// Attachment for an image URL (data URI or remote reference).
pub fn build_attachment(url: &str, detail: Option<&str>) -> Attachment {
    let content_type = content_type_of(url);
    let name = match detail.filter(|d| looks_like_file_name(d)) {
        Some(name) => name.to_string(),
        None => format!("image_{}.{}", Uuid::new_v4(), extension_for(&content_type)),
    };
    Attachment { name, content_type, url: url.to_string() }
}

/// MIME type from a data URI header, else from the URL's extension.
pub fn content_type_of(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("data:") {
        let mime = rest.split([';', ',']).next().unwrap_or_default();
        if !mime.is_empty() {
            return mime.to_string();
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    let mime = match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    };
    mime.to_string()
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => "png",
    }
}

/// `detail` usually carries `auto`/`low`/`high`; only treat it as a name
/// when it has an extension.
pub(crate) fn looks_like_file_name(detail: &str) -> bool {
    let detail = detail.trim();
    !detail.is_empty()
        && !detail.contains(['/', '\\'])
        && detail.rsplit_once('.').is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
}

/// Tavern mode: one leading system turn holding every system prompt.
fn merge_system_prompts(templates: Vec<MessageTemplate>) -> Vec<MessageTemplate> {
    let (system, rest): (Vec<_>, Vec<_>) = templates.into_iter().partition(|t| t.role == Role::System);

    let merged = system.iter().map(|t| t.content.as_str()).collect::<Vec<_>>().join("\n\n");
    let mut out = Vec::with_capacity(rest.len() + 1);
    if !merged.is_empty() {
        out.push(MessageTemplate::new(Role::System, merged));
    }
    out.extend(rest);
    out
}

/// `--bypass` on a last user turn with images: move the images into an empty
/// assistant turn placed right before it.
fn apply_image_bypass(templates: &mut Vec<MessageTemplate>) {
    let Some(last) = templates.last_mut() else {
        return;
    };
    if last.role != Role::User || !last.attachments.iter().any(Attachment::is_image) {
        return;
    }
    let Some(stripped) = last.content.trim().strip_suffix(BYPASS_SUFFIX) else {
        return;
    };

    tracing::info!("Image bypass requested, moving attachments into a synthetic assistant turn");
    last.content = stripped.trim().to_string();
    let mut assistant = MessageTemplate::new(Role::Assistant, "");
    assistant.attachments = std::mem::take(&mut last.attachments);

    let at = templates.len() - 1;
    templates.insert(at, assistant);

    if templates.first().is_some_and(|t| t.role == Role::Assistant) {
        templates.insert(0, MessageTemplate::new(Role::User, "Hi"));
    }
}

/// Tag every turn with its participant side.
fn assign_participants(templates: &mut [MessageTemplate], mode: ConversationMode, target: Participant) {
    for template in templates {
        template.participant = match (mode, template.role) {
            (ConversationMode::Battle, _) => target,
            (ConversationMode::DirectChat, Role::System) => Participant::B,
            (ConversationMode::DirectChat, _) => Participant::A,
        };
    }
}
