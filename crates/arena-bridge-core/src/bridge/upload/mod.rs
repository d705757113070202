//! Attachment pre-processing before a payload is sent.

mod file_bed;

use arena_bridge_types::protocol::{ChatCompletionRequest, ContentPart, MessageContent};
use arena_bridge_types::BridgeError;
use async_trait::async_trait;

pub use file_bed::{build_http_client, FileBedClient};

use crate::bridge::mappers::openai::request::looks_like_file_name;

/// Storage for inline attachments.
#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    /// Upload a base64 data URI and return the URL it is reachable at.
    async fn upload(&self, file_name: &str, data_uri: &str) -> Result<String, BridgeError>;
}

/// Replace every inline (`data:`) image in `request` with an uploaded URL.
///
/// Uploads run sequentially; the first failure aborts the request. Images
/// that are already remote URLs are left as they are.
pub async fn upload_inline_images(
    request: &mut ChatCompletionRequest,
    uploader: &dyn AttachmentUploader,
) -> Result<usize, BridgeError> {
    let mut uploaded = 0;

    for message in &mut request.messages {
        let Some(MessageContent::Parts(parts)) = &mut message.content else {
            continue;
        };
        for part in parts.iter_mut() {
            let ContentPart::ImageUrl { image_url } = part else {
                continue;
            };
            if !image_url.url.starts_with("data:") {
                tracing::debug!("Keeping remote image URL as is");
                continue;
            }

            let file_name = match image_url.detail.as_deref().filter(|d| looks_like_file_name(d)) {
                Some(name) => name.to_string(),
                None => format!("image_{}.png", uuid::Uuid::new_v4()),
            };
            tracing::info!("Uploading attachment '{}' to the file bed", file_name);
            image_url.url = uploader.upload(&file_name, &image_url.url).await?;
            uploaded += 1;
        }
    }
    Ok(uploaded)
}
