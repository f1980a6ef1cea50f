//! Optional diagnostic channel for request/stream observability.
//!
//! Gated by the explicit `diagnostics` flag on
//! [`InvokeRequest`](crate::invoke::InvokeRequest); never default-on,
//! no ambient global. Emits `tracing` events on the `uplink::diag`
//! target: a size-truncated snapshot of the outbound request before
//! dispatch, and the provider metadata plus finish reason once they
//! resolve. Pure side channel; it never alters control flow or
//! returned values.
//!
//! Every content part is clipped to [`MAX_PART_LEN`] characters,
//! including image URLs, data URIs, and file payloads, so a single
//! request can't flood the log.

use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::chat::{ContentPart, ImageSource, Message};
use crate::request::InvocationConfig;
use crate::stream::FinishReason;

/// Character cap applied to every snapshotted content part.
pub(crate) const MAX_PART_LEN: usize = 256;

/// Logs a truncated snapshot of the outbound request.
pub(crate) fn log_request(messages: &[Message], config: &InvocationConfig) {
    let snapshot = json!({
        "model": config.model,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "output_mode": config.output_mode,
        "has_schema": config.output_schema.is_some(),
        "tools": config.tools.as_ref().map(|t| t.keys().collect::<Vec<_>>()),
        "provider_options": config
            .provider_options
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(clip(&v.to_string()))))
            .collect::<serde_json::Map<_, _>>(),
        "messages": messages.iter().map(snapshot_message).collect::<Vec<_>>(),
    });
    tracing::debug!(target: "uplink::diag", request = %snapshot, "dispatching request");
}

/// Best-effort observer for post-dispatch stream results.
///
/// The stream driver hands metadata and finish reason to
/// [`observe`](Self::observe) when the stream settles; a detached task
/// logs them. Dropping the tap without observing is harmless.
pub(crate) struct DiagTap {
    metadata: oneshot::Sender<Value>,
    finish: oneshot::Sender<FinishReason>,
}

impl DiagTap {
    /// Forwards the settled values to the logging task.
    pub(crate) fn observe(self, metadata: Value, reason: FinishReason) {
        let _ = self.metadata.send(metadata);
        let _ = self.finish.send(reason);
    }
}

/// Spawns the logging task and returns its tap.
pub(crate) fn spawn_observer() -> DiagTap {
    let (meta_tx, meta_rx) = oneshot::channel::<Value>();
    let (finish_tx, finish_rx) = oneshot::channel::<FinishReason>();
    tokio::spawn(async move {
        if let Ok(metadata) = meta_rx.await {
            tracing::debug!(target: "uplink::diag", metadata = %metadata, "provider metadata resolved");
        }
        if let Ok(reason) = finish_rx.await {
            tracing::debug!(target: "uplink::diag", finish_reason = ?reason, "stream finished");
        }
    });
    DiagTap {
        metadata: meta_tx,
        finish: finish_tx,
    }
}

fn snapshot_message(message: &Message) -> Value {
    json!({
        "role": message.role,
        "parts": message.parts.iter().map(snapshot_part).collect::<Vec<_>>(),
    })
}

fn snapshot_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": clip(text)}),
        ContentPart::Image {
            source: ImageSource::Url { url },
        } => json!({"type": "image", "url": clip(url)}),
        ContentPart::Image {
            source: ImageSource::Data { data, media_type },
        } => json!({"type": "image", "data": clip(data), "media_type": media_type}),
        ContentPart::File { data, media_type } => {
            json!({"type": "file", "data": clip(data), "media_type": media_type})
        }
    }
}

/// Clips to [`MAX_PART_LEN`] characters on a char boundary.
fn clip(s: &str) -> String {
    match s.char_indices().nth(MAX_PART_LEN) {
        Some((byte_idx, _)) => format!("{}…", &s[..byte_idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_clip_short_string_unchanged() {
        assert_eq!(clip("hello"), "hello");
    }

    #[test]
    fn test_clip_long_string() {
        let long = "x".repeat(1000);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_PART_LEN + 1); // cap + ellipsis
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn test_clip_multibyte_boundary() {
        let long = "é".repeat(MAX_PART_LEN + 10);
        let clipped = clip(&long);
        assert!(clipped.ends_with('…'));
        assert_eq!(clipped.chars().count(), MAX_PART_LEN + 1);
    }

    #[test]
    fn test_snapshot_truncates_image_url() {
        let url = format!("data:image/png;base64,{}", "A".repeat(10_000));
        let part = ContentPart::Image {
            source: ImageSource::Url { url },
        };
        let snap = snapshot_part(&part);
        let logged = snap["url"].as_str().unwrap();
        assert!(logged.chars().count() <= MAX_PART_LEN + 1);
    }

    #[test]
    fn test_snapshot_truncates_file_data() {
        let part = ContentPart::File {
            data: "Zg==".repeat(5_000),
            media_type: "application/pdf".into(),
        };
        let snap = snapshot_part(&part);
        assert!(snap["data"].as_str().unwrap().chars().count() <= MAX_PART_LEN + 1);
        assert_eq!(snap["media_type"], "application/pdf");
    }

    #[test]
    fn test_snapshot_message_shape() {
        let m = Message::with_parts(Role::User, vec![ContentPart::text("hi")]);
        let snap = snapshot_message(&m);
        assert_eq!(snap["role"], "user");
        assert_eq!(snap["parts"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_observer_tap_is_fire_and_forget() {
        let tap = spawn_observer();
        tap.observe(serde_json::json!({"id": "r1"}), FinishReason::Stop);
        // Dropping a fresh tap without observing must also be fine.
        let _unused = spawn_observer();
    }
}
