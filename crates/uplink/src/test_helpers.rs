//! Shared fixtures for unit and integration tests.

use futures::StreamExt;
use serde_json::json;

use crate::chat::Message;
use crate::request::{Credential, InvocationConfig, ProviderKind};
use crate::stream::{ChunkStream, FinishReason, StreamChunk, Usage};
use crate::transport::TransportEvent;

/// A well-formed OpenAI credential.
pub fn sample_credential() -> Credential {
    Credential::new(ProviderKind::OpenAi, "sk-test-token")
}

/// A minimal valid config targeting `gpt-4o-mini`.
pub fn sample_config() -> InvocationConfig {
    InvocationConfig {
        model: "gpt-4o-mini".into(),
        ..Default::default()
    }
}

/// A one-turn user conversation.
pub fn sample_messages() -> Vec<Message> {
    vec![Message::user("Say hello.")]
}

/// A complete text response: the given deltas, usage, metadata, and a
/// normal stop.
pub fn text_script(deltas: &[&str]) -> Vec<TransportEvent> {
    let mut events: Vec<TransportEvent> = deltas
        .iter()
        .map(|d| TransportEvent::TextDelta((*d).to_string()))
        .collect();
    events.push(TransportEvent::Usage(Usage {
        input_tokens: 12,
        output_tokens: 7,
    }));
    events.push(TransportEvent::Metadata(json!({"model": "gpt-4o-mini"})));
    events.push(TransportEvent::Done {
        finish_reason: FinishReason::Stop,
        raw: json!({"id": "resp_123"}),
    });
    events
}

/// Drains a chunk stream, panicking on the first stream error.
pub async fn collect_chunks(mut chunks: ChunkStream) -> Vec<StreamChunk> {
    let mut out = Vec::new();
    while let Some(chunk) = chunks.next().await {
        out.push(chunk.expect("stream yielded an error chunk"));
    }
    out
}
