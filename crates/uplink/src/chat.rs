//! Messages and content parts.
//!
//! A [`Message`] is a role plus an ordered sequence of [`ContentPart`]s.
//! Part order is significant: providers receive parts exactly as the
//! caller supplied them, unless a validation rule explicitly rewrites
//! the sequence (see [`rules`](crate::rules)).
//!
//! # Construction
//!
//! ```rust
//! use uplink::chat::{ContentPart, ImageSource, Message};
//!
//! let msgs = vec![
//!     Message::system("You are terse."),
//!     Message::user("Describe this image"),
//!     Message::with_parts(
//!         uplink::chat::Role::User,
//!         vec![ContentPart::Image {
//!             source: ImageSource::Url { url: "https://example.com/cat.png".into() },
//!         }],
//!     ),
//! ];
//! assert_eq!(msgs.len(), 3);
//! ```

use serde::{Deserialize, Serialize};

/// The author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
    /// A tool result being fed back to the model.
    Tool,
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// A fetchable URL or a `data:` URI.
    Url {
        /// The image location.
        url: String,
    },
    /// Inline base64-encoded bytes.
    Data {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type, e.g. `"image/png"`.
        media_type: String,
    },
}

/// One element of a message's content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image, by URL or inline bytes.
    Image {
        /// The image payload.
        source: ImageSource,
    },
    /// An arbitrary file attachment.
    File {
        /// Base64-encoded file bytes.
        data: String,
        /// MIME type, e.g. `"application/pdf"`.
        media_type: String,
    },
}

impl ContentPart {
    /// Shorthand for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A single conversation turn.
///
/// Messages are immutable inputs: the rule engine produces transformed
/// copies and never mutates the caller's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this turn.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<ContentPart>,
    /// For [`Role::Tool`] messages, the id of the tool call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// A message with explicit role and parts.
    pub fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            parts,
            tool_call_id: None,
        }
    }

    /// A system message with a single text part.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::text(text)])
    }

    /// A user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::text(text)])
    }

    /// An assistant message with a single text part.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// A tool-result message answering the given tool call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![ContentPart::text(content)],
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Concatenated text of all [`ContentPart::Text`] parts, or `None`
    /// if the message has no text parts.
    pub fn text(&self) -> Option<String> {
        let mut out = String::new();
        let mut any = false;
        for part in &self.parts {
            if let ContentPart::Text { text } = part {
                out.push_str(text);
                any = true;
            }
        }
        any.then_some(out)
    }

    /// Number of image parts in this message.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::Image { .. }))
            .count()
    }
}
