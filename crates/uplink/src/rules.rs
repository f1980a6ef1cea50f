//! Provider-aware validation and normalization rules.
//!
//! Before dispatch, the orchestrator runs the request through a
//! [`RuleEngine`]: an ordered set of rules that may both *check*
//! (push a [`RuleViolation`]) and *rewrite* (transform the working
//! copies of messages and config). The pass is a pure transform: the
//! caller's inputs are never mutated, and the transformed output is
//! returned even when violations exist. Callers must not dispatch when
//! violations are present; the orchestrator turns them into a single
//! aggregated run-error.
//!
//! Every rewrite is a fixed point after one pass: running the engine
//! on its own output yields the same messages, the same config, and no
//! new violations. This keeps retries and replays stable.

use crate::chat::{ContentPart, Message, Role};
use crate::request::{InvocationConfig, ProviderKind};

/// A policy rule rejection. Violations are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Stable rule identifier.
    pub rule: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

/// The result of one validation pass.
#[derive(Debug, Clone)]
pub struct RulePass {
    /// Every rule rejection, in rule order. Empty means dispatchable.
    pub violations: Vec<RuleViolation>,
    /// The transformed message sequence.
    pub messages: Vec<Message>,
    /// The transformed configuration.
    pub config: InvocationConfig,
}

/// Mutable working state threaded through the rules of one pass.
struct PassState {
    kind: ProviderKind,
    messages: Vec<Message>,
    config: InvocationConfig,
    violations: Vec<RuleViolation>,
}

impl PassState {
    fn violate(&mut self, rule: &'static str, message: String) {
        self.violations.push(RuleViolation { rule, message });
    }
}

/// One provider-aware rule. Applied in registration order.
trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, state: &mut PassState);
}

/// The ordered rule set applied before every dispatch.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("RuleEngine").field("rules", &names).finish()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleEngine {
    /// The standard rule set, in application order.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Box::new(SystemFirst),
                Box::new(StripEmptyText),
                Box::new(TemperatureRange),
                Box::new(ImageLimit),
                Box::new(ToolResultPlacement),
            ],
        }
    }

    /// Runs every rule against a working copy of the inputs.
    ///
    /// Returns the transformed messages/config alongside any
    /// violations. The inputs themselves are untouched.
    pub fn validate(
        &self,
        kind: ProviderKind,
        messages: &[Message],
        config: &InvocationConfig,
    ) -> RulePass {
        let mut state = PassState {
            kind,
            messages: messages.to_vec(),
            config: config.clone(),
            violations: Vec::new(),
        };
        for rule in &self.rules {
            rule.apply(&mut state);
        }
        RulePass {
            violations: state.violations,
            messages: state.messages,
            config: state.config,
        }
    }
}

/// Rewrite: system messages are stably moved to the front, where every
/// provider expects them.
struct SystemFirst;

impl Rule for SystemFirst {
    fn name(&self) -> &'static str {
        "system-first"
    }

    fn apply(&self, state: &mut PassState) {
        let (mut system, rest): (Vec<_>, Vec<_>) = state
            .messages
            .drain(..)
            .partition(|m| m.role == Role::System);
        system.extend(rest);
        state.messages = system;
    }
}

/// Rewrite: drops empty text parts. Some providers reject them, none
/// need them. Messages left with no parts are kept; position matters.
struct StripEmptyText;

impl Rule for StripEmptyText {
    fn name(&self) -> &'static str {
        "strip-empty-text"
    }

    fn apply(&self, state: &mut PassState) {
        for message in &mut state.messages {
            message
                .parts
                .retain(|p| !matches!(p, ContentPart::Text { text } if text.is_empty()));
        }
    }
}

/// Check + rewrite: non-finite temperatures are violations; finite ones
/// are clamped into the provider's supported range.
struct TemperatureRange;

impl TemperatureRange {
    fn max_for(kind: ProviderKind) -> f32 {
        match kind {
            ProviderKind::Anthropic => 1.0,
            ProviderKind::OpenAi | ProviderKind::Vertex => 2.0,
        }
    }
}

impl Rule for TemperatureRange {
    fn name(&self) -> &'static str {
        "temperature-range"
    }

    fn apply(&self, state: &mut PassState) {
        let Some(temperature) = state.config.temperature else {
            return;
        };
        if !temperature.is_finite() {
            state.violate(self.name(), "temperature must be a finite number".into());
            return;
        }
        let clamped = temperature.clamp(0.0, Self::max_for(state.kind));
        if clamped != temperature {
            state.config.temperature = Some(clamped);
        }
    }
}

/// Check: providers cap the number of image parts per request.
struct ImageLimit;

impl ImageLimit {
    fn cap_for(kind: ProviderKind) -> usize {
        match kind {
            ProviderKind::OpenAi => 50,
            ProviderKind::Anthropic => 100,
            ProviderKind::Vertex => 16,
        }
    }
}

impl Rule for ImageLimit {
    fn name(&self) -> &'static str {
        "image-limit"
    }

    fn apply(&self, state: &mut PassState) {
        let cap = Self::cap_for(state.kind);
        let count: usize = state.messages.iter().map(Message::image_count).sum();
        if count > cap {
            state.violate(
                self.name(),
                format!("{} accepts at most {cap} image parts per request, got {count}", state.kind),
            );
        }
    }
}

/// Check: a tool-result message must directly follow the assistant
/// message that invoked it (or another tool result from the same turn).
struct ToolResultPlacement;

impl Rule for ToolResultPlacement {
    fn name(&self) -> &'static str {
        "tool-result-placement"
    }

    fn apply(&self, state: &mut PassState) {
        let mut bad_positions = Vec::new();
        for (i, message) in state.messages.iter().enumerate() {
            if message.role != Role::Tool {
                continue;
            }
            let preceded = i > 0
                && matches!(state.messages[i - 1].role, Role::Assistant | Role::Tool);
            if !preceded {
                bad_positions.push(i);
            }
        }
        for i in bad_positions {
            state.violate(
                self.name(),
                format!("tool result at position {i} must directly follow the assistant message that invoked it"),
            );
        }
    }
}
