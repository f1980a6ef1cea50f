//! The normalized streaming result shape.
//!
//! Every provider's transport produces its own stream layout; the
//! driver in this module wraps a raw
//! [`TransportStream`](crate::transport::TransportStream) into one
//! uniform [`StreamHandle`] so downstream code never branches on
//! provider kind.
//!
//! A handle exposes two things:
//!
//! - a forward-only, consume-once chunk stream
//!   ([`chunks`](StreamHandle::chunks)) of smoothed text or
//!   structured-object deltas, and
//! - deferred accessors ([`Deferred`]) for the final text, usage
//!   counters, tool-call records, finish reason, provider metadata,
//!   and raw response envelope. Each settles independently once the
//!   underlying stream finishes, fails, or is cancelled, never left
//!   pending.
//!
//! # Consuming a handle
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use uplink::stream::{StreamChunk, StreamHandle};
//!
//! async fn print_stream(mut handle: StreamHandle) {
//!     while let Some(chunk) = handle.chunks.next().await {
//!         if let Ok(StreamChunk::Text(text)) = chunk {
//!             print!("{text}");
//!         }
//!     }
//!     let reason = handle.finish_reason.wait().await;
//!     println!("\n[done: {reason:?}]");
//! }
//! ```

use std::fmt;
use std::ops::AddAssign;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::diag::DiagTap;
use crate::error::{self, InvokeError};
use crate::transport::{TransportEvent, TransportStream};

/// A pinned, boxed, `Send` stream of normalized chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, InvokeError>> + Send>>;

/// One increment of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StreamChunk {
    /// A smoothed fragment of free-text output.
    Text(String),
    /// A partial structured-object value.
    Object(Value),
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the request.
    pub input_tokens: u64,
    /// Tokens generated in the response.
    pub output_tokens: u64,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// A tool invocation recorded during generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-assigned call identifier.
    pub id: String,
    /// The tool's name.
    pub name: String,
    /// Parsed call arguments.
    pub arguments: Value,
}

/// Why the stream stopped producing chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FinishReason {
    /// Natural end of generation.
    Stop,
    /// The token limit was reached.
    Length,
    /// The model stopped to call tools.
    ToolCalls,
    /// The provider filtered the output.
    ContentFilter,
    /// The caller's abort signal fired.
    Cancelled,
    /// The stream failed mid-flight.
    Error,
    /// A provider-specific reason with no normalized mapping.
    Other(String),
}

/// A single-consumption deferred value that settles when the stream does.
///
/// Backed by a oneshot channel filled by the stream driver. If the
/// driver vanishes without settling (it shouldn't), waiting yields an
/// [`InvokeError::Unknown`] instead of hanging.
pub struct Deferred<T>(oneshot::Receiver<Result<T, InvokeError>>);

impl<T> Deferred<T> {
    /// Waits for the value, consuming the accessor.
    pub async fn wait(self) -> Result<T, InvokeError> {
        match self.0.await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::Unknown(
                "stream driver dropped before settling".into(),
            )),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

fn deferred<T>() -> (oneshot::Sender<Result<T, InvokeError>>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();
    (tx, Deferred(rx))
}

/// The provider-independent view over one in-flight generation.
///
/// A handle belongs to exactly one invocation and is consumed once,
/// forward-only. Fields are public so callers can move each accessor
/// out and await them independently.
pub struct StreamHandle {
    /// The chunk stream; terminates at the finish reason.
    pub chunks: ChunkStream,
    /// Full concatenated text, settled at stream end.
    pub final_text: Deferred<String>,
    /// Accumulated usage counters.
    pub usage: Deferred<Usage>,
    /// Tool calls recorded during generation.
    pub tool_calls: Deferred<Vec<ToolCallRecord>>,
    /// Why generation stopped.
    pub finish_reason: Deferred<FinishReason>,
    /// Provider-specific response metadata.
    pub provider_metadata: Deferred<Value>,
    /// The raw response envelope.
    pub raw_response: Deferred<Value>,
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamHandle(..)")
    }
}

/// Re-chunks incremental text onto word boundaries.
///
/// Raw provider deltas split mid-word; buffering until whitespace makes
/// incremental rendering stable. `flush` returns whatever remains when
/// the stream ends.
#[derive(Debug, Default)]
pub struct TextSmoother {
    buffer: String,
}

impl TextSmoother {
    /// Appends a delta and returns the complete words now available.
    /// Each emitted piece keeps its trailing whitespace.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.find(char::is_whitespace) {
            let ws_len = self.buffer[pos..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            let piece: String = self.buffer.drain(..pos + ws_len).collect();
            out.push(piece);
        }
        out
    }

    /// Returns the unemitted remainder, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Everything the driver must settle exactly once.
struct Settlers {
    final_text: oneshot::Sender<Result<String, InvokeError>>,
    usage: oneshot::Sender<Result<Usage, InvokeError>>,
    tool_calls: oneshot::Sender<Result<Vec<ToolCallRecord>, InvokeError>>,
    finish_reason: oneshot::Sender<Result<FinishReason, InvokeError>>,
    provider_metadata: oneshot::Sender<Result<Value, InvokeError>>,
    raw_response: oneshot::Sender<Result<Value, InvokeError>>,
}

/// Accumulated stream state, handed to the settlers at the end.
#[derive(Default)]
struct Accumulated {
    text: String,
    usage: Usage,
    tool_calls: Vec<ToolCallRecord>,
    metadata: Value,
    raw: Value,
}

impl Settlers {
    fn settle_ok(self, acc: Accumulated, reason: FinishReason, tap: Option<DiagTap>) {
        if let Some(tap) = tap {
            tap.observe(acc.metadata.clone(), reason.clone());
        }
        let _ = self.final_text.send(Ok(acc.text));
        let _ = self.usage.send(Ok(acc.usage));
        let _ = self.tool_calls.send(Ok(acc.tool_calls));
        let _ = self.finish_reason.send(Ok(reason));
        let _ = self.provider_metadata.send(Ok(acc.metadata));
        let _ = self.raw_response.send(Ok(acc.raw));
    }

    fn settle_err(self, err: InvokeError, tap: Option<DiagTap>) {
        if let Some(tap) = tap {
            tap.observe(Value::Null, FinishReason::Error);
        }
        let _ = self.final_text.send(Err(err.clone()));
        let _ = self.usage.send(Err(err.clone()));
        let _ = self.tool_calls.send(Err(err.clone()));
        let _ = self.finish_reason.send(Err(err.clone()));
        let _ = self.provider_metadata.send(Err(err.clone()));
        let _ = self.raw_response.send(Err(err));
    }
}

/// Wraps a raw transport stream into a [`StreamHandle`].
///
/// Spawns the driver task that forwards smoothed chunks, accumulates
/// the deferred values, and settles every accessor exactly once. After
/// `cancel` fires, no further chunk is produced and all accessors
/// settle with [`FinishReason::Cancelled`].
pub(crate) fn wrap_stream(
    stream: TransportStream,
    cancel: CancellationToken,
    tap: Option<DiagTap>,
) -> StreamHandle {
    let (chunk_tx, chunk_rx) = mpsc::channel::<Result<StreamChunk, InvokeError>>(32);

    let (text_tx, final_text) = deferred();
    let (usage_tx, usage) = deferred();
    let (calls_tx, tool_calls) = deferred();
    let (finish_tx, finish_reason) = deferred();
    let (meta_tx, provider_metadata) = deferred();
    let (raw_tx, raw_response) = deferred();

    let settlers = Settlers {
        final_text: text_tx,
        usage: usage_tx,
        tool_calls: calls_tx,
        finish_reason: finish_tx,
        provider_metadata: meta_tx,
        raw_response: raw_tx,
    };

    tokio::spawn(drive(stream, cancel, chunk_tx, settlers, tap));

    let chunks = futures::stream::unfold(chunk_rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    StreamHandle {
        chunks: Box::pin(chunks),
        final_text,
        usage,
        tool_calls,
        finish_reason,
        provider_metadata,
        raw_response,
    }
}

async fn drive(
    mut stream: TransportStream,
    cancel: CancellationToken,
    chunks: mpsc::Sender<Result<StreamChunk, InvokeError>>,
    settlers: Settlers,
    tap: Option<DiagTap>,
) {
    let mut smoother = TextSmoother::default();
    let mut acc = Accumulated::default();
    let mut reason = FinishReason::Stop;
    let mut interrupted = false;

    let outcome: Result<(), InvokeError> = loop {
        // Check cancellation first so no chunk escapes after the signal.
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                reason = FinishReason::Cancelled;
                interrupted = true;
                break Ok(());
            }
            event = stream.next() => event,
        };

        match event {
            None => break Ok(()),
            Some(Ok(TransportEvent::TextDelta(delta))) => {
                acc.text.push_str(&delta);
                for piece in smoother.push(&delta) {
                    // A dropped receiver only means nobody is watching
                    // chunks; the deferred accessors must still settle.
                    let _ = chunks.send(Ok(StreamChunk::Text(piece))).await;
                }
            }
            Some(Ok(TransportEvent::ObjectDelta(value))) => {
                let _ = chunks.send(Ok(StreamChunk::Object(value))).await;
            }
            Some(Ok(TransportEvent::ToolCall(record))) => acc.tool_calls.push(record),
            Some(Ok(TransportEvent::Usage(usage))) => acc.usage += usage,
            Some(Ok(TransportEvent::Metadata(value))) => acc.metadata = value,
            Some(Ok(TransportEvent::Done { finish_reason, raw })) => {
                reason = finish_reason;
                acc.raw = raw;
                break Ok(());
            }
            Some(Err(transport_err)) => {
                let err = error::translate(transport_err);
                let _ = chunks.send(Err(err.clone())).await;
                break Err(err);
            }
        }
    };

    // Flush the buffered remainder only on a natural end. After
    // cancellation or an error no further chunk may be produced; the
    // remainder is already in `acc.text`, so `final_text` loses nothing.
    if outcome.is_ok() && !interrupted {
        if let Some(rest) = smoother.flush() {
            let _ = chunks.send(Ok(StreamChunk::Text(rest))).await;
        }
    }

    match outcome {
        Ok(()) => settlers.settle_ok(acc, reason, tap),
        Err(err) => settlers.settle_err(err, tap),
    }
}
