//! The continuation controller: the pipeline's top-level state machine.
//!
//! One logical request is one *pass*:
//! `StreamingPrimary → { ToolDispatch → StreamingContinuation | FallbackStreaming } | Done`.
//! The primary stream is driven through the tool-call detector and the
//! tag-aware scanner; a detected signal hands off to the tool bridge, whose
//! continuation (or fallback) is passed through as plain content. The tool
//! round-trip is a loop over this explicit state machine, not recursion, so
//! recursion depth is bounded to one tool hop per pass.
//!
//! Each `run` spawns one task that owns all per-pass state and feeds a
//! bounded channel; the receiver is the lazy, finite, non-restartable event
//! sequence. Dropping the receiver stops the pass at its next send.

use std::sync::Arc;

use chatloom_core::error::{PipelineError, TransportError};
use chatloom_core::event::{Completion, StreamEvent};
use chatloom_core::tool::{ToolCallSignal, ToolCatalog, ToolInvoker};
use chatloom_core::transport::{FormattedTurn, GenerateRequest, RawChunk, Transport};
use chatloom_core::turn::ChatTurn;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::{BridgeOutcome, ToolBridge};
use crate::detector::detect_tool_call;
use crate::formatter::format_turns;
use crate::response::classify_response;
use crate::scanner::{ScanEvent, TagScanner};

const EVENT_CHANNEL_CAPACITY: usize = 64;

type EventReceiver = mpsc::Receiver<Result<StreamEvent, PipelineError>>;
type EventSender = mpsc::Sender<Result<StreamEvent, PipelineError>>;
type ChunkReceiver = mpsc::Receiver<Result<RawChunk, TransportError>>;

/// One logical generation request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub turns: Vec<ChatTurn>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(turns: Vec<ChatTurn>, model: impl Into<String>) -> Self {
        Self {
            turns,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The streaming inference response pipeline.
///
/// Holds the transport handle plus the optional tool collaborators. One
/// `Pipeline` can serve many concurrent `run` calls; each pass owns its own
/// state and they never interfere.
pub struct Pipeline {
    /// Context id handed to the tool invoker (e.g. a provider profile id).
    id: String,
    transport: Arc<dyn Transport>,
    catalog: Option<Arc<dyn ToolCatalog>>,
    invoker: Option<Arc<dyn ToolInvoker>>,
}

impl Pipeline {
    pub fn new(id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: id.into(),
            transport,
            catalog: None,
            invoker: None,
        }
    }

    /// Attach the tool collaborators. Without them the model is never offered
    /// tools, and any stray signal falls back as an unresolvable call.
    pub fn with_tools(
        mut self,
        catalog: Arc<dyn ToolCatalog>,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        self.catalog = Some(catalog);
        self.invoker = Some(invoker);
        self
    }

    fn check_preconditions(&self, request: &ChatRequest) -> Result<(), PipelineError> {
        if request.model.trim().is_empty() {
            return Err(PipelineError::Precondition("Model ID is required".into()));
        }
        Ok(())
    }

    /// Run one streaming pass.
    ///
    /// Returns the event sequence for the pass, including any tool
    /// round-trip. The sequence terminates normally at stream end, or carries
    /// exactly one terminal `Err` after which nothing else is delivered.
    /// Precondition and request-setup failures are returned eagerly, before
    /// any event exists.
    pub async fn run(&self, request: ChatRequest) -> Result<EventReceiver, PipelineError> {
        self.check_preconditions(&request)?;

        let definitions = match &self.catalog {
            Some(catalog) => catalog.list().await?,
            None => Vec::new(),
        };
        let tools = match &self.catalog {
            Some(catalog) if !definitions.is_empty() => catalog.to_provider_format(&definitions),
            _ => Vec::new(),
        };

        let contents = format_turns(&request.turns);
        debug!(
            transport = %self.transport.name(),
            model = %request.model,
            turns = contents.len(),
            tools = tools.len(),
            "Starting generation pass"
        );

        let primary = GenerateRequest {
            model: request.model.clone(),
            contents: contents.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools,
        };
        let chunks = self.transport.generate_stream(primary).await?;

        let bridge = ToolBridge::new(
            Arc::clone(&self.transport),
            self.invoker.clone(),
            definitions,
            self.id.clone(),
            request.temperature,
            request.max_tokens,
        );
        let driver = PassDriver {
            bridge,
            turns: request.turns,
            contents,
            model: request.model,
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            if let Err(e) = driver.drive(chunks, &tx).await {
                // The one terminal failure; the task ends right after, so
                // nothing can follow it.
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(rx)
    }

    /// Run one non-streaming pass and classify the complete response text.
    pub async fn complete(&self, request: ChatRequest) -> Result<Completion, PipelineError> {
        self.check_preconditions(&request)?;

        let generate = GenerateRequest {
            model: request.model.clone(),
            contents: format_turns(&request.turns),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: Vec::new(),
        };
        let text = self.transport.generate(generate).await?;
        Ok(classify_response(&text))
    }
}

/// The states of one pass. `Done` is terminal for the direct-completion and
/// both post-tool paths.
enum PassState {
    StreamingPrimary(ChunkReceiver),
    ToolDispatch(ToolCallSignal),
    StreamingContinuation(ChunkReceiver),
    FallbackStreaming(ChunkReceiver),
    Done,
}

/// Per-pass state: created at request start, discarded at stream end or
/// error, never shared across requests.
struct PassDriver {
    bridge: ToolBridge,
    turns: Vec<ChatTurn>,
    contents: Vec<FormattedTurn>,
    model: String,
}

impl PassDriver {
    async fn drive(self, chunks: ChunkReceiver, tx: &EventSender) -> Result<(), PipelineError> {
        let mut accumulated = String::new();
        let mut state = PassState::StreamingPrimary(chunks);

        loop {
            state = match state {
                PassState::StreamingPrimary(mut chunks) => {
                    self.stream_primary(&mut chunks, &mut accumulated, tx)
                        .await?
                }
                PassState::ToolDispatch(signal) => {
                    let outcome = self
                        .bridge
                        .dispatch(
                            signal,
                            &self.turns,
                            &self.contents,
                            &accumulated,
                            &self.model,
                            tx,
                        )
                        .await?;
                    match outcome {
                        BridgeOutcome::Continuation(chunks) => {
                            PassState::StreamingContinuation(chunks)
                        }
                        BridgeOutcome::Fallback(chunks) => PassState::FallbackStreaming(chunks),
                        BridgeOutcome::Aborted => PassState::Done,
                    }
                }
                PassState::StreamingContinuation(mut chunks)
                | PassState::FallbackStreaming(mut chunks) => {
                    passthrough(&mut chunks, tx).await?;
                    PassState::Done
                }
                PassState::Done => return Ok(()),
            };
        }
    }

    /// Drive the detector and scanner over the primary stream.
    async fn stream_primary(
        &self,
        chunks: &mut ChunkReceiver,
        accumulated: &mut String,
        tx: &EventSender,
    ) -> Result<PassState, PipelineError> {
        let mut scanner = TagScanner::default();

        while let Some(item) = chunks.recv().await {
            let chunk = item?;

            if let Some(signal) = detect_tool_call(&chunk) {
                debug!(tool = %signal.name, "Tool call detected, abandoning primary stream");
                // Buffered-but-unflushed scanner content is discarded: the
                // model's narration is superseded by the tool result.
                return Ok(PassState::ToolDispatch(signal));
            }

            let Some(text) = chunk.text else { continue };
            if text.is_empty() {
                continue;
            }
            accumulated.push_str(&text);

            for event in scanner.push(&text) {
                if !send_scan_event(tx, event).await {
                    return Ok(PassState::Done);
                }
            }
        }

        // Natural end of the primary stream: flush the trailing buffer.
        if let Some(event) = scanner.finish() {
            send_scan_event(tx, event).await;
        }
        Ok(PassState::Done)
    }
}

/// Pass provider chunks straight through as content events; continuation
/// and fallback streams get no nested tool detection or reasoning scanning.
async fn passthrough(chunks: &mut ChunkReceiver, tx: &EventSender) -> Result<(), PipelineError> {
    while let Some(item) = chunks.recv().await {
        let chunk = item?;
        let Some(text) = chunk.text else { continue };
        if text.is_empty() {
            continue;
        }
        if tx.send(Ok(StreamEvent::content(text))).await.is_err() {
            return Ok(());
        }
    }
    Ok(())
}

async fn send_scan_event(tx: &EventSender, event: ScanEvent) -> bool {
    let event = match event {
        ScanEvent::Content(content) => StreamEvent::Content { content },
        ScanEvent::Reasoning(reasoning_content) => StreamEvent::Reasoning { reasoning_content },
    };
    tx.send(Ok(event)).await.is_ok()
}
