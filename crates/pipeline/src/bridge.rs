//! Tool bridge: turns a detected call signal into an external tool
//! invocation and re-enters generation with the tool's result.
//!
//! Every phase boundary is announced to the consumer with a bracketed marker
//! event, so a UI can show "calling tool X" / "tool X responded" / "resuming"
//! without parsing the continuation text. On any tool failure the bridge
//! issues exactly one fallback generation call against the original turns
//! plus an explanatory note; the fallback itself is never retried.

use std::sync::Arc;

use chatloom_core::error::{PipelineError, ToolError, TransportError};
use chatloom_core::event::StreamEvent;
use chatloom_core::tool::{ToolCallSignal, ToolDefinition, ToolInvoker};
use chatloom_core::transport::{FormattedTurn, GenerateRequest, RawChunk, Transport};
use chatloom_core::turn::ChatTurn;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::formatter::format_turns;

type EventSender = mpsc::Sender<Result<StreamEvent, PipelineError>>;
type ChunkReceiver = mpsc::Receiver<Result<RawChunk, TransportError>>;

/// Where the pass goes after tool dispatch.
pub enum BridgeOutcome {
    /// The tool ran; stream this continuation through as plain content.
    Continuation(ChunkReceiver),
    /// The tool failed; stream the one-shot fallback through as plain content.
    Fallback(ChunkReceiver),
    /// The consumer stopped draining; end the pass quietly.
    Aborted,
}

/// One pass's tool-dispatch collaborator handles, plus the sampling
/// parameters the continuation and fallback requests must carry over.
pub struct ToolBridge {
    transport: Arc<dyn Transport>,
    invoker: Option<Arc<dyn ToolInvoker>>,
    definitions: Vec<ToolDefinition>,
    context_id: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ToolBridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        invoker: Option<Arc<dyn ToolInvoker>>,
        definitions: Vec<ToolDefinition>,
        context_id: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            transport,
            invoker,
            definitions,
            context_id,
            temperature,
            max_tokens,
        }
    }

    /// A no-tools request carrying the pass's sampling parameters.
    fn plain_request(&self, model: &str, contents: Vec<FormattedTurn>) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            contents,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
        }
    }

    /// Run the full bridge sequence for one detected signal.
    ///
    /// `original_turns` and `primary_contents` are the pre-tool conversation
    /// (raw and formatted); `accumulated` is the text produced before the
    /// interruption, used only to synthesize the assistant turn.
    pub async fn dispatch(
        &self,
        signal: ToolCallSignal,
        original_turns: &[ChatTurn],
        primary_contents: &[FormattedTurn],
        accumulated: &str,
        model: &str,
        tx: &EventSender,
    ) -> Result<BridgeOutcome, PipelineError> {
        let name = signal.name.clone();

        if !announce(tx, &name, format!("\n<tool_call name=\"{name}\">\n")).await {
            return Ok(BridgeOutcome::Aborted);
        }

        match self.execute(&signal).await {
            Ok(result_text) => {
                debug!(tool = %name, "Tool call succeeded");

                if !announce(tx, &name, format!("\n<tool_response name=\"{name}\">\n")).await {
                    return Ok(BridgeOutcome::Aborted);
                }

                // The model's pre-tool narration is superseded by the tool
                // result; it survives only inside the synthesized turn.
                let assistant_text = if accumulated.is_empty() {
                    format!("I will use the {name} tool to answer your question.")
                } else {
                    accumulated.to_string()
                };

                let mut extended = original_turns.to_vec();
                extended.push(ChatTurn::assistant(assistant_text));
                extended.push(ChatTurn::user(format!(
                    "Result of calling tool {name}: {result_text}"
                )));

                if !announce(tx, &name, format!("\n<tool_call_end name=\"{name}\">\n")).await {
                    return Ok(BridgeOutcome::Aborted);
                }

                let request = self.plain_request(model, format_turns(&extended));
                let chunks = self.transport.generate_stream(request).await?;
                Ok(BridgeOutcome::Continuation(chunks))
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed, falling back");
                let message = e.to_string();

                let event = StreamEvent::ToolCalling {
                    content: format!("\n<tool_call_error name=\"{name}\" error=\"{message}\">\n"),
                    tool_calling_content: message.clone(),
                };
                if tx.send(Ok(event)).await.is_err() {
                    return Ok(BridgeOutcome::Aborted);
                }

                // Fallback against the pre-tool conversation only: the
                // tool-result turn must never appear in this request.
                let mut contents = primary_contents.to_vec();
                contents.push(FormattedTurn::user_text(format!(
                    "Note: my attempt to call a tool failed with error: {message}. \
                     Answer the user's question directly without using tools."
                )));

                let request = self.plain_request(model, contents);
                let chunks = self.transport.generate_stream(request).await?;
                Ok(BridgeOutcome::Fallback(chunks))
            }
        }
    }

    /// Resolve, invoke, and serialize one tool call.
    async fn execute(&self, signal: &ToolCallSignal) -> Result<String, ToolError> {
        let invoker = self
            .invoker
            .as_ref()
            .ok_or_else(|| ToolError::Unresolved("no tool invoker configured".into()))?;

        let resolved = invoker
            .resolve(&self.definitions, signal, &self.context_id)
            .await?
            .ok_or_else(|| ToolError::Unresolved(signal.name.clone()))?;

        let result = invoker.invoke(resolved).await?;
        result.to_text()
    }
}

/// Send one phase-marker event; returns false when the consumer is gone.
async fn announce(tx: &EventSender, name: &str, content: String) -> bool {
    let event = StreamEvent::ToolCalling {
        content,
        tool_calling_content: name.to_string(),
    };
    tx.send(Ok(event)).await.is_ok()
}
