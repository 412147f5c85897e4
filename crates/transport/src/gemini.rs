//! Gemini transport implementation.
//!
//! Talks to the `generativelanguage` REST API:
//! - `{model}:generateContent` for one-shot generation
//! - `{model}:streamGenerateContent?alt=sse` for streaming
//!
//! Any `functionCall` part in a chunk is decoded here, at the transport
//! boundary, into `RawChunk::function_call`, so the pipeline never inspects
//! provider payload shapes.

use async_trait::async_trait;
use chatloom_core::error::TransportError;
use chatloom_core::tool::ToolCallSignal;
use chatloom_core::transport::{
    FormattedRole, FormattedTurn, GenerateRequest, ProviderToolSchema, RawChunk, Transport,
    TurnPart,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::ProviderProfile;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini-style HTTP transport.
///
/// Each request builds its own URL and body from scratch; the transport
/// itself holds no per-request state, so one instance can serve concurrent
/// pipelines.
#[derive(Debug)]
pub struct GeminiTransport {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiTransport {
    /// Build a transport from a provider profile.
    pub fn new(profile: &ProviderProfile) -> Result<Self, TransportError> {
        if !profile.enabled {
            return Err(TransportError::NotConfigured(format!(
                "provider profile '{}' is disabled",
                profile.id
            )));
        }
        if profile.api_key.trim().is_empty() {
            return Err(TransportError::NotConfigured(format!(
                "provider profile '{}' has no API key",
                profile.id
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| TransportError::NotConfigured(e.to_string()))?;

        Ok(Self {
            name: profile.id.clone(),
            base_url: profile
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: profile.api_key.clone(),
            client,
        })
    }

    fn url(&self, model: &str, method: &str, sse: bool) -> String {
        let suffix = if sse { "?alt=sse" } else { "" };
        format!("{}/{}:{}{}", self.base_url, model, method, suffix)
    }

    fn build_body(request: &GenerateRequest) -> ApiRequest {
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(ApiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        let (tools, tool_config) = if request.tools.is_empty() {
            (None, None)
        } else {
            (
                Some(vec![ApiTool {
                    function_declarations: request.tools.iter().map(to_declaration).collect(),
                }]),
                // Let the model decide whether to call a tool.
                Some(ApiToolConfig {
                    function_calling_config: ApiFunctionCallingConfig { mode: "AUTO".into() },
                }),
            )
        };

        ApiRequest {
            contents: request.contents.iter().map(to_api_content).collect(),
            generation_config,
            tools,
            tool_config,
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &ApiRequest,
        sse: bool,
    ) -> Result<reqwest::Response, TransportError> {
        let mut builder = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json");
        if sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(TransportError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(TransportError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(TransportError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, TransportError> {
        let url = self.url(&request.model, "generateContent", false);
        let body = Self::build_body(&request);

        debug!(transport = %self.name, model = %request.model, "Sending generation request");

        let response = self.post(&url, &body, false).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("bad response body: {e}")))?;

        Ok(extract_text(&api_response))
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<RawChunk, TransportError>>, TransportError>
    {
        let url = self.url(&request.model, "streamGenerateContent", true);
        let body = Self::build_body(&request);

        debug!(transport = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&url, &body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let transport_name = self.name.clone();

        // Read the SSE byte stream and decode chunks until the source ends
        // or the receiver goes away.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(TransportError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    match serde_json::from_str::<ApiResponse>(data.trim()) {
                        Ok(api_response) => {
                            let chunk = to_raw_chunk(&api_response);
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        Err(e) => {
                            trace!(
                                transport = %transport_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

// --- Conversions between core types and the wire format ---

fn to_api_content(turn: &FormattedTurn) -> ApiContent {
    ApiContent {
        role: match turn.role {
            FormattedRole::User => "user".into(),
            FormattedRole::Model => "model".into(),
        },
        parts: turn
            .parts
            .iter()
            .map(|part| match part {
                TurnPart::Text { text } => ApiPart {
                    text: Some(text.clone()),
                    ..ApiPart::default()
                },
                TurnPart::InlineData { mime_type, data } => ApiPart {
                    inline_data: Some(ApiInlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    }),
                    ..ApiPart::default()
                },
            })
            .collect(),
    }
}

fn to_declaration(schema: &ProviderToolSchema) -> ApiFunctionDeclaration {
    ApiFunctionDeclaration {
        name: schema.name.clone(),
        description: schema.description.clone(),
        parameters: schema.parameters.clone(),
    }
}

/// Concatenated text of the first candidate's parts.
fn extract_text(response: &ApiResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

/// Decode one streamed response into a raw chunk: its text delta plus the
/// first embedded function call, if any.
fn to_raw_chunk(response: &ApiResponse) -> RawChunk {
    let text = extract_text(response);
    let function_call = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|p| p.function_call.as_ref()))
        .map(|call| ToolCallSignal {
            name: call.name.clone(),
            args: call.args.clone().unwrap_or_default(),
        });

    RawChunk {
        text: if text.is_empty() { None } else { Some(text) },
        function_call,
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ApiToolConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ApiInlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTool {
    function_declarations: Vec<ApiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiToolConfig {
    function_calling_config: ApiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> GeminiTransport {
        GeminiTransport::new(&ProviderProfile::new("gemini-test", "test-key")).unwrap()
    }

    #[test]
    fn disabled_profile_is_rejected() {
        let mut profile = ProviderProfile::new("gemini-test", "k");
        profile.enabled = false;
        let err = GeminiTransport::new(&profile).unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = GeminiTransport::new(&ProviderProfile::new("gemini-test", "  ")).unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }

    #[test]
    fn url_building() {
        let t = transport();
        assert_eq!(
            t.url("models/gemini-2.0-flash", "generateContent", false),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(
            t.url("models/gemini-2.0-flash", "streamGenerateContent", true)
                .ends_with("streamGenerateContent?alt=sse")
        );
    }

    #[test]
    fn base_url_override_trims_trailing_slash() {
        let profile =
            ProviderProfile::new("g", "k").with_base_url("https://proxy.example.com/v1beta/");
        let t = GeminiTransport::new(&profile).unwrap();
        assert_eq!(
            t.url("models/m", "generateContent", false),
            "https://proxy.example.com/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn body_omits_tools_when_empty() {
        let request = GenerateRequest::plain("models/m", vec![FormattedTurn::user_text("hi")]);
        let body = GeminiTransport::build_body(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("toolConfig").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn body_includes_tools_and_auto_mode() {
        let mut request = GenerateRequest::plain("models/m", vec![FormattedTurn::user_text("hi")]);
        request.tools = vec![ProviderToolSchema {
            name: "lookup".into(),
            description: "Look up".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        request.temperature = Some(0.4);

        let json = serde_json::to_value(GeminiTransport::build_body(&request)).unwrap();
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "lookup"
        );
        assert_eq!(
            json["toolConfig"]["functionCallingConfig"]["mode"],
            "AUTO"
        );
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn inline_data_serializes_camel_case() {
        let turn = FormattedTurn {
            role: FormattedRole::User,
            parts: vec![TurnPart::InlineData {
                mime_type: "image/png".into(),
                data: "aGk=".into(),
            }],
        };
        let json = serde_json::to_value(to_api_content(&turn)).unwrap();
        assert_eq!(json["parts"][0]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn parse_text_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}"#;
        let response: ApiResponse = serde_json::from_str(data).unwrap();
        let chunk = to_raw_chunk(&response);
        assert_eq!(chunk.text.as_deref(), Some("Hello"));
        assert!(chunk.function_call.is_none());
    }

    #[test]
    fn parse_function_call_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"lookup","args":{"q":"x"}}}],"role":"model"}}]}"#;
        let response: ApiResponse = serde_json::from_str(data).unwrap();
        let chunk = to_raw_chunk(&response);
        assert!(chunk.text.is_none());
        let call = chunk.function_call.unwrap();
        assert_eq!(call.name, "lookup");
        assert_eq!(call.args["q"], "x");
    }

    #[test]
    fn parse_function_call_without_args() {
        let data = r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"ping"}}]}}]}"#;
        let response: ApiResponse = serde_json::from_str(data).unwrap();
        let call = to_raw_chunk(&response).function_call.unwrap();
        assert_eq!(call.name, "ping");
        assert!(call.args.is_empty());
    }

    #[test]
    fn parse_multi_part_text() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
        let response: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(extract_text(&response), "ab");
    }

    #[test]
    fn parse_empty_response() {
        let response: ApiResponse = serde_json::from_str("{}").unwrap();
        let chunk = to_raw_chunk(&response);
        assert!(chunk.text.is_none());
        assert!(chunk.function_call.is_none());
    }
}
