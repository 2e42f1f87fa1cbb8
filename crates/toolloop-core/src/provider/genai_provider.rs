//! GenAI-based model gateway
//!
//! Uses the genai framework with manual tool control: tool calls come back to
//! the loop, which dispatches them and folds the results into the next request.
//! Responses are streamed so long generations do not hit the HTTP timeout.

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, ContentPart, MessageContent, Tool, ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::webc;
use genai::Client;
use genai::WebConfig;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::logging::{log_interaction, LogEntry};
use super::{
    GatewayError, GatewayMessage, GatewayPart, GatewayRole, Generation, GenerationRequest,
    GenerationResponse, ModelGateway, TokenUsage,
};
use crate::tools::ToolCall;

/// A gateway implementation using genai
pub struct GenAIProvider {
    client: Client,
    model: String,
}

impl GenAIProvider {
    /// Default timeout for model API requests
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    fn web_config(timeout: Duration) -> WebConfig {
        WebConfig::default()
            .with_timeout(timeout)
            .with_connect_timeout(Duration::from_secs(30))
    }

    /// Create a gateway that resolves credentials from the environment
    pub fn new(model: impl Into<String>) -> Self {
        let client = Client::builder()
            .with_web_config(Self::web_config(Self::DEFAULT_TIMEOUT))
            .build();
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create a gateway with an explicit API key and request timeout
    pub fn with_api_key(model: impl Into<String>, api_key: &str, timeout: Duration) -> Self {
        let api_key = api_key.to_string();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );

        let client = Client::builder()
            .with_web_config(Self::web_config(timeout))
            .with_auth_resolver(auth_resolver)
            .build();

        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn append_user(mut req: ChatRequest, msg: &GatewayMessage) -> ChatRequest {
        for part in &msg.parts {
            match part {
                GatewayPart::Text { text } => {
                    req = req.append_message(ChatMessage::user(text.as_str()));
                }
                GatewayPart::FunctionResponse(result) => {
                    req = req.append_message(ToolResponse::new(
                        result.call_id.clone(),
                        result.payload().to_string(),
                    ));
                }
                GatewayPart::FunctionCall(_) => {
                    // Calls only come from the model side
                }
            }
        }
        req
    }

    fn append_model(req: ChatRequest, msg: &GatewayMessage) -> ChatRequest {
        let mut text = String::new();
        let mut calls = Vec::new();
        for part in &msg.parts {
            match part {
                GatewayPart::Text { text: t } => text.push_str(t),
                GatewayPart::FunctionCall(call) => calls.push(ContentPart::ToolCall(genai::chat::ToolCall {
                    call_id: call.id.clone(),
                    fn_name: call.name.clone(),
                    fn_arguments: Value::Object(call.arguments.clone()),
                    thought_signatures: None,
                })),
                GatewayPart::FunctionResponse(_) => {}
            }
        }

        // Text first, then every call, all in one assistant message
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            parts.push(ContentPart::Text(text));
        }
        parts.extend(calls);

        if parts.is_empty() {
            req
        } else {
            req.append_message(ChatMessage::assistant(MessageContent::from_parts(parts)))
        }
    }

    fn build_request(request: &GenerationRequest) -> ChatRequest {
        let mut chat_req = ChatRequest::default();
        if let Some(system) = &request.system_instruction {
            chat_req = chat_req.with_system(system.as_str());
        }

        for msg in &request.messages {
            chat_req = match msg.role {
                GatewayRole::User => Self::append_user(chat_req, msg),
                GatewayRole::Model => Self::append_model(chat_req, msg),
            };
        }

        if !request.tools.is_empty() {
            let tools: Vec<Tool> = request
                .tools
                .iter()
                .map(|t| {
                    Tool::new(&t.name)
                        .with_description(&t.description)
                        .with_schema(t.parameters.clone())
                })
                .collect();
            chat_req = chat_req.with_tools(tools);
        }

        chat_req
    }

    fn convert_call(tc: genai::chat::ToolCall) -> ToolCall {
        let arguments = match tc.fn_arguments {
            Value::Object(map) => map,
            Value::String(raw) => serde_json::from_str::<Map<String, Value>>(&raw).unwrap_or_default(),
            _ => Map::new(),
        };
        let call = ToolCall::new(tc.fn_name, arguments);
        if tc.call_id.is_empty() {
            call
        } else {
            call.with_id(tc.call_id)
        }
    }

    fn convert_usage(usage: &genai::chat::Usage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens.and_then(|n| u64::try_from(n).ok()),
            completion_tokens: usage.completion_tokens.and_then(|n| u64::try_from(n).ok()),
        }
    }

    fn fail(&self, request: &GenerationRequest, error: GatewayError) -> GatewayError {
        let message = error.to_string();
        log_interaction(LogEntry {
            model: &self.model,
            request,
            generation: None,
            usage: None,
            error: Some(&message),
        });
        error
    }
}

/// Classify a genai failure by HTTP status or transport error, falling back
/// to the message text only where genai keeps nothing structured.
fn classify_genai_error(error: &genai::Error) -> GatewayError {
    let message = error.to_string();
    match error {
        genai::Error::HttpError { status, .. } => GatewayError::from_status(status.as_u16(), message),
        genai::Error::WebModelCall { webc_error, .. } | genai::Error::WebAdapterCall { webc_error, .. } => {
            classify_webc_error(webc_error, message)
        }
        genai::Error::WebStream { error, .. } => {
            if let Some(inner) = error.downcast_ref::<genai::Error>() {
                classify_genai_error(inner)
            } else if let Some(inner) = error.downcast_ref::<reqwest::Error>() {
                classify_reqwest_error(inner, message)
            } else {
                GatewayError::classify(message)
            }
        }
        genai::Error::ChatResponse { body, .. } => GatewayError::classify(body.to_string()),
        genai::Error::Internal(_) => GatewayError::classify(message),
        _ => GatewayError::Terminal(message),
    }
}

fn classify_webc_error(error: &webc::Error, message: String) -> GatewayError {
    match error {
        webc::Error::ResponseFailedStatus { status, .. } => GatewayError::from_status(status.as_u16(), message),
        webc::Error::Reqwest(inner) => classify_reqwest_error(inner, message),
        _ => GatewayError::Terminal(message),
    }
}

fn classify_reqwest_error(error: &reqwest::Error, message: String) -> GatewayError {
    if let Some(status) = error.status() {
        return GatewayError::from_status(status.as_u16(), message);
    }
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        GatewayError::Transient(message)
    } else {
        GatewayError::Terminal(message)
    }
}

#[async_trait]
impl ModelGateway for GenAIProvider {
    fn name(&self) -> &str {
        "genai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GatewayError> {
        let chat_req = Self::build_request(request);
        let options = ChatOptions::default()
            .with_temperature(request.temperature as f64)
            .with_max_tokens(request.max_tokens)
            .with_capture_usage(true);

        debug!(model = %self.model, messages = request.messages.len(), tools = request.tools.len(), "Sending generation request");

        let stream_response = match self
            .client
            .exec_chat_stream(&self.model, chat_req, Some(&options))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = ?e, model = %self.model, "Model request failed");
                return Err(self.fail(request, classify_genai_error(&e)));
            }
        };

        let mut content = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut stream = stream_response.stream;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => {
                    // Each ToolCallChunk carries a complete call
                    calls.push(Self::convert_call(tc.tool_call));
                }
                Ok(ChatStreamEvent::End(end)) => {
                    if let Some(captured) = &end.captured_usage {
                        usage = Self::convert_usage(captured);
                    }
                    break;
                }
                Ok(_) => {
                    // Start, reasoning and thought-signature events carry no answer text
                }
                Err(e) => {
                    error!(error = ?e, model = %self.model, "Model stream error");
                    return Err(self.fail(request, classify_genai_error(&e)));
                }
            }
        }

        let text = if content.is_empty() { None } else { Some(content) };
        let generation = Generation::from_parts(text, calls);

        log_interaction(LogEntry {
            model: &self.model,
            request,
            generation: Some(&generation),
            usage: Some(&usage),
            error: None,
        });

        Ok(GenerationResponse::new(generation).with_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolResult;
    use genai::adapter::AdapterKind;
    use genai::chat::ChatRole;
    use genai::ModelIden;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_convert_call_parses_string_arguments() {
        let tc = genai::chat::ToolCall {
            call_id: String::new(),
            fn_name: "list_files".to_string(),
            fn_arguments: Value::String(r#"{"directory": "."}"#.to_string()),
            thought_signatures: None,
        };
        let call = GenAIProvider::convert_call(tc);
        assert_eq!(call.name, "list_files");
        assert_eq!(call.arguments.get("directory"), Some(&json!(".")));
        assert!(call.id.starts_with("call_"));
    }

    #[test]
    fn test_convert_call_keeps_provider_id() {
        let tc = genai::chat::ToolCall {
            call_id: "abc".to_string(),
            fn_name: "read_file".to_string(),
            fn_arguments: json!({"file_path": "a.txt"}),
            thought_signatures: None,
        };
        assert_eq!(GenAIProvider::convert_call(tc).id, "abc");
    }

    #[test]
    fn test_build_request_with_tool_round_trip() {
        let call = ToolCall::new("list_files", Map::new()).with_id("c1");
        let request = GenerationRequest {
            messages: vec![
                GatewayMessage::user_text("list files"),
                GatewayMessage {
                    role: GatewayRole::Model,
                    parts: vec![GatewayPart::FunctionCall(call.clone())],
                },
                GatewayMessage::tool_results(vec![ToolResult::success(&call, json!(["a", "b"]))]),
            ],
            tools: vec![],
            system_instruction: Some("be brief".into()),
            temperature: 0.7,
            max_tokens: 8192,
        };

        let chat_req = GenAIProvider::build_request(&request);
        assert_eq!(chat_req.messages.len(), 3);
        assert_eq!(chat_req.system.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_model_text_travels_with_tool_calls() {
        let call = ToolCall::new("list_files", Map::new()).with_id("c1");
        let request = GenerationRequest {
            messages: vec![
                GatewayMessage::user_text("what is here?"),
                GatewayMessage {
                    role: GatewayRole::Model,
                    parts: vec![GatewayPart::text("Let me look"), GatewayPart::FunctionCall(call.clone())],
                },
                GatewayMessage::tool_results(vec![ToolResult::success(&call, json!([]))]),
            ],
            tools: vec![],
            system_instruction: None,
            temperature: 0.7,
            max_tokens: 8192,
        };

        let chat_req = GenAIProvider::build_request(&request);
        assert_eq!(chat_req.messages.len(), 3);
        let model_turn = &chat_req.messages[1];
        assert_eq!(model_turn.role, ChatRole::Assistant);
        assert_eq!(model_turn.content.first_text(), Some("Let me look"));
        let calls = model_turn.content.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id, "c1");
    }

    fn gemini() -> ModelIden {
        ModelIden::new(AdapterKind::Gemini, "gemini-2.0-flash")
    }

    fn http_error(status: StatusCode, body: &str) -> genai::Error {
        genai::Error::HttpError {
            status,
            canonical_reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_http_status_decides_retry() {
        let bad_request = http_error(
            StatusCode::BAD_REQUEST,
            "max_output_tokens must be <= 65536, got 150000 (503 retries left)",
        );
        assert!(!classify_genai_error(&bad_request).is_transient());
        assert!(classify_genai_error(&http_error(StatusCode::SERVICE_UNAVAILABLE, "")).is_transient());
        assert!(classify_genai_error(&http_error(StatusCode::TOO_MANY_REQUESTS, "")).is_transient());
    }

    #[test]
    fn test_web_call_status_decides_retry() {
        let call = |status: StatusCode, body: &str| genai::Error::WebModelCall {
            model_iden: gemini(),
            webc_error: webc::Error::ResponseFailedStatus {
                status,
                body: body.to_string(),
                headers: Box::new(HeaderMap::new()),
            },
        };
        assert!(!classify_genai_error(&call(StatusCode::FORBIDDEN, "PERMISSION_DENIED, see connection settings")).is_transient());
        assert!(!classify_genai_error(&call(StatusCode::BAD_REQUEST, "prompt is 2500 tokens too long")).is_transient());
        assert!(classify_genai_error(&call(StatusCode::BAD_GATEWAY, "")).is_transient());
    }

    #[test]
    fn test_stream_errors_unwrap_to_status() {
        let stream_error = |inner: genai::Error| genai::Error::WebStream {
            model_iden: gemini(),
            cause: inner.to_string(),
            error: Box::new(inner),
        };
        assert!(classify_genai_error(&stream_error(http_error(StatusCode::INTERNAL_SERVER_ERROR, ""))).is_transient());
        assert!(!classify_genai_error(&stream_error(http_error(StatusCode::UNAUTHORIZED, "503"))).is_transient());
    }

    #[test]
    fn test_non_transport_errors_are_terminal() {
        let missing_key = genai::Error::RequiresApiKey { model_iden: gemini() };
        assert!(!classify_genai_error(&missing_key).is_transient());

        let overloaded = genai::Error::ChatResponse {
            model_iden: gemini(),
            body: json!({ "error": { "type": "overloaded_error", "message": "Overloaded" } }),
        };
        assert!(classify_genai_error(&overloaded).is_transient());
    }
}
