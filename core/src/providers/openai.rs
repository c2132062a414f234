use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, FunctionCall, Provider, ProviderKind, ToolArguments,
    ToolCall,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [serde_json::Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ToolCallRequest<'a> {
    id: &'a str,
    r#type: &'a str,
    function: FunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionRequest<'a> {
    name: &'a str,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    role: Option<String>,
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: Option<String>,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: ToolArguments,
}

/// Chat-completions client for OpenAI and OpenAI-compatible endpoints such as
/// Groq.
pub struct OpenAICompatibleProvider {
    client: reqwest::Client,
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
    reasoning_effort: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let (model, base_url) = match kind {
            ProviderKind::OpenAi => ("gpt-4o", OPENAI_BASE_URL),
            ProviderKind::Groq => ("openai/gpt-oss-120b", GROQ_BASE_URL),
        };

        Self {
            client,
            kind,
            api_key: api_key.into(),
            model: model.to_string(),
            base_url: base_url.to_string(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            reasoning_effort: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: Option<f64>) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wire messages for `messages`. Tool calls without a later tool reply are
    /// left out, since the API rejects unanswered call ids; an assistant
    /// message left with no calls is sent without the field.
    fn convert_messages<'a>(&self, messages: &'a [ChatMessage]) -> Vec<CompletionMessage<'a>> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let later = &messages[i + 1..];
                let tool_calls = m
                    .tool_calls
                    .as_ref()
                    .map(|tool_calls| {
                        tool_calls
                            .iter()
                            .filter(|tc| is_answered(&tc.id, later))
                            .map(|tc| ToolCallRequest {
                                id: &tc.id,
                                r#type: &tc.call_type,
                                function: FunctionRequest {
                                    name: &tc.function.name,
                                    arguments: tc.function.arguments.to_text(),
                                },
                            })
                            .collect::<Vec<_>>()
                    })
                    .filter(|calls| !calls.is_empty());

                CompletionMessage {
                    role: &m.role,
                    content: &m.content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.as_deref(),
                    name: m.name.as_deref(),
                }
            })
            .collect()
    }

    fn build_request<'a>(&'a self, request: &ChatRequest<'a>) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: self.convert_messages(request.messages),
            tools: request.tools,
            temperature: self.temperature,
            top_p: self.top_p,
            max_completion_tokens: self.max_tokens,
            reasoning_effort: self.reasoning_effort.as_deref(),
        }
    }
}

fn is_answered(call_id: &str, later: &[ChatMessage]) -> bool {
    later
        .iter()
        .any(|m| m.is_role("tool") && m.tool_call_id.as_deref() == Some(call_id))
}

fn into_response(choice: CompletionChoice) -> ChatResponse {
    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolCall {
            id: c.id,
            call_type: c.call_type.unwrap_or_else(|| "function".to_string()),
            function: FunctionCall {
                name: c.function.name,
                arguments: c.function.arguments,
            },
        })
        .collect();

    ChatResponse {
        role: choice.message.role,
        content: choice.message.content,
        tool_calls,
    }
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Vec<ChatResponse>> {
        let body = self.build_request(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "{} API error {}: {}",
                self.kind,
                status,
                error_text
            ));
        }

        let completion: CompletionResponse = response.json().await?;
        if completion.choices.is_empty() {
            return Err(anyhow::anyhow!("No choices in response"));
        }

        Ok(completion.choices.into_iter().map(into_response).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_tool_history() {
        let provider = OpenAICompatibleProvider::new(ProviderKind::Groq, "key")
            .with_temperature(Some(0.3))
            .with_reasoning_effort(Some("medium".into()));
        let call = ToolCall::function(
            "c1",
            "read_file",
            ToolArguments::Map(json!({"file_path": "a.py"})),
        );
        let messages = vec![
            ChatMessage::user("write tests"),
            ChatMessage::assistant_with_tool_calls("", vec![call]),
            ChatMessage::tool_result("c1", "read_file", "{\"success\":true}"),
        ];
        let request = ChatRequest {
            messages: &messages,
            tools: None,
        };

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(body["model"], "openai/gpt-oss-120b");
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["reasoning_effort"], "medium");
        assert!(body.get("tools").is_none());
        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["arguments"],
            "{\"file_path\":\"a.py\"}"
        );
        assert_eq!(body["messages"][2]["tool_call_id"], "c1");
        assert_eq!(body["messages"][2]["name"], "read_file");
    }

    #[test]
    fn unanswered_tool_calls_are_not_sent() {
        let provider = OpenAICompatibleProvider::new(ProviderKind::Groq, "key");
        let read = ToolCall::function("r1", "read_file", ToolArguments::Map(json!({})));
        let early_run =
            ToolCall::function("p0", "run_pytest_tests", ToolArguments::Map(json!({})));
        let write = ToolCall::function("w1", "write_file", ToolArguments::Map(json!({})));
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("write tests"),
            ChatMessage::assistant_with_tool_calls("", vec![read]),
            ChatMessage::assistant("<scratchpad>{}</scratchpad>"),
            ChatMessage::assistant_with_tool_calls("", vec![early_run, write]),
            ChatMessage::tool_result("w1", "write_file", "{\"success\":true}"),
        ];
        let request = ChatRequest {
            messages: &messages,
            tools: None,
        };

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        let sent = body["messages"].as_array().unwrap();
        assert_eq!(sent.len(), 6);
        assert!(sent[2].get("tool_calls").is_none());
        assert_eq!(sent[2]["role"], "assistant");

        let calls = sent[4]["tool_calls"].as_array().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["id"], "w1");
        assert_eq!(sent[5]["tool_call_id"], "w1");
    }

    #[test]
    fn response_choice_converts() {
        let completion: CompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_directory_files", "arguments": "{\"path\": \".\"}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let response = into_response(completion.choices.into_iter().next().unwrap());
        assert_eq!(response.role.as_deref(), Some("assistant"));
        assert_eq!(response.text_or_empty(), "");
        assert_eq!(response.tool_calls[0].name(), "list_directory_files");
        assert_eq!(
            response.tool_calls[0].function.arguments.decode().unwrap()["path"],
            "."
        );
    }
}
