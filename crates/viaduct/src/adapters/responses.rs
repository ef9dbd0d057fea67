//! OpenAI's Responses API (`POST /v1/responses`, `stream: true`): a
//! richer, item-oriented wire format where function calls and their outputs
//! are modeled as distinct input items rather than chat-message roles.

use crate::adapter::LLMAdapter;
use crate::adapters::AdapterConfig;
use crate::error::LLMError;
use crate::event::LLMEvent;
use crate::message::{Content, ContentBlock, Message, Role, Usage};
use crate::model_info;
use crate::tool::{ToolResultForLLM, ToolSchema};
use crate::transport;
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::pin::Pin;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct ResponsesAdapter {
    config: AdapterConfig,
}

impl ResponsesAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        ResponsesAdapter { config }
    }

    fn base_url(&self) -> &str {
        if self.config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &self.config.base_url
        }
    }
}

/// Renders content blocks as Responses API content parts. Text uses the
/// role-appropriate `input_text`/`output_text` type; images always use
/// `input_image` (the API has no distinct assistant-authored image type).
fn content_parts(content: &Content, text_type: &str) -> Vec<Value> {
    content
        .as_blocks()
        .iter()
        .map(|b| match b {
            ContentBlock::Text { text } => json!({ "type": text_type, "text": text }),
            ContentBlock::Image { mime_type, data } => json!({
                "type": "input_image",
                "image_url": format!("data:{};base64,{}", mime_type.as_str(), data),
            }),
        })
        .collect()
}

fn build_input(
    messages: &[Message],
    tool_results: Option<&[ToolResultForLLM]>,
) -> Vec<Value> {
    let mut input = Vec::with_capacity(messages.len() + 2);
    for m in messages {
        let (role, content_type) = match m.role {
            Role::User => ("user", "input_text"),
            Role::Assistant => ("assistant", "output_text"),
            Role::System => ("system", "input_text"),
        };
        input.push(json!({
            "type": "message",
            "role": role,
            "content": content_parts(&m.content, content_type),
        }));
    }
    if let Some(results) = tool_results {
        for r in results {
            input.push(json!({
                "type": "function_call",
                "call_id": r.tool_call_id,
                "name": r.tool_name,
                "arguments": serde_json::to_string(&r.tool_args).unwrap_or_default(),
            }));
            input.push(json!({
                "type": "function_call_output",
                "call_id": r.tool_call_id,
                "output": r.content,
            }));
        }
    }
    input
}

fn build_tools(tools: &[ToolSchema]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "name": t.name,
                "description": t.description,
                "parameters": t.input_schema,
                "strict": false,
            })
        })
        .collect()
}

#[derive(Deserialize, Debug)]
struct SseEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    item: Option<Value>,
    #[serde(default)]
    output_index: Option<usize>,
    #[serde(default)]
    item_id: Option<String>,
}

#[derive(Default)]
struct ToolState {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    started: bool,
}

/// Resolves an `output_index`/`item_id` pair to a stable tool-call slot,
/// falling back to a fresh index when neither is present (matches the
/// provider's behavior of sometimes omitting both on single-tool-call
/// responses).
fn resolve_index(
    output_index: Option<usize>,
    item_id: Option<&str>,
    states: &HashMap<usize, ToolState>,
) -> usize {
    if let Some(index) = output_index {
        return index;
    }
    if let Some(item_id) = item_id {
        if let Some((index, _)) = states.iter().find(|(_, s)| s.id.as_deref() == Some(item_id)) {
            return *index;
        }
    }
    let mut index = 0;
    while states.contains_key(&index) {
        index += 1;
    }
    index
}

fn start_if_ready(index: usize, state: &mut ToolState) -> Option<LLMEvent> {
    if !state.started {
        if let (Some(id), Some(name)) = (state.id.clone(), state.name.clone()) {
            state.started = true;
            return Some(LLMEvent::ToolCallDelta {
                id,
                name: Some(name),
                args_fragment: String::new(),
            });
        }
    }
    let _ = index;
    None
}

impl LLMAdapter for ResponsesAdapter {
    fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
        tool_results: Option<&[ToolResultForLLM]>,
        system_prompt: Option<&str>,
        previous_response_id: Option<&str>,
    ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>> {
        let url = format!("{}/responses", self.base_url());
        let api_key = self.config.api_key.clone();
        let mut body = json!({
            "model": self.config.model,
            "input": build_input(messages, tool_results),
            "stream": true,
            "store": true,
        });
        if let Some(system) = system_prompt {
            body["instructions"] = json!(system);
        }
        if let Some(prev) = previous_response_id {
            body["previous_response_id"] = json!(prev);
        }
        if let Some(tools) = tools {
            if !tools.is_empty() {
                body["tools"] = Value::Array(build_tools(tools));
            }
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_output_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        let timeout = std::time::Duration::from_secs(self.config.timeout_secs);

        let stream = async_stream::stream! {
            let resp = match transport::client()
                .post(&url)
                .bearer_auth(&api_key)
                .json(&body)
                .timeout(timeout)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield LLMEvent::Error { message: LLMError::from(e).to_string() };
                    return;
                }
            };
            if let Err(_e) = resp.error_for_status_ref() {
                let body_text = resp.text().await.unwrap_or_default();
                yield LLMEvent::Error { message: format!("provider error: {}", body_text) };
                return;
            }

            use futures::StreamExt;
            let mut lines = Box::pin(transport::sse_lines(resp));
            let mut states: HashMap<usize, ToolState> = HashMap::new();

            while let Some(line) = lines.next().await {
                let data = match line {
                    Ok(d) => d,
                    Err(e) => {
                        yield LLMEvent::Error { message: e.to_string() };
                        return;
                    }
                };
                if data == "[DONE]" {
                    return;
                }
                let event: SseEvent = match serde_json::from_str(&data) {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                match event.kind.as_str() {
                    "response.output_text.delta" => {
                        if let Some(delta) = event.delta {
                            yield LLMEvent::TextDelta { content: delta };
                        }
                    }
                    "response.output_item.added" | "response.output_item.done" => {
                        if let Some(item) = &event.item {
                            if item.get("type").and_then(Value::as_str) != Some("function_call") {
                                continue;
                            }
                            let index = resolve_index(event.output_index, event.item_id.as_deref(), &states);
                            let state = states.entry(index).or_default();
                            if let Some(id) = item.get("call_id").or_else(|| item.get("id")).and_then(Value::as_str) {
                                state.id = Some(id.to_string());
                            }
                            if let Some(name) = item.get("name").and_then(Value::as_str) {
                                state.name = Some(name.to_string());
                            }
                            if let Some(ev) = start_if_ready(index, state) {
                                yield ev;
                            }
                        }
                    }
                    "response.function_call_arguments.delta" => {
                        if let Some(delta) = event.delta {
                            let index = resolve_index(event.output_index, event.item_id.as_deref(), &states);
                            let state = states.entry(index).or_default();
                            if let Some(ev) = start_if_ready(index, state) {
                                yield ev;
                            }
                            state.arguments.push_str(&delta);
                            yield LLMEvent::ToolCallDelta {
                                id: state.id.clone().unwrap_or_default(),
                                name: None,
                                args_fragment: delta,
                            };
                        }
                    }
                    "response.function_call_arguments.done" => {
                        let index = resolve_index(event.output_index, event.item_id.as_deref(), &states);
                        if let Some(state) = states.remove(&index) {
                            if let (Some(id), Some(name)) = (state.id, state.name) {
                                yield LLMEvent::ToolCall {
                                    id,
                                    name,
                                    args: serde_json::from_str(&state.arguments).unwrap_or(Value::Null),
                                    meta: None,
                                };
                            }
                        }
                    }
                    "response.completed" => {
                        let response = event.response.unwrap_or(Value::Null);
                        let response_id = response.get("id").and_then(Value::as_str).map(str::to_string);
                        let usage = response
                            .get("usage")
                            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());
                        yield LLMEvent::Done { usage, response_id };
                        return;
                    }
                    "response.failed" | "error" => {
                        let message = event
                            .response
                            .as_ref()
                            .and_then(|r| r.get("error"))
                            .and_then(|e| e.get("message"))
                            .and_then(Value::as_str)
                            .unwrap_or("Responses API request failed")
                            .to_string();
                        yield LLMEvent::Error { message };
                        return;
                    }
                    _ => {}
                }
            }
        };

        Box::pin(stream)
    }

    fn max_context_tokens(&self, model: &str) -> Option<u32> {
        model_info::max_context_tokens(model)
    }
}
