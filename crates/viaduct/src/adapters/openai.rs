//! Chat-completions wire format (`POST /v1/chat/completions`, `stream: true`).
//! Used by OpenAI itself and by the many providers that clone its API shape.

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

pub struct OpenAIAdapter {
    config: AdapterConfig,
}

impl OpenAIAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        OpenAIAdapter { config }
    }

    fn base_url(&self) -> &str {
        if self.config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &self.config.base_url
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// OpenAI accepts either a bare string or an array of typed content parts.
/// Text-only content stays a plain string (matches the common case on the
/// wire); any image block forces the array form, with each image rendered
/// as an `image_url` data URL per `spec.md` §4.1.
fn content_value(content: &Content) -> Value {
    let blocks = content.as_blocks();
    if blocks.iter().all(|b| matches!(b, ContentBlock::Text { .. })) {
        return json!(content.as_text());
    }
    Value::Array(
        blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
                ContentBlock::Image { mime_type, data } => json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", mime_type.as_str(), data) },
                }),
            })
            .collect(),
    )
}

/// Builds the `messages` array: history, converted 1:1, followed by a
/// synthesized `assistant` tool_calls message and one `tool` message per
/// result, when a prior round is being spliced back in.
fn build_messages(
    messages: &[Message],
    system_prompt: Option<&str>,
    tool_results: Option<&[ToolResultForLLM]>,
) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len() + 2);
    if let Some(system) = system_prompt {
        out.push(json!({ "role": "system", "content": system }));
    }
    for m in messages {
        out.push(json!({ "role": role_str(m.role), "content": content_value(&m.content) }));
    }
    if let Some(results) = tool_results {
        if !results.is_empty() {
            let tool_calls: Vec<Value> = results
                .iter()
                .map(|r| {
                    json!({
                        "id": r.tool_call_id,
                        "type": "function",
                        "function": {
                            "name": r.tool_name,
                            "arguments": serde_json::to_string(&r.tool_args).unwrap_or_default(),
                        }
                    })
                })
                .collect();
            out.push(json!({ "role": "assistant", "content": Value::Null, "tool_calls": tool_calls }));
            for r in results {
                out.push(json!({
                    "role": "tool",
                    "tool_call_id": r.tool_call_id,
                    "content": r.content,
                }));
            }
        }
    }
    out
}

fn build_tools(tools: &[ToolSchema]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema,
                }
            })
        })
        .collect()
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize, Debug)]
struct StreamToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    function: StreamFunction,
}

#[derive(Deserialize, Debug, Default)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize, Debug)]
#[serde(alias = "OpenAIRawUsage")]
struct RawUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Default)]
struct ToolUseState {
    id: String,
    name: String,
    arguments: String,
    started: bool,
}

impl LLMAdapter for OpenAIAdapter {
    fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
        tool_results: Option<&[ToolResultForLLM]>,
        system_prompt: Option<&str>,
        _previous_response_id: Option<&str>,
    ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>> {
        let url = format!("{}/chat/completions", self.base_url());
        let api_key = self.config.api_key.clone();
        let mut body = json!({
            "model": self.config.model,
            "messages": build_messages(messages, system_prompt, tool_results),
            "stream": true,
            "stream_options": { "include_usage": true },
        });
        if let Some(tools) = tools {
            if !tools.is_empty() {
                body["tools"] = Value::Array(build_tools(tools));
            }
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
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
            if let Err(e) = resp.error_for_status_ref() {
                let status = e.status().map(|s| s.as_u16());
                let body_text = resp.text().await.unwrap_or_default();
                let message = match status {
                    Some(401) | Some(403) => format!("authentication failed: {}", body_text),
                    _ => format!("provider error: {}", body_text),
                };
                yield LLMEvent::Error { message };
                return;
            }

            let mut lines = Box::pin(transport::sse_lines(resp));
            let mut tool_states: HashMap<usize, ToolUseState> = HashMap::new();
            let mut usage: Option<Usage> = None;

            use futures::StreamExt;
            while let Some(line) = lines.next().await {
                let data = match line {
                    Ok(d) => d,
                    Err(e) => {
                        yield LLMEvent::Error { message: e.to_string() };
                        return;
                    }
                };
                if data == "[DONE]" {
                    for (_, state) in tool_states.drain() {
                        if state.started {
                            yield LLMEvent::ToolCall {
                                id: state.id,
                                name: state.name,
                                args: serde_json::from_str(&state.arguments).unwrap_or(Value::Null),
                                meta: None,
                            };
                        }
                    }
                    yield LLMEvent::Done { usage, response_id: None };
                    return;
                }

                let chunk: StreamChunk = match serde_json::from_str(&data) {
                    Ok(c) => c,
                    Err(_) => continue,
                };

                if let Some(raw) = chunk.usage {
                    usage = Some(Usage {
                        input_tokens: raw.prompt_tokens,
                        output_tokens: raw.completion_tokens,
                    });
                }

                for choice in &chunk.choices {
                    if let Some(content) = &choice.delta.content {
                        if !content.is_empty() {
                            yield LLMEvent::TextDelta { content: content.clone() };
                        }
                    }
                    if let Some(tool_calls) = &choice.delta.tool_calls {
                        for tc in tool_calls {
                            let index = tc.index.unwrap_or(0);
                            let state = tool_states.entry(index).or_default();
                            if let Some(id) = &tc.id {
                                state.id = id.clone();
                            }
                            if let Some(name) = &tc.function.name {
                                state.name = name.clone();
                                if !state.started {
                                    state.started = true;
                                    yield LLMEvent::ToolCallDelta {
                                        id: state.id.clone(),
                                        name: Some(state.name.clone()),
                                        args_fragment: String::new(),
                                    };
                                }
                            }
                            if !tc.function.arguments.is_empty() {
                                state.arguments.push_str(&tc.function.arguments);
                                yield LLMEvent::ToolCallDelta {
                                    id: state.id.clone(),
                                    name: None,
                                    args_fragment: tc.function.arguments.clone(),
                                };
                            }
                        }
                    }
                    if let Some(finish_reason) = &choice.finish_reason {
                        if finish_reason == "tool_calls" {
                            for (_, state) in tool_states.drain() {
                                if state.started {
                                    yield LLMEvent::ToolCall {
                                        id: state.id,
                                        name: state.name,
                                        args: serde_json::from_str(&state.arguments).unwrap_or(Value::Null),
                                        meta: None,
                                    };
                                }
                            }
                        }
                        yield LLMEvent::Done { usage, response_id: None };
                        return;
                    }
                }
            }
        };

        Box::pin(stream)
    }

    fn max_context_tokens(&self, model: &str) -> Option<u32> {
        model_info::max_context_tokens(model)
    }
}
