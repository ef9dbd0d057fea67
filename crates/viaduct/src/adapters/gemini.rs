//! Google's Gemini wire format (`POST .../{model}:streamGenerateContent?alt=sse`).
//! Conversation roles are `user`/`model` rather than `user`/`assistant`, the
//! system prompt is a top-level field rather than a message, and tool calls
//! and their results are modeled as paired `functionCall`/`functionResponse`
//! parts rather than a dedicated role.

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
use std::pin::Pin;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiAdapter {
    config: AdapterConfig,
}

impl GeminiAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        GeminiAdapter { config }
    }

    fn base_url(&self) -> &str {
        if self.config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &self.config.base_url
        }
    }
}

/// Renders content blocks as Gemini `parts`: text stays `{"text": ...}`,
/// images become inline base64 `inlineData` parts (`spec.md` §4.1).
fn content_parts(content: &Content) -> Vec<Value> {
    content
        .as_blocks()
        .iter()
        .map(|b| match b {
            ContentBlock::Text { text } => json!({ "text": text }),
            ContentBlock::Image { mime_type, data } => json!({
                "inlineData": { "mimeType": mime_type.as_str(), "data": data },
            }),
        })
        .collect()
}

fn thought_signature(result: &ToolResultForLLM) -> Option<&Value> {
    result.tool_call_meta.as_ref().and_then(|m| m.get("thoughtSignature"))
}

fn build_contents(messages: &[Message], tool_results: Option<&[ToolResultForLLM]>) -> Vec<Value> {
    let mut contents = Vec::with_capacity(messages.len() + 2);
    for m in messages {
        // Gemini has no system role inside `contents`; a bare system message
        // in history (there shouldn't normally be one once `system_prompt` is
        // used) is folded into a user turn rather than dropped.
        let role = match m.role {
            Role::User | Role::System => "user",
            Role::Assistant => "model",
        };
        contents.push(json!({
            "role": role,
            "parts": content_parts(&m.content),
        }));
    }
    if let Some(results) = tool_results {
        if !results.is_empty() {
            let (with_sig, without_sig): (Vec<&ToolResultForLLM>, Vec<&ToolResultForLLM>) =
                results.iter().partition(|r| thought_signature(r).is_some());

            if !with_sig.is_empty() {
                let call_parts: Vec<Value> = with_sig
                    .iter()
                    .map(|r| {
                        json!({
                            "functionCall": { "name": r.tool_name, "args": r.tool_args },
                            "thoughtSignature": thought_signature(r).cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect();
                contents.push(json!({ "role": "model", "parts": call_parts }));

                let response_parts: Vec<Value> = with_sig
                    .iter()
                    .map(|r| {
                        let response = serde_json::from_str::<Value>(&r.content)
                            .unwrap_or_else(|_| json!({ "output": r.content }));
                        json!({
                            "functionResponse": { "name": r.tool_name, "response": response },
                        })
                    })
                    .collect();
                contents.push(json!({ "role": "user", "parts": response_parts }));
            }

            if !without_sig.is_empty() {
                // Without a thoughtSignature, Gemini has nothing to correlate a
                // structured functionCall/functionResponse pair against on the
                // next turn, so the round-trip is spelled out as plain text
                // instead of the structured parts (`spec.md` §9).
                let call_text = without_sig
                    .iter()
                    .map(|r| format!("Called `{}` with arguments {}.", r.tool_name, r.tool_args))
                    .collect::<Vec<_>>()
                    .join("\n");
                contents.push(json!({ "role": "model", "parts": [{ "text": call_text }] }));

                let response_text = without_sig
                    .iter()
                    .map(|r| format!("Result of `{}`: {}", r.tool_name, r.content))
                    .collect::<Vec<_>>()
                    .join("\n");
                contents.push(json!({ "role": "user", "parts": [{ "text": response_text }] }));
            }
        }
    }
    contents
}

fn build_tools(tools: &[ToolSchema]) -> Vec<Value> {
    vec![json!({
        "functionDeclarations": tools.iter().map(|t| json!({
            "name": t.name,
            "description": t.description,
            "parameters": t.input_schema,
        })).collect::<Vec<_>>(),
    })]
}

#[derive(Deserialize, Debug, Default)]
struct StreamResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<RawUsage>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "functionCall")]
    function_call: Option<RawFunctionCall>,
    #[serde(default, rename = "thoughtSignature")]
    thought_signature: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize, Debug)]
struct RawUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl LLMAdapter for GeminiAdapter {
    fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
        tool_results: Option<&[ToolResultForLLM]>,
        system_prompt: Option<&str>,
        _previous_response_id: Option<&str>,
    ) -> Pin<Box<dyn Stream<Item = LLMEvent> + Send>> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url(),
            self.config.model,
            self.config.api_key
        );
        let mut body = json!({ "contents": build_contents(messages, tool_results) });
        if let Some(system) = system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        if let Some(tools) = tools {
            if !tools.is_empty() {
                body["tools"] = Value::Array(build_tools(tools));
            }
        }
        if self.config.max_tokens.is_some() || self.config.temperature.is_some() {
            let mut generation_config = json!({});
            if let Some(max_tokens) = self.config.max_tokens {
                generation_config["maxOutputTokens"] = json!(max_tokens);
            }
            if let Some(temperature) = self.config.temperature {
                generation_config["temperature"] = json!(temperature);
            }
            body["generationConfig"] = generation_config;
        }
        let timeout = std::time::Duration::from_secs(self.config.timeout_secs);

        let stream = async_stream::stream! {
            let resp = match transport::client().post(&url).json(&body).timeout(timeout).send().await {
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
            let mut call_index: usize = 0;
            let mut usage: Option<Usage> = None;

            while let Some(line) = lines.next().await {
                let data = match line {
                    Ok(d) => d,
                    Err(e) => {
                        yield LLMEvent::Error { message: e.to_string() };
                        return;
                    }
                };
                let chunk: StreamResponse = match serde_json::from_str(&data) {
                    Ok(c) => c,
                    Err(_) => continue,
                };

                if let Some(raw) = chunk.usage_metadata {
                    usage = Some(Usage {
                        input_tokens: raw.prompt_token_count,
                        output_tokens: raw.candidates_token_count,
                    });
                }

                for candidate in &chunk.candidates {
                    let Some(content) = &candidate.content else { continue };
                    for part in &content.parts {
                        if let Some(text) = &part.text {
                            if !text.is_empty() {
                                yield LLMEvent::TextDelta { content: text.clone() };
                            }
                        }
                        if let Some(call) = &part.function_call {
                            let meta = part
                                .thought_signature
                                .as_ref()
                                .map(|sig| json!({ "thoughtSignature": sig }));
                            yield LLMEvent::ToolCall {
                                id: format!("gemini-call-{}", call_index),
                                name: call.name.clone(),
                                args: call.args.clone(),
                                meta,
                            };
                            call_index += 1;
                        }
                    }
                }
            }
            yield LLMEvent::Done { usage, response_id: None };
        };

        Box::pin(stream)
    }

    fn max_context_tokens(&self, model: &str) -> Option<u32> {
        model_info::max_context_tokens(model)
    }
}
