use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::http::post_json;

/// Produces an answer from an assembled prompt.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Clone, Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message<'a>],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: Option<String>,
}

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let messages = [Message {
            role: "user",
            content: prompt,
        }];
        let req = OllamaChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
        };
        let res = post_json::<OllamaChatResponse, _>(&self.client, &url, &req)?;
        non_empty(res.message.and_then(|m| m.content))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message<'a>],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints such as Groq.
pub struct OpenAiCompatGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiCompatGenerator {
    /// `client` must already carry the bearer token.
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }
}

impl Generator for OpenAiCompatGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let messages = [Message {
            role: "user",
            content: prompt,
        }];
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: 0.0,
        };
        let res = post_json::<ChatCompletionResponse, _>(&self.client, &self.endpoint, &req)?;
        non_empty(res.choices.into_iter().find_map(|c| c.message.content))
    }
}

fn non_empty(content: Option<String>) -> Result<String, GenerationError> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(GenerationError::EmptyResponse),
    }
}
