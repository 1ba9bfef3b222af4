//! Text-generation collaborator.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::automation::config::GeneratorConfig;

/// Produces free text for a prompt.
///
/// `Ok(None)` means the model had nothing to say; an `Err` means it could
/// not be reached. Callers treat both as "no decision".
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<Option<String>>;
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for an Ollama-style `POST /api/generate` endpoint.
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<Option<String>> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature,
            },
        };

        let res = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .context("generate request failed")?
            .error_for_status()
            .context("generate returned non-2xx")?
            .json::<GenerateResponse>()
            .context("generate response decode failed")?;

        let text = res.response.trim();
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }
}
