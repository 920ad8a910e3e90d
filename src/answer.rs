use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "phi3:mini";

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Fills the prompt template, stuffing every context text into one block.
pub fn build_prompt(context_texts: &[String], question: &str) -> String {
    let context = context_texts.join(DOCUMENT_SEPARATOR);
    format!(
        "\
You are an expert document analysis assistant. Your role is to accurately answer user queries using both retrieved context documents and your general reasoning abilities. Always follow this workflow:

Review the retrieved documents carefully.

Use only the information present in the retrieved documents as the primary source of truth.

If the documents do not contain the answer, say so explicitly instead of guessing.

Answer only using retrieved documents.
Be concise, accurate, no extra info.

Context: {context}

Question: {question}

Answer: "
    )
}

/// Generates an answer to `question` from retrieved context.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, context_texts: &[String], question: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Completion through a local Ollama server's `/api/generate`.
pub struct OllamaAnswerer {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaAnswerer {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Answerer for OllamaAnswerer {
    async fn answer(&self, context_texts: &[String], question: &str) -> Result<String> {
        let prompt = build_prompt(context_texts, question);
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "Ollama request failed: Status {}, Body: {}",
                status,
                error_text
            ));
        }

        let generated: GenerateResponse = response.json().await?;
        Ok(generated.response)
    }
}
