use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::contracts::catalog::ZENITH_CORE_SOL;
use crate::traits::assistant::ContractAssistant;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const MISSING_KEY_MESSAGE: &str = "Error: API Key missing. Cannot connect to Gemini.";
pub const UNREACHABLE_MESSAGE: &str = "System Error: Unable to reach the AI Architect.";
pub const EMPTY_ANSWER_MESSAGE: &str = "I could not analyze the contracts at this time.";

/// Build the fixed system prompt sent with every question.
pub fn system_prompt() -> String {
    format!(
        "You are the Chief Protocol Architect for ZenithFi.\n\
         You are an expert in Solidity, ERC-4626 vaults and DeFi security.\n\n\
         Context:\n\
         The user is asking about the Zenith smart contracts.\n\n\
         ZenithFi.sol and ZenithVault.sol source:\n{}\n\n\
         Explain the architecture, security features or logic based on the user's question.\n\
         Be technical but concise. Use markdown for code formatting.",
        ZENITH_CORE_SOL
    )
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini REST client answering questions about the contract source
#[derive(Clone)]
pub struct GeminiAssistant {
    client: Option<Client>,
    api_key: Option<String>,
    model: String,
}

impl GeminiAssistant {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let client = api_key.as_ref().map(|_| Client::new());

        if api_key.is_none() {
            warn!("Gemini API key not found in environment variables");
        }

        Self {
            client,
            api_key,
            model: model.into(),
        }
    }

    async fn generate(&self, client: &Client, api_key: &str, question: &str) -> anyhow::Result<Option<String>> {
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);

        let payload = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system_prompt() }] },
            "contents": [{ "role": "user", "parts": [{ "text": question }] }]
        });

        let response = client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error: status {}: {}", status, body);
        }

        let body: GenerateContentResponse = response.json().await?;
        Ok(body.text())
    }
}

#[async_trait]
impl ContractAssistant for GeminiAssistant {
    async fn ask(&self, question: &str) -> String {
        let (Some(client), Some(api_key)) = (&self.client, &self.api_key) else {
            return MISSING_KEY_MESSAGE.to_string();
        };

        match self.generate(client, api_key, question).await {
            Ok(Some(answer)) => {
                debug!("Gemini answered with {} chars", answer.len());
                answer
            }
            Ok(None) => EMPTY_ANSWER_MESSAGE.to_string(),
            Err(e) => {
                warn!("Gemini analysis failed: {}", e);
                UNREACHABLE_MESSAGE.to_string()
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.client.is_some() && self.api_key.is_some()
    }
}
