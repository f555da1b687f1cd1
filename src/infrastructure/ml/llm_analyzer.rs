use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

use super::traits::{AnalyzerError, ContentAnalyzer};

const SYSTEM_PROMPT: &str = "You are a content moderator for a learning community. \
For each numbered item decide whether it may stay visible. Consider: spam, harassment, \
scams/fraud, explicit content, hate speech, violence, self-harm, off-topic. \
Answer with a JSON array only, one object per item in input order, each shaped as \
{\"allowed\": bool, \"severity\": \"LOW\"|\"MEDIUM\"|\"HIGH\"|\"CRITICAL\", \
\"categories\": [string], \"action\": \"allow\"|\"warn\"|\"block\"|\"ban\"|\"escalate\", \
\"reason\": string, \"confidence\": number between 0 and 1}.";

/// Analyzer backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl LlmAnalyzer {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            timeout,
        })
    }

    fn build_prompt(contents: &[String]) -> String {
        let mut prompt = format!("Moderate these {} items:\n", contents.len());
        for (i, content) in contents.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, json!(content)));
        }
        prompt
    }
}

/// Parses model text into JSON, tolerating markdown code fences.
///
/// Text that still fails to parse is handed back as a JSON string so the
/// caller's normalization treats it as malformed output.
pub fn parse_model_text(text: &str) -> Value {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(unfenced).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> AnalyzerError {
    if err.is_timeout() {
        AnalyzerError::Timeout(timeout)
    } else {
        AnalyzerError::Transport(err.to_string())
    }
}

#[async_trait]
impl ContentAnalyzer for LlmAnalyzer {
    async fn analyze_raw(&self, contents: &[String]) -> Result<Value, AnalyzerError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::build_prompt(contents) },
            ],
        });

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AnalyzerError::Unauthorized(format!(
                "analyzer responded {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(AnalyzerError::Transport(format!(
                "analyzer responded {}",
                status
            )));
        }

        let payload: Value = match res.json().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "analyzer envelope was not JSON");
                return Ok(Value::Null);
            }
        };

        Ok(payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(parse_model_text)
            .unwrap_or(Value::Null))
    }
}
