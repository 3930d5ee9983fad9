use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl LlmDiagnosticsError {
    pub fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
        }
    }

    /// Body kept in `raw_output` only; `Display` stays short.
    pub fn decode(provider: Provider, err: impl fmt::Display, body: String) -> Self {
        Self {
            provider,
            stage: "decode",
            detail: format!("response JSON did not match: {err}"),
            raw_output: Some(body),
        }
    }

    pub fn empty_reply(provider: Provider, body: String) -> Self {
        Self {
            provider,
            stage: "decode",
            detail: "response carried no text content".to_string(),
            raw_output: Some(body),
        }
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider.as_str(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
