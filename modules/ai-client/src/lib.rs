//! Minimal Anthropic Messages API client.
//!
//! One provider, two operations: free-text chat and schema-forced structured
//! output. Structured output is implemented with a single forced tool call so
//! the model cannot answer outside the schema; the response is still treated
//! as untrusted and deserialization failures surface as `AiError::Malformed`.

pub mod error;
pub mod util;

mod client;
mod types;

pub use error::{AiError, Result};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::debug;

use client::ApiClient;
use types::{ChatRequest, WireMessage};

/// Marker for types the model can be forced to emit. Blanket-implemented for
/// anything deserializable with a derived JSON schema.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send {
    fn output_schema() -> serde_json::Value {
        let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<Self>();
        serde_json::to_value(schema).expect("JSON schema serialization cannot fail")
    }
}

impl<T: DeserializeOwned + JsonSchema + Send> StructuredOutput for T {}

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ApiClient {
        let client = ApiClient::new(&self.api_key);
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    /// Extract a `T` from the model via a forced tool call.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        const TOOL_NAME: &str = "structured_response";

        debug!(model = %self.model, "structured extraction request");

        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .temperature(0.7)
            .force_tool(
                TOOL_NAME,
                "Return the structured result.",
                T::output_schema(),
            );

        let response = self.client().chat(&request).await?;

        let input = response
            .tool_input()
            .ok_or_else(|| AiError::Malformed("no structured output in response".to_string()))?;

        serde_json::from_value(input.clone()).map_err(|e| AiError::Malformed(e.to_string()))
    }

    /// Plain text completion.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .temperature(0.0);

        let response = self.client().chat(&request).await?;

        response
            .text()
            .ok_or_else(|| AiError::Malformed("no text in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_construction() {
        let ai = Claude::new("sk-ant-test", "claude-sonnet-4-20250514");
        assert_eq!(ai.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn schema_derivation_produces_object_schema() {
        #[derive(serde::Deserialize, schemars::JsonSchema)]
        struct Sample {
            #[allow(dead_code)]
            title: String,
        }
        let schema = <Sample as StructuredOutput>::output_schema();
        assert!(schema.get("properties").is_some());
    }
}
