//! Request and response types for generation calls.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Provider-facing generation options.
///
/// The orchestrator fills in `system_instruction` before every call; callers
/// normally leave it unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// MIME type the model should answer with (e.g. `application/json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Allow the model to ground its answer with web search
    #[serde(default)]
    pub google_search: bool,
    /// Fixed instruction constraining the output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

/// A generation payload: contents plus options.
///
/// `contents` is free-form JSON. A JSON string is sent to the model as a
/// single text part; any other value is sent as its JSON text.
///
/// # Examples
///
/// ```
/// use tollgate_core::{GenerateRequest, GenerationConfig};
/// use serde_json::json;
///
/// let request = GenerateRequest::builder()
///     .contents(json!({"q": "x"}))
///     .config(GenerationConfig {
///         response_mime_type: Some("application/json".to_string()),
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(request.contents["q"], "x");
/// assert_eq!(GenerateRequest::text("ping").prompt_text(), "ping");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into), default)]
pub struct GenerateRequest {
    /// Request contents
    pub contents: JsonValue,
    /// Generation options
    pub config: GenerationConfig,
}

impl GenerateRequest {
    /// Creates a builder for a request.
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }

    /// Plain-text request with default options.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: JsonValue::String(prompt.into()),
            config: GenerationConfig::default(),
        }
    }

    /// Contents as the text sent to the model.
    pub fn prompt_text(&self) -> String {
        match &self.contents {
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Stable JSON serialization with object keys sorted at every depth.
    ///
    /// Two requests that are equal always serialize identically, regardless
    /// of the order their JSON objects were built in.
    pub fn canonical_json(&self) -> String {
        match serde_json::to_value(self) {
            Ok(value) => canonicalize(value).to_string(),
            // to_value only fails on non-string map keys, which requests never hold.
            Err(_) => format!("{:?}", self),
        }
    }
}

fn canonicalize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Text returned by a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Raw generated text
    pub text: String,
    /// Concrete model identifier that produced the text
    pub model: String,
}
