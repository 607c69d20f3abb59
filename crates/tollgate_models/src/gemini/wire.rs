//! Gemini REST wire types.

use serde::{Deserialize, Serialize};
use tollgate_core::GenerateRequest;

/// Body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentBody {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<WireGenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GoogleSearch {}

impl GenerateContentBody {
    pub(crate) fn from_request(request: &GenerateRequest) -> Self {
        let config = &request.config;

        let system_instruction = config.system_instruction.as_ref().map(|text| Content {
            role: None,
            parts: vec![Part {
                text: Some(text.clone()),
            }],
        });

        let generation_config = if config.response_mime_type.is_some()
            || config.temperature.is_some()
            || config.max_output_tokens.is_some()
        {
            Some(WireGenerationConfig {
                response_mime_type: config.response_mime_type.clone(),
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            })
        } else {
            None
        };

        let tools = if config.google_search {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt_text()),
                }],
            }],
            system_instruction,
            generation_config,
            tools,
        }
    }
}

/// Successful `generateContent` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    pub(crate) fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorBody {
    /// Provider message prefixed by its status name, e.g. `RESOURCE_EXHAUSTED: ...`.
    pub(crate) fn describe(&self) -> String {
        match &self.status {
            Some(status) => format!("{}: {}", status, self.message),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_core::GenerationConfig;

    #[test]
    fn body_carries_instruction_and_options() {
        let request = GenerateRequest {
            contents: json!("Find leads in Berlin"),
            config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                google_search: true,
                system_instruction: Some("Answer in JSON.".to_string()),
                ..Default::default()
            },
        };

        let body = serde_json::to_value(GenerateContentBody::from_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "Find leads in Berlin"}]}],
                "systemInstruction": {"parts": [{"text": "Answer in JSON."}]},
                "generationConfig": {"responseMimeType": "application/json"},
                "tools": [{"googleSearch": {}}]
            })
        );
    }

    #[test]
    fn bare_request_omits_optional_sections() {
        let body =
            serde_json::to_value(GenerateContentBody::from_request(&GenerateRequest::text("hi")))
                .unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn structured_contents_are_sent_as_json_text() {
        let request = GenerateRequest {
            contents: json!({"q": "x"}),
            config: GenerationConfig::default(),
        };
        let body = GenerateContentBody::from_request(&request);
        assert_eq!(body.contents[0].parts[0].text.as_deref(), Some(r#"{"q":"x"}"#));
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(response.text(), None);
        assert_eq!(
            response.prompt_feedback.and_then(|f| f.block_reason).as_deref(),
            Some("SAFETY")
        );
    }

    #[test]
    fn error_body_includes_status_name() {
        let envelope: ErrorEnvelope = serde_json::from_value(json!({
            "error": {"code": 429, "message": "Quota exceeded for metric", "status": "RESOURCE_EXHAUSTED"}
        }))
        .unwrap();
        assert_eq!(
            envelope.error.describe(),
            "RESOURCE_EXHAUSTED: Quota exceeded for metric"
        );
    }
}
