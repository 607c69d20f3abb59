//! Gemini REST client.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_models::{GeminiRestBackend, GenerationBackend};
//! use tollgate_core::GenerateRequest;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = GeminiRestBackend::new(std::env::var("GEMINI_API_KEY")?)?;
//! let response = backend
//!     .generate("gemini-3-pro-preview", &GenerateRequest::text("Plan a campaign"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use super::wire::{ErrorEnvelope, GenerateContentBody, GenerateContentResponse};
use crate::{BackendMetrics, GenerationBackend, classify_error};
use std::env;
use std::time::{Duration, Instant};
use tollgate_core::{GenerateRequest, GenerateResponse};
use tollgate_error::{GenerationError, GenerationErrorKind, GenerationResult};
use tracing::instrument;

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const PROVIDER: &str = "gemini";

/// Gemini `generateContent` backend over plain HTTPS.
///
/// One HTTP request per [`generate`](GenerationBackend::generate) call; no
/// retries or rate limiting happen here.
#[derive(Clone)]
pub struct GeminiRestBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiRestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiRestBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiRestBackend {
    /// Create a backend for the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the HTTP client cannot be built.
    #[instrument(name = "gemini_backend_new", skip(api_key))]
    pub fn new(api_key: impl Into<String>) -> GenerationResult<Self> {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a backend reading the key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationErrorKind::MissingApiKey`] if the variable is unset.
    #[instrument(name = "gemini_backend_from_env")]
    pub fn from_env() -> GenerationResult<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| GenerationError::new(GenerationErrorKind::MissingApiKey))?;
        Self::new(api_key)
    }

    /// Create a backend for a specific endpoint and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the HTTP client cannot be built.
    #[instrument(name = "gemini_backend_with_endpoint", skip(api_key, base_url), fields(base_url = %base_url.as_ref()))]
    pub fn with_endpoint(
        api_key: impl Into<String>,
        base_url: impl AsRef<str>,
        timeout: Duration,
    ) -> GenerationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::MissingApiKey));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::ClientCreation(e.to_string())))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for a model.
    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn generate_internal(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> GenerationResult<GenerateResponse> {
        let body = GenerateContentBody::from_request(request);

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::new(GenerationErrorKind::Transport(e.to_string())))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::new(GenerationErrorKind::Transport(e.to_string())))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                Ok(envelope) => envelope.error.describe(),
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(GenerationError::new(GenerationErrorKind::Http {
                status_code: status.as_u16(),
                message,
            }));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::new(GenerationErrorKind::MalformedResponse(e.to_string())))?;

        match parsed.text() {
            Some(text) => Ok(GenerateResponse {
                text,
                model: model.to_string(),
            }),
            None => {
                let reason = parsed
                    .prompt_feedback
                    .and_then(|feedback| feedback.block_reason)
                    .or_else(|| {
                        parsed
                            .candidates
                            .first()
                            .and_then(|candidate| candidate.finish_reason.clone())
                    });
                Err(GenerationError::new(match reason {
                    Some(reason) => {
                        GenerationErrorKind::Provider(format!("no text returned ({})", reason))
                    }
                    None => GenerationErrorKind::MalformedResponse(
                        "response contained no text".to_string(),
                    ),
                }))
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for GeminiRestBackend {
    #[instrument(skip(self, request), fields(provider = PROVIDER))]
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> GenerationResult<GenerateResponse> {
        let started = Instant::now();
        let result = self.generate_internal(model, request).await;
        let metrics = BackendMetrics::get();

        match &result {
            Ok(response) => {
                tracing::debug!(chars = response.text.len(), "Gemini call succeeded");
                metrics.record_request(PROVIDER, model, started.elapsed().as_secs_f64());
            }
            Err(e) => {
                tracing::debug!(error = %e, "Gemini call failed");
                metrics.record_error(PROVIDER, model, classify_error(e));
            }
        }

        result
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
