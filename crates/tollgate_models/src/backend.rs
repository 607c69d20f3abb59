//! Generation backend trait.

use std::sync::Arc;
use tollgate_core::{GenerateRequest, GenerateResponse};
use tollgate_error::GenerationResult;

/// A provider that turns a request into generated text.
///
/// Implementations make a single attempt per call and report failures as
/// [`GenerationError`](tollgate_error::GenerationError)s whose message carries
/// the provider's own wording, so quota rejections can be recognised.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync + std::fmt::Debug {
    /// Generate text for `request` with the model identified by `model`.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> GenerationResult<GenerateResponse>;

    /// Provider name used in logs and metrics (e.g. "gemini").
    fn provider_name(&self) -> &'static str;
}

/// Shared backend handle.
pub type SharedBackend = Arc<dyn GenerationBackend>;
