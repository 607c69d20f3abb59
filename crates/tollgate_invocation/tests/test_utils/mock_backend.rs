//! Scripted generation backend for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tollgate_core::{GenerateRequest, GenerateResponse};
use tollgate_error::{GenerationError, GenerationErrorKind, GenerationResult};
use tollgate_models::GenerationBackend;

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return success with the given text
    Success(String),
    /// Always return the specified error
    Error(GenerationErrorKind),
    /// Fail N times with the error, then succeed with the text
    FailThenSucceed {
        fail_count: usize,
        error: GenerationErrorKind,
        success_text: String,
    },
    /// Return a sequence of responses (errors or success)
    Sequence(Vec<MockResponse>),
}

/// A single mock response (success or error).
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum MockResponse {
    Success(String),
    Error(GenerationErrorKind),
}

/// Mock backend that counts calls and remembers what it was asked.
#[derive(Debug)]
pub struct MockBackend {
    behavior: MockBehavior,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
    calls: Arc<Mutex<Vec<(String, GenerateRequest)>>>,
}

#[allow(dead_code)]
impl MockBackend {
    /// Create a mock backend with custom behavior.
    pub fn new_with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock backend that always succeeds with the given text.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new_with_behavior(MockBehavior::Success(text.into()))
    }

    /// Create a mock backend that always fails with the given error.
    pub fn new_error(error: GenerationErrorKind) -> Self {
        Self::new_with_behavior(MockBehavior::Error(error))
    }

    /// Create a mock backend that fails N times, then succeeds.
    pub fn new_fail_then_succeed(
        fail_count: usize,
        error: GenerationErrorKind,
        success_text: impl Into<String>,
    ) -> Self {
        Self::new_with_behavior(MockBehavior::FailThenSucceed {
            fail_count,
            error,
            success_text: success_text.into(),
        })
    }

    /// Create a mock backend with a sequence of responses.
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self::new_with_behavior(MockBehavior::Sequence(responses))
    }

    /// Wait before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times generate() was called.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Model and request of every call, in order.
    pub fn calls(&self) -> Vec<(String, GenerateRequest)> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the next response based on the configured behavior.
    fn next_response(&self, model: &str) -> GenerationResult<GenerateResponse> {
        let mut count = self.call_count.lock().unwrap();
        let current_count = *count;
        *count += 1;

        let success = |text: &String| {
            Ok(GenerateResponse {
                text: text.clone(),
                model: model.to_string(),
            })
        };

        match &self.behavior {
            MockBehavior::Success(text) => success(text),
            MockBehavior::Error(kind) => Err(GenerationError::new(kind.clone())),
            MockBehavior::FailThenSucceed {
                fail_count,
                error,
                success_text,
            } => {
                if current_count < *fail_count {
                    Err(GenerationError::new(error.clone()))
                } else {
                    success(success_text)
                }
            }
            MockBehavior::Sequence(responses) => match responses.get(current_count) {
                Some(MockResponse::Success(text)) => success(text),
                Some(MockResponse::Error(kind)) => Err(GenerationError::new(kind.clone())),
                None => Err(GenerationError::new(GenerationErrorKind::Provider(
                    "mock sequence exhausted".to_string(),
                ))),
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> GenerationResult<GenerateResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.next_response(model)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
