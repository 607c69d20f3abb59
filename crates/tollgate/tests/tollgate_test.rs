//! Tests for wiring the invocation layer from configuration.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tollgate::{
    FileSystemStore, GenerateRequest, GenerateResponse, GenerationBackend, GenerationResult,
    Invocation, InvocationErrorKind, ManualClock, MemoryStore, ModelTier, Task, TierPreference,
    Tollgate, TollgateConfig,
};

/// Backend echoing the model it was asked for.
#[derive(Debug, Default)]
struct EchoBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn generate(
        &self,
        model: &str,
        _request: &GenerateRequest,
    ) -> GenerationResult<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerateResponse {
            text: format!("answered by {}", model),
            model: model.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }
}

#[tokio::test]
async fn test_from_parts_uses_configured_models() {
    let mut config = TollgateConfig::default();
    config.tiers.primary.model = "custom-pro".to_string();

    let backend = Arc::new(EchoBackend::default());
    let tollgate = Tollgate::from_parts(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
        backend.clone(),
    )
    .await
    .unwrap();

    let invocation = Invocation::new(Task::StrategicPlan, GenerateRequest::text("plan"));
    let text = tollgate.invoker().invoke(&invocation).await.unwrap();

    assert_eq!(text, "answered by custom-pro");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_from_parts_applies_configured_caps() {
    let mut config = TollgateConfig::default();
    config.tiers.secondary.rpm = 1;

    let tollgate = Tollgate::from_parts(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
        Arc::new(EchoBackend::default()),
    )
    .await
    .unwrap();

    let invoker = tollgate.invoker();
    invoker
        .invoke(&Invocation::new(Task::MarketingCopy, GenerateRequest::text("a")))
        .await
        .unwrap();
    let err = invoker
        .invoke(&Invocation::new(Task::MarketingCopy, GenerateRequest::text("b")))
        .await
        .unwrap_err();

    assert!(err.is_quota());
    assert_eq!(invoker.availability(ModelTier::Secondary).await.limits.requests_per_minute, 1);
}

#[tokio::test]
async fn test_from_parts_rejects_invalid_config() {
    let mut config = TollgateConfig::default();
    config.tiers.primary.rpd = 0;

    let err = Tollgate::from_parts(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
        Arc::new(EchoBackend::default()),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.kind, InvocationErrorKind::Configuration(_)));
}

#[tokio::test]
async fn test_state_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::default();

    {
        let tollgate = Tollgate::from_parts(
            TollgateConfig::default(),
            Arc::new(FileSystemStore::new(dir.path()).unwrap()),
            Arc::new(clock.clone()),
            Arc::new(EchoBackend::default()),
        )
        .await
        .unwrap();
        let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"))
            .with_tier(TierPreference::Secondary);
        tollgate.invoker().invoke(&invocation).await.unwrap();
        tollgate
            .invoker()
            .ledger()
            .record_hard_block(ModelTier::Primary)
            .await
            .unwrap();
    }

    clock.advance(chrono::Duration::minutes(5));
    let backend = Arc::new(EchoBackend::default());
    let tollgate = Tollgate::from_parts(
        TollgateConfig::default(),
        Arc::new(FileSystemStore::new(dir.path()).unwrap()),
        Arc::new(clock.clone()),
        backend.clone(),
    )
    .await
    .unwrap();
    let invoker = tollgate.invoker();

    assert!(invoker.availability(ModelTier::Primary).await.is_hard_blocked);
    assert_eq!(invoker.availability(ModelTier::Secondary).await.rpd_used, 1);
    // "answered by gemini-3-flash-preview" is 34 chars
    assert_eq!(invoker.total_tokens_consumed().await, 9);

    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"))
        .with_tier(TierPreference::Secondary);
    invoker.invoke(&invocation).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(invoker.total_tokens_saved().await, 9);
}
