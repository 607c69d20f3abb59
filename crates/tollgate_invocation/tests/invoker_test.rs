//! Tests for the invocation orchestrator.

mod test_utils;

use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use test_utils::{MockBackend, MockResponse, PRIMARY_MODEL, SECONDARY_MODEL, harness};
use tollgate_cache::ResponseCache;
use tollgate_core::{
    CacheConfig, GenerateRequest, InvocationConfig, ManualClock, ModelTier, Task, TierPreference,
};
use tollgate_error::{GenerationErrorKind, StorageError, StorageErrorKind, TollgateResult};
use tollgate_invocation::{Invocation, InvocationErrorKind, Invoker, StatusCodeClassifier, TierModels};
use tollgate_rate_limit::{QuotaLedger, QuotaLimits};
use tollgate_storage::{KeyValueStore, MemoryStore};

fn json_request(contents: serde_json::Value) -> GenerateRequest {
    GenerateRequest::builder().contents(contents).build().unwrap()
}

fn quota_error() -> GenerationErrorKind {
    GenerationErrorKind::Http {
        status_code: 429,
        message: "RESOURCE_EXHAUSTED: Quota exceeded for metric".to_string(),
    }
}

fn transient_error() -> GenerationErrorKind {
    GenerationErrorKind::Http {
        status_code: 503,
        message: "UNAVAILABLE: The model is overloaded".to_string(),
    }
}

#[tokio::test]
async fn test_success_returns_text_and_records() {
    let h = harness(MockBackend::new_success("{\"ok\":true}")).await;
    let invocation = Invocation::new(Task::LeadEnrichment, json_request(json!({"q": "x"})));

    let text = h.invoker.invoke(&invocation).await.unwrap();

    assert_eq!(text, "{\"ok\":true}");
    assert_eq!(h.backend.call_count(), 1);
    let secondary = h.ledger.availability(ModelTier::Secondary).await;
    assert_eq!(secondary.rpm_left, 14);
    assert_eq!(secondary.rpd_left, 1499);
    assert_eq!(h.invoker.total_tokens_consumed().await, 3);
}

#[tokio::test]
async fn test_system_instruction_and_model_are_sent() {
    let h = harness(MockBackend::new_success("done")).await;
    let invocation = Invocation::new(Task::StrategicPlan, GenerateRequest::text("plan"));

    h.invoker.invoke(&invocation).await.unwrap();

    let calls = h.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PRIMARY_MODEL);
    assert_eq!(
        calls[0].1.config.system_instruction.as_deref(),
        Some("You are a B2B auditor. Always answer in plain JSON.")
    );
}

#[tokio::test]
async fn test_repeat_within_a_day_is_served_from_cache() {
    let h = harness(MockBackend::new_success("abc")).await;
    let invocation = Invocation::new(Task::LeadEnrichment, json_request(json!({"q": "x"})))
        .with_tier(TierPreference::Secondary);

    let first = h.invoker.invoke(&invocation).await.unwrap();
    let after_first = h.ledger.availability(ModelTier::Secondary).await;

    h.clock.advance(Duration::minutes(1));
    let before_second = h.ledger.availability(ModelTier::Secondary).await;
    let second = h.invoker.invoke(&invocation).await.unwrap();
    let after_second = h.ledger.availability(ModelTier::Secondary).await;

    assert_eq!(first, "abc");
    assert_eq!(second, "abc");
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(after_first.rpd_left, 1499);
    assert_eq!(before_second, after_second);
    assert_eq!(h.invoker.total_tokens_saved().await, 1);
}

#[tokio::test]
async fn test_cache_hit_ignores_closed_tier() {
    let h = harness(MockBackend::new_success("cached")).await;
    let invocation = Invocation::new(Task::KnowledgeQuestion, GenerateRequest::text("q"))
        .with_tier(TierPreference::Secondary);

    h.invoker.invoke(&invocation).await.unwrap();
    h.ledger.record_hard_block(ModelTier::Secondary).await.unwrap();

    assert_eq!(h.invoker.invoke(&invocation).await.unwrap(), "cached");
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn test_cache_expires_after_a_day() {
    let h = harness(MockBackend::new_success("abc")).await;
    let invocation = Invocation::new(Task::ContentIdeas, GenerateRequest::text("ideas"));

    h.invoker.invoke(&invocation).await.unwrap();
    h.clock.advance(Duration::hours(24));
    h.invoker.invoke(&invocation).await.unwrap();

    assert_eq!(h.backend.call_count(), 2);
}

#[tokio::test]
async fn test_quota_rejection_blocks_tier_without_retry() {
    let h = harness(MockBackend::new_error(quota_error())).await;
    let mut events = h.invoker.subscribe();
    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"))
        .with_tier(TierPreference::Secondary);

    let err = h.invoker.invoke(&invocation).await.unwrap_err();

    assert!(err.is_quota());
    assert_eq!(
        err.kind,
        InvocationErrorKind::QuotaExceeded {
            tier: ModelTier::Secondary,
            retry_after_secs: 86_400,
        }
    );
    assert_eq!(h.backend.call_count(), 1);

    let snapshot = h.ledger.availability(ModelTier::Secondary).await;
    assert!(snapshot.is_hard_blocked);
    assert_eq!(snapshot.rpd_used, 0);

    let event = events.recv().await.unwrap();
    assert_eq!(event.tier, ModelTier::Secondary);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_quota_wording_without_status_is_terminal() {
    let h = harness(MockBackend::new_error(GenerationErrorKind::Provider(
        "Daily limit reached".to_string(),
    )))
    .await;
    let invocation = Invocation::new(Task::LeadProspecting, GenerateRequest::text("find"))
        .with_tier(TierPreference::Primary)
        .with_retries(5);

    let err = h.invoker.invoke(&invocation).await.unwrap_err();

    assert!(err.is_quota());
    assert_eq!(h.backend.call_count(), 1);
    assert!(h.ledger.availability(ModelTier::Primary).await.is_hard_blocked);
}

#[tokio::test]
async fn test_blocked_tier_fails_without_calling() {
    let h = harness(MockBackend::new_success("never")).await;
    h.ledger.record_success(ModelTier::Primary, 1).await.unwrap();
    h.ledger.record_success(ModelTier::Primary, 1).await.unwrap();
    h.clock.advance(Duration::seconds(20));

    let invocation = Invocation::new(Task::StrategicPlan, GenerateRequest::text("plan"))
        .with_tier(TierPreference::Primary);
    let err = h.invoker.invoke(&invocation).await.unwrap_err();

    assert_eq!(
        err.kind,
        InvocationErrorKind::QuotaExceeded {
            tier: ModelTier::Primary,
            retry_after_secs: 40,
        }
    );
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let h = harness(MockBackend::new_fail_then_succeed(2, transient_error(), "recovered")).await;
    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"));

    let text = h.invoker.invoke(&invocation).await.unwrap();

    assert_eq!(text, "recovered");
    assert_eq!(h.backend.call_count(), 3);
    // Only the successful attempt counts against the windows
    assert_eq!(h.ledger.availability(ModelTier::Secondary).await.rpd_used, 1);
}

#[tokio::test]
async fn test_exhausted_budget_is_connection_failure() {
    let h = harness(MockBackend::new_error(transient_error())).await;
    let invocation = Invocation::new(Task::CampaignPlanning, GenerateRequest::text("plan"));

    let err = h.invoker.invoke(&invocation).await.unwrap_err();

    match err.kind {
        InvocationErrorKind::ConnectionFailure { attempts, message } => {
            assert_eq!(attempts, 2);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected connection failure, got {:?}", other),
    }
    assert_eq!(h.backend.call_count(), 2);
    assert!(!h.ledger.availability(ModelTier::Secondary).await.is_hard_blocked);
}

#[tokio::test]
async fn test_retry_override_and_minimum_of_one() {
    let h = harness(MockBackend::new_error(transient_error())).await;

    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("a")).with_retries(0);
    h.invoker.invoke(&invocation).await.unwrap_err();
    assert_eq!(h.backend.call_count(), 1);

    let invocation = Invocation::new(Task::MarketingCopy, GenerateRequest::text("b")).with_retries(4);
    h.invoker.invoke(&invocation).await.unwrap_err();
    assert_eq!(h.backend.call_count(), 5);
}

#[tokio::test]
async fn test_quota_after_transient_stops_retrying() {
    let h = harness(MockBackend::new_sequence(vec![
        MockResponse::Error(transient_error()),
        MockResponse::Error(quota_error()),
        MockResponse::Success("unreachable".to_string()),
    ]))
    .await;
    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"));

    let err = h.invoker.invoke(&invocation).await.unwrap_err();

    assert!(err.is_quota());
    assert_eq!(h.backend.call_count(), 2);
}

#[tokio::test]
async fn test_status_classifier_fails_fast_on_auth_errors() {
    let h = harness(MockBackend::new_error(GenerationErrorKind::Http {
        status_code: 403,
        message: "PERMISSION_DENIED: API key invalid".to_string(),
    }))
    .await;
    let invoker = h.invoker.with_classifier(Arc::new(StatusCodeClassifier));
    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"));

    let err = invoker.invoke(&invocation).await.unwrap_err();

    assert!(matches!(
        err.kind,
        InvocationErrorKind::ConnectionFailure { attempts: 1, .. }
    ));
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn test_auto_falls_back_when_primary_day_blocked() {
    let h = harness(MockBackend::new_success("fallback")).await;
    h.ledger.record_hard_block(ModelTier::Primary).await.unwrap();

    let invocation = Invocation::new(Task::LeadProspecting, GenerateRequest::text("find"));
    h.invoker.invoke(&invocation).await.unwrap();

    assert_eq!(h.backend.calls()[0].0, SECONDARY_MODEL);
}

#[tokio::test]
async fn test_auto_stays_on_primary_for_short_waits() {
    let h = harness(MockBackend::new_success("ok")).await;
    h.ledger.record_success(ModelTier::Primary, 1).await.unwrap();
    h.ledger.record_success(ModelTier::Primary, 1).await.unwrap();
    h.clock.advance(Duration::seconds(50));

    assert_eq!(
        h.invoker
            .resolve_tier(Task::StrategicPlan, TierPreference::Auto)
            .await,
        ModelTier::Primary
    );

    // Primary stays the choice, so the gate refuses rather than falling back
    let invocation = Invocation::new(Task::StrategicPlan, GenerateRequest::text("plan"));
    let err = h.invoker.invoke(&invocation).await.unwrap_err();
    assert_eq!(err.retry_after_secs(), Some(10));
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn test_explicit_tier_is_never_downgraded() {
    let h = harness(MockBackend::new_success("ok")).await;
    h.ledger.record_hard_block(ModelTier::Primary).await.unwrap();

    assert_eq!(
        h.invoker
            .resolve_tier(Task::LeadProspecting, TierPreference::Primary)
            .await,
        ModelTier::Primary
    );
    assert_eq!(
        h.invoker
            .resolve_tier(Task::LeadEnrichment, TierPreference::Auto)
            .await,
        ModelTier::Secondary
    );
}

#[tokio::test]
async fn test_concurrent_identical_requests_make_one_call() {
    let h = harness(
        MockBackend::new_success("shared").with_delay(std::time::Duration::from_millis(50)),
    )
    .await;
    let invoker = Arc::new(h.invoker);
    let invocation = Invocation::new(Task::LeadEnrichment, json_request(json!({"lead": 7})));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let invoker = Arc::clone(&invoker);
        let invocation = invocation.clone();
        handles.push(tokio::spawn(async move { invoker.invoke(&invocation).await }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn test_probe_reports_success() {
    let h = harness(MockBackend::new_success("pong")).await;

    let status = h.invoker.probe().await;
    assert!(status.success);
    assert!(status.message.contains(SECONDARY_MODEL));

    // Probes are never cached
    h.invoker.probe().await;
    assert_eq!(h.backend.call_count(), 2);
    assert_eq!(h.backend.calls()[0].1.prompt_text(), "ping");
}

#[tokio::test]
async fn test_probe_reports_quota_exhaustion() {
    let h = harness(MockBackend::new_error(quota_error())).await;

    let status = h.invoker.probe().await;

    assert!(!status.success);
    assert!(status.message.contains("Quota exhausted"));
}

/// Store that refuses deletes.
#[derive(Debug, Clone, Default)]
struct UndeletableStore(MemoryStore);

#[async_trait::async_trait]
impl KeyValueStore for UndeletableStore {
    async fn get(&self, key: &str) -> TollgateResult<Option<Vec<u8>>> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> TollgateResult<()> {
        self.0.set(key, value).await
    }

    async fn delete(&self, key: &str) -> TollgateResult<()> {
        Err(StorageError::new(StorageErrorKind::Delete(format!("{}: read-only volume", key))).into())
    }
}

#[tokio::test]
async fn test_expired_entry_that_cannot_be_purged_is_refetched() {
    let store = UndeletableStore::default();
    let clock = ManualClock::default();
    let backend = Arc::new(MockBackend::new_success("fresh"));
    let ledger = QuotaLedger::open(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        QuotaLimits::default(),
    )
    .await
    .unwrap();
    let cache = ResponseCache::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        CacheConfig::default(),
    );
    let invoker = Invoker::new(
        Arc::new(ledger),
        Arc::new(cache),
        backend.clone(),
        InvocationConfig::default().with_backoff_ms(1),
        TierModels::new(PRIMARY_MODEL, SECONDARY_MODEL),
    )
    .unwrap();
    let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("audit"));

    invoker.invoke(&invocation).await.unwrap();
    clock.advance(Duration::hours(25));
    let text = invoker.invoke(&invocation).await.unwrap();

    assert_eq!(text, "fresh");
    assert_eq!(backend.call_count(), 2);
}
