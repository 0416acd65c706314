//! End-to-end runs of the report generator against test doubles.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use cwv_cache::{CacheKey, CacheStage, CacheStore, FileCacheStore, MemoryCacheStore};
use cwv_core::{
    DeviceType, DowngradeReason, FailureKind, ReportEvent, Role, Stage, Tier,
};
use cwv_llm::{BackendError, LlmResponse};
use cwv_report::{AttemptOutcome, CollectError, ReportError, ReportRequest};

use common::{
    Harness, MODEL, PAGE, ReadOnlyReports, ScriptedBackend, StubCollectors, auth_rejected,
    context_overflow, report_writes,
};

fn request() -> ReportRequest {
    ReportRequest::new(PAGE, DeviceType::Mobile)
}

fn downgrades(h: &Harness) -> Vec<(Tier, Tier, DowngradeReason)> {
    h.events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::Downgraded { from, to, reason } => Some((from, to, reason)),
            _ => None,
        })
        .collect()
}

fn budget_checks(h: &Harness) -> Vec<(Tier, u64, bool)> {
    h.events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::BudgetChecked {
                tier,
                total_tokens,
                admissible,
                ..
            } => Some((tier, total_tokens, admissible)),
            _ => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Small dataset fits the full tier
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn small_dataset_uses_full_tier() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let cache = Arc::new(MemoryCacheStore::new());

    let report = h.generator(cache.clone()).generate(&request()).await.unwrap();

    assert!(!report.from_cache);
    assert_eq!(report.tier, Some(Tier::Full));
    assert_eq!(report.content(), "# CWV Report\n\nLCP is poor.");
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Success);

    let checks = budget_checks(&h);
    assert_eq!(checks.len(), 1);
    assert!(checks[0].1 < 86_400);
    assert!(checks[0].2);
    assert!(downgrades(&h).is_empty());

    // one report entry: the response object plus its text
    assert_eq!(report_writes(&cache), 2);
    assert!(report.location.is_some());
}

#[tokio::test]
async fn full_tier_request_carries_nine_messages() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let _ = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap();

    let sent = h.backend.request(0);
    assert_eq!(sent.len(), 9);
    assert_eq!(sent[0].role, Role::System);
    assert!(sent[0].content.contains("Edge Delivery"));
    assert!(sent[1].content.starts_with("Step 1: CrUX Data"));
    assert!(sent[6].content.contains("1 resources checked"));
    assert!(sent[7].content.contains("console.log('app');"));
    assert!(sent[8].content.contains(PAGE));
}

#[tokio::test]
async fn events_follow_pipeline_order() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let _ = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap();

    let events = h.events();
    assert_matches!(&events[0], ReportEvent::RunStarted { model, .. } if model == MODEL);
    assert_matches!(events[1], ReportEvent::ReportCacheMiss);
    assert_matches!(events[2], ReportEvent::CollectionStarted);
    assert_matches!(
        events.last(),
        Some(ReportEvent::ReportCached { .. })
    );
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::CmsDetected { cms } if cms == "aem-eds")),
        1
    );
    assert_eq!(
        h.count_events(|e| matches!(
            e,
            ReportEvent::StageCompleted {
                stage: Stage::LabAudit,
                provenance: cwv_core::CacheProvenance::Hit,
                ..
            }
        )),
        1
    );
    assert_eq!(
        h.count_events(|e| matches!(
            e,
            ReportEvent::ResourcesCollected {
                total: 2,
                failed: 1,
                ..
            }
        )),
        1
    );
}

#[tokio::test]
async fn prompt_is_persisted_in_both_forms() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let cache = Arc::new(MemoryCacheStore::new());
    let _ = h.generator(cache.clone()).generate(&request()).await.unwrap();

    let key = CacheKey::new(PAGE, DeviceType::Mobile, CacheStage::Prompt).with_variant("full");
    let messages = cache.read_json(&key).unwrap().unwrap();
    assert_eq!(messages.as_array().map(Vec::len), Some(9));
    let joined = cache.read_text(&key).unwrap().unwrap();
    assert_eq!(joined.matches("\n---\n").count(), 8);
}

// ─────────────────────────────────────────────────────────────────────────────
// Full tier over budget
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_dataset_is_sent_summarized_only() {
    let h = Harness::new(StubCollectors::huge(), ScriptedBackend::ok());
    let cache = Arc::new(MemoryCacheStore::new());

    let report = h.generator(cache.clone()).generate(&request()).await.unwrap();

    assert_eq!(report.tier, Some(Tier::Summarized));
    assert_eq!(h.backend.call_count(), 1);
    let sent: usize = h.backend.request(0).iter().map(|m| m.content.len()).sum();
    assert!(sent < 100_000, "summarized prompt was {sent} bytes");

    let checks = budget_checks(&h);
    assert_eq!(checks[0].0, Tier::Full);
    assert!(checks[0].1 >= 150_000);
    assert!(!checks[0].2);
    assert_eq!(
        downgrades(&h),
        vec![(Tier::Full, Tier::Summarized, DowngradeReason::BudgetExceeded)]
    );
    assert_eq!(report_writes(&cache), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication failure
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_failure_is_fatal_without_downgrade() {
    let h = Harness::new(
        StubCollectors::small(),
        ScriptedBackend::with_script(vec![Err(auth_rejected())]),
    );
    let cache = Arc::new(MemoryCacheStore::new());

    let err = h.generator(cache.clone()).generate(&request()).await.unwrap_err();

    assert_matches!(
        err,
        ReportError::Backend {
            kind: FailureKind::AuthInvalid,
            tier: Tier::Full,
            source: BackendError::Auth { .. },
        }
    );
    assert_eq!(h.backend.call_count(), 1);
    assert!(downgrades(&h).is_empty());
    assert_eq!(report_writes(&cache), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Idempotence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let generator = h.generator(Arc::new(FileCacheStore::new(dir.path())));

    let first = generator.generate(&request()).await.unwrap();
    let collector_calls = h.collectors.call_count();
    let second = generator.generate(&request()).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.content(), first.content());
    assert_eq!(second.tier, None);
    assert!(second.attempts.is_empty());
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.collectors.call_count(), collector_calls);
    assert_eq!(*h.rules.calls.lock(), 1);
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::ReportCacheHit { .. })),
        1
    );

    let location = second.location.unwrap();
    assert!(std::path::Path::new(location.as_str()).exists());
}

#[tokio::test]
async fn cached_report_is_scoped_by_model_and_device() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let cache = Arc::new(MemoryCacheStore::new());
    let generator = h.generator(cache.clone());

    let _ = generator.generate(&request()).await.unwrap();
    let desktop = generator
        .generate(&ReportRequest::new(PAGE, DeviceType::Desktop))
        .await
        .unwrap();

    assert!(!desktop.from_cache);
    assert_eq!(h.backend.call_count(), 2);
}

#[tokio::test]
async fn skip_cache_forces_a_new_run() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let generator = h.generator(Arc::new(MemoryCacheStore::new()));

    for _ in 0..2 {
        let report = generator
            .generate(&request().skip_cache(true))
            .await
            .unwrap();
        assert!(!report.from_cache);
    }
    assert_eq!(h.backend.call_count(), 2);
    assert_eq!(*h.rules.calls.lock(), 2);
}

#[tokio::test]
async fn unreadable_cached_report_is_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(FileCacheStore::new(dir.path()));
    let key = CacheKey::new(PAGE, DeviceType::Mobile, CacheStage::Report).with_model(MODEL);
    let _ = cache
        .write_json(&key, &serde_json::json!({"kwargs": {"content": "old"}}))
        .unwrap();

    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let generator = h.generator(cache.clone());
    let report = generator.generate(&request()).await.unwrap();

    assert!(!report.from_cache);
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::ReportCacheMiss)),
        1
    );

    let again = generator.generate(&request()).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.content(), report.content());
    assert_eq!(h.backend.call_count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Downgrade-once
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn overflow_twice_stops_after_one_downgrade() {
    let h = Harness::new(
        StubCollectors::small(),
        ScriptedBackend::with_script(vec![Err(context_overflow()), Err(context_overflow())]),
    );
    let cache = Arc::new(MemoryCacheStore::new());

    let err = h.generator(cache.clone()).generate(&request()).await.unwrap_err();

    assert_matches!(
        err,
        ReportError::Backend {
            kind: FailureKind::ContextOverflow,
            tier: Tier::Summarized,
            ..
        }
    );
    assert_eq!(h.backend.call_count(), 2);
    assert_eq!(
        downgrades(&h),
        vec![(Tier::Full, Tier::Summarized, DowngradeReason::ContextOverflow)]
    );
    assert_eq!(report_writes(&cache), 0);
}

#[tokio::test]
async fn overflow_then_success_returns_summarized_report() {
    let h = Harness::new(
        StubCollectors::small(),
        ScriptedBackend::with_script(vec![
            Err(context_overflow()),
            Ok(LlmResponse::new("# Summarized report", MODEL)),
        ]),
    );

    let report = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap();

    assert_eq!(report.tier, Some(Tier::Summarized));
    assert_eq!(report.content(), "# Summarized report");
    let outcomes: Vec<_> = report.attempts.iter().map(|a| (a.tier, a.outcome)).collect();
    assert_eq!(
        outcomes,
        vec![
            (Tier::Full, AttemptOutcome::Failed(FailureKind::ContextOverflow)),
            (Tier::Summarized, AttemptOutcome::Success),
        ]
    );
    assert!(h.backend.request(1)[1].content.starts_with("Step 1: CrUX Summary"));
}

#[tokio::test]
async fn budget_downgrade_counts_toward_the_single_downgrade() {
    let h = Harness::new(
        StubCollectors::huge(),
        ScriptedBackend::with_script(vec![Err(context_overflow())]),
    );

    let err = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::ContextOverflow));
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(downgrades(&h).len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Other terminal failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rate_limit_is_surfaced_without_retry() {
    let h = Harness::new(
        StubCollectors::small(),
        ScriptedBackend::with_script(vec![Err(BackendError::RateLimited {
            retry_after_ms: 300_000,
            message: "Rate limit reached".into(),
        })]),
    );

    let err = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after_ms(), Some(300_000));
    assert_eq!(h.backend.call_count(), 1);
    assert!(downgrades(&h).is_empty());
}

#[tokio::test]
async fn server_error_is_unknown_and_fatal() {
    let h = Harness::new(
        StubCollectors::small(),
        ScriptedBackend::with_script(vec![Err(BackendError::Api {
            status: 503,
            message: "upstream unavailable".into(),
            code: None,
            retryable: true,
        })]),
    );

    let err = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::Unknown));
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn collector_failure_aborts_before_any_llm_call() {
    let h = Harness::new(StubCollectors::small().failing_lab(), ScriptedBackend::ok());

    let err = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ReportError::Collection(CollectError::Failed {
            stage: Stage::LabAudit,
            ..
        })
    );
    assert_eq!(h.backend.call_count(), 0);
    assert_eq!(*h.rules.calls.lock(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// NoData sentinel
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_field_data_still_produces_a_report() {
    let field = serde_json::json!({"error": {"code": 404, "message": "chrome ux report data not found"}});
    let h = Harness::new(StubCollectors::small().with_field(field), ScriptedBackend::ok());

    let report = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap();

    assert_eq!(report.tier, Some(Tier::Full));
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::NoData { stage: Stage::FieldData })),
        1
    );
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::LlmFailed { .. })),
        0
    );
    let sent = h.backend.request(0);
    assert_eq!(sent.len(), 9);
    assert!(sent[1].content.contains("No CrUX Data is available"));
}

#[tokio::test]
async fn other_field_data_error_is_reported_and_skipped() {
    let field = serde_json::json!({"error": {"code": 429, "message": "quota exceeded"}});
    let h = Harness::new(StubCollectors::small().with_field(field), ScriptedBackend::ok());

    let _ = h
        .generator(Arc::new(MemoryCacheStore::new()))
        .generate(&request())
        .await
        .unwrap();

    assert_eq!(
        h.count_events(|e| matches!(
            e,
            ReportEvent::StageFailed { stage: Stage::FieldData, message } if message == "quota exceeded"
        )),
        1
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache policy
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_report_write_still_returns_the_report() {
    let h = Harness::new(StubCollectors::small(), ScriptedBackend::ok());
    let cache = Arc::new(ReadOnlyReports::default());

    let report = h.generator(cache.clone()).generate(&request()).await.unwrap();

    assert_eq!(report.content(), "# CWV Report\n\nLCP is poor.");
    assert!(report.location.is_none());
    assert_eq!(
        h.count_events(|e| matches!(e, ReportEvent::ReportCached { .. })),
        0
    );
}
