use super::helpers::{
    InterleavedQueue, StubAnalyzer, StubReply, TestApp, spawn_app, spawn_app_with, submission,
};
use chrono::Duration;
use moderation::{
    application::moderation::{
        analysis::AnalysisEngine,
        dto::SubmitContentRequest,
        processor::{BatchProcessor, BatchReport, ProcessError, ProcessorSettings},
    },
    domain::{
        moderation::{
            entity::{
                AI_UNAVAILABLE_REASON, ContentType, ModerationAction, ModerationResult, Priority,
                QueueStatus, Severity,
            },
            repository::{ContentModerationStatus, QueueStore},
        },
        shared::{clock::Clock, errors::DomainError},
    },
    infrastructure::ml::traits::AnalyzerError,
    workers::moderation_scheduler::ModerationScheduler,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

const BUDGET: StdDuration = StdDuration::from_secs(5);

fn submit_request(content: &str) -> SubmitContentRequest {
    SubmitContentRequest {
        user_id: "user-1".to_string(),
        user_name: "Test User".to_string(),
        content: content.to_string(),
        content_type: ContentType::Comment,
        content_id: "comment-1".to_string(),
        priority: Some(Priority::Low),
    }
}

#[tokio::test]
async fn url_flood_is_rejected_without_calling_the_analyzer() {
    let app = spawn_app();
    let response = app
        .moderation
        .submit(submit_request(
            "buy now http://a http://b http://c http://d http://e http://f",
        ))
        .await
        .expect("submission failed");
    assert_eq!(response.priority, Priority::High);
    assert!(!response.precheck.safe);

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.claimed, 1);
    assert_eq!(report.rejected, 1);
    assert!(app.analyzer.calls().is_empty());

    let item = app.moderation.get_item(response.queue_item_id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Rejected);
    let result = item.result.expect("verdict recorded");
    assert_eq!(result.reason, "Too many URLs (possible spam)");
    assert_eq!(result.categories, vec!["spam".to_string()]);
}

#[tokio::test]
async fn banned_term_blocks_hides_content_and_suspends_author() {
    let app = spawn_app();
    let response = app
        .moderation
        .submit(submit_request("scam alert"))
        .await
        .expect("submission failed");

    app.processor.process_batch(BUDGET).await.expect("cycle failed");

    let item = app.moderation.get_item(response.queue_item_id).await.expect("item");
    let result = item.result.expect("verdict recorded");
    assert_eq!(result.action, ModerationAction::Block);
    assert_eq!(result.severity, Severity::High);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.categories, vec!["harassment".to_string()]);

    let hidden = app
        .actions
        .status_of(ContentType::Comment, "comment-1")
        .expect("content status written");
    assert_eq!(hidden.status, ContentModerationStatus::Hidden);
    assert_eq!(hidden.reason, "Contains inappropriate language");
    assert!(app.actions.suspension_of("user-1").is_some());

    let logs = app.log.entries();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].queue_item_id, response.queue_item_id);
}

#[tokio::test]
async fn full_batch_is_claimed_in_priority_then_age_order() {
    let app = spawn_app();
    let plan = [
        ("low-1", Priority::Low),
        ("high-1", Priority::High),
        ("medium-1", Priority::Medium),
        ("high-2", Priority::High),
        ("low-2", Priority::Low),
        ("medium-2", Priority::Medium),
        ("high-3", Priority::High),
        ("low-3", Priority::Low),
        ("medium-3", Priority::Medium),
        ("high-4", Priority::High),
    ];
    for (content, priority) in plan {
        app.enqueue(content, priority).await;
    }

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.claimed, 10);
    assert_eq!(report.approved, 10);

    let calls = app.analyzer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![
            "high-1", "high-2", "high-3", "high-4", "medium-1", "medium-2", "medium-3", "low-1",
            "low-2", "low-3",
        ]
    );
    assert_eq!(app.queue.count(Some(QueueStatus::Pending)).await.expect("count"), 0);
}

#[tokio::test]
async fn batch_size_bounds_selection() {
    let settings = ProcessorSettings {
        batch_size: 3,
        ..ProcessorSettings::default()
    };
    let app = spawn_app_with(StubReply::Heuristic, settings);
    app.enqueue("old low", Priority::Low).await;
    app.enqueue("old medium", Priority::Medium).await;
    app.enqueue("new high", Priority::High).await;
    app.enqueue("newer medium", Priority::Medium).await;
    app.enqueue("newest high", Priority::High).await;

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.claimed, 3);
    assert_eq!(app.analyzer.calls()[0], vec!["new high", "newest high", "old medium"]);
    assert_eq!(app.queue.count(Some(QueueStatus::Pending)).await.expect("count"), 2);
}

struct RacingCycles {
    waiting: BatchProcessor,
    waiting_analyzer: Arc<StubAnalyzer>,
    rival: BatchProcessor,
    rival_analyzer: Arc<StubAnalyzer>,
}

/// Two cycles over `app`'s queue that select the same rows before either claims.
fn racing_cycles(app: &TestApp, waiting_batch: usize, rival_batch: usize) -> RacingCycles {
    let (waiting_queue, rival_queue) = InterleavedQueue::pair(app.queue.clone());
    let cycle = |queue: InterleavedQueue, batch_size: usize| {
        let analyzer = Arc::new(StubAnalyzer::new(StubReply::Heuristic));
        let clock: Arc<dyn Clock> = app.clock.clone();
        let processor = BatchProcessor::new(
            Arc::new(queue),
            Arc::new(AnalysisEngine::new(analyzer.clone())),
            app.propagator.clone(),
            clock,
            ProcessorSettings {
                batch_size,
                ..ProcessorSettings::default()
            },
        );
        (processor, analyzer)
    };
    let (waiting, waiting_analyzer) = cycle(waiting_queue, waiting_batch);
    let (rival, rival_analyzer) = cycle(rival_queue, rival_batch);
    RacingCycles {
        waiting,
        waiting_analyzer,
        rival,
        rival_analyzer,
    }
}

#[tokio::test]
async fn overlapping_cycles_never_share_an_item() {
    let app = spawn_app();
    for i in 0..10 {
        app.enqueue(&format!("message {}", i), Priority::Medium).await;
    }
    let cycles = racing_cycles(&app, 10, 4);

    let (waiting, rival) = tokio::join!(
        cycles.waiting.process_batch(BUDGET),
        cycles.rival.process_batch(BUDGET)
    );
    let (waiting, rival) = (waiting.expect("waiting cycle"), rival.expect("rival cycle"));

    // the waiting cycle selected all ten but only won what the rival left
    assert_eq!(rival.claimed, 4);
    assert_eq!(waiting.claimed, 6);

    let mut seen = HashSet::new();
    let batches = cycles
        .waiting_analyzer
        .calls()
        .into_iter()
        .chain(cycles.rival_analyzer.calls());
    for batch in batches {
        for content in batch {
            assert!(seen.insert(content.clone()), "{} analyzed twice", content);
        }
    }
    assert_eq!(seen.len(), 10);
    assert_eq!(app.queue.count(Some(QueueStatus::Approved)).await.expect("count"), 10);
}

#[tokio::test]
async fn cycle_that_wins_no_claims_does_nothing() {
    let app = spawn_app();
    for i in 0..3 {
        app.enqueue(&format!("message {}", i), Priority::Medium).await;
    }
    let cycles = racing_cycles(&app, 10, 10);

    let (waiting, rival) = tokio::join!(
        cycles.waiting.process_batch(BUDGET),
        cycles.rival.process_batch(BUDGET)
    );

    assert_eq!(waiting.expect("waiting cycle"), BatchReport::default());
    assert_eq!(rival.expect("rival cycle").approved, 3);
    assert!(cycles.waiting_analyzer.calls().is_empty());
    assert_eq!(app.queue.count(Some(QueueStatus::Approved)).await.expect("count"), 3);
}

#[tokio::test]
async fn malformed_analyzer_output_fails_open() {
    let app = spawn_app_with(
        StubReply::Raw(json!({ "oops": "not an array" })),
        ProcessorSettings::default(),
    );
    let a = app.enqueue("first", Priority::Medium).await;
    let b = app.enqueue("second", Priority::Medium).await;

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.approved, 2);

    for id in [a, b] {
        let item = app.moderation.get_item(id).await.expect("item");
        assert_eq!(item.status, QueueStatus::Approved);
        let result = item.result.expect("verdict recorded");
        assert_eq!(result, ModerationResult::ai_unavailable());
        assert_eq!(result.reason, AI_UNAVAILABLE_REASON);
    }
    assert!(app.log.entries().is_empty());
}

#[tokio::test]
async fn transient_failures_requeue_then_dead_letter() {
    let app = spawn_app_with(
        StubReply::Fail(AnalyzerError::Transport("connection reset".into())),
        ProcessorSettings::default(),
    );
    let id = app.enqueue("hello there", Priority::Medium).await;

    for attempt in 1..3 {
        let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
        assert_eq!(report.requeued, 1);
        let item = app.moderation.get_item(id).await.expect("item");
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.retry_count, attempt);
    }

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.dead_lettered, 1);

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Rejected);
    let result = item.result.expect("verdict recorded");
    assert_eq!(result, ModerationResult::manual_review(3));
    assert_eq!(result.action, ModerationAction::Escalate);
    assert!(app.actions.suspension_of("user-1").is_none());
}

#[tokio::test]
async fn rejected_credentials_release_batch_and_surface() {
    let app = spawn_app_with(
        StubReply::Fail(AnalyzerError::Unauthorized("invalid api key".into())),
        ProcessorSettings::default(),
    );
    let id = app.enqueue("hello there", Priority::Medium).await;

    let outcome = app.processor.process_batch(BUDGET).await;
    assert!(matches!(outcome, Err(ProcessError::AnalyzerUnauthorized(_))));

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Pending);
    assert_eq!(item.retry_count, 1);
}

#[tokio::test]
async fn precheck_verdicts_land_even_when_analysis_fails() {
    let app = spawn_app_with(
        StubReply::Fail(AnalyzerError::Timeout(StdDuration::from_secs(1))),
        ProcessorSettings::default(),
    );
    let blocked = app.enqueue("total scam", Priority::High).await;
    let clean = app.enqueue("nice photo", Priority::Medium).await;

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.rejected, 1);
    assert_eq!(report.requeued, 1);

    let blocked = app.moderation.get_item(blocked).await.expect("item");
    assert_eq!(blocked.status, QueueStatus::Rejected);
    let clean = app.moderation.get_item(clean).await.expect("item");
    assert_eq!(clean.status, QueueStatus::Pending);
}

#[tokio::test]
async fn replaying_a_verdict_changes_nothing() {
    let app = spawn_app();
    let id = app.enqueue("borderline", Priority::Medium).await;
    app.queue
        .claim(&[id], app.clock.now(), Uuid::now_v7())
        .await
        .expect("claim");
    let item = app.moderation.get_item(id).await.expect("item");
    let verdict = ModerationResult {
        allowed: false,
        severity: Severity::Medium,
        categories: vec!["spam".to_string()],
        action: ModerationAction::Block,
        reason: "Repeated promotional content".to_string(),
        confidence: 0.8,
    };

    let decided_at = app.clock.now();
    let first = app
        .propagator
        .apply_verdict(&item, &verdict, decided_at)
        .await
        .expect("first apply");
    let second = app.propagator.apply_verdict(&item, &verdict, decided_at).await;

    assert!(first.logged);
    assert!(matches!(second, Err(DomainError::Conflict(_))));
    assert_eq!(app.log.entries().len(), 1);
    assert_eq!(
        app.actions
            .status_of(item.content_type, &item.content_id)
            .map(|s| s.status),
        Some(ContentModerationStatus::Hidden)
    );
    // medium severity stays below the suspension threshold
    assert!(app.actions.suspension_of(&item.user_id).is_none());

    let stored = app.moderation.get_item(id).await.expect("item");
    assert_eq!(stored.status, QueueStatus::Rejected);
    assert_eq!(stored.processed_at, Some(decided_at));
}

#[tokio::test]
async fn failed_side_effects_do_not_undo_the_verdict() {
    let app = spawn_app();
    app.actions.fail_content_writes(true);
    app.actions.fail_suspensions(true);
    let id = app.enqueue("what a scam", Priority::High).await;

    let report = app.processor.process_batch(BUDGET).await.expect("cycle failed");
    assert_eq!(report.rejected, 1);
    assert_eq!(report.propagation_failures, 2);

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Rejected);
    assert_eq!(app.log.entries().len(), 1);
}

#[tokio::test]
async fn stale_claims_return_to_the_queue() {
    let app = spawn_app();
    let id = app.enqueue("stuck item", Priority::Medium).await;
    let claimed = app
        .queue
        .claim(&[id], app.clock.now(), Uuid::now_v7())
        .await
        .expect("claim");
    assert!(claimed.contains(&id));

    app.clock.advance(Duration::minutes(20));
    let cutoff = app.clock.now() - Duration::minutes(15);
    let report = app.processor.recover_stale(cutoff).await.expect("recover");
    assert_eq!(report.requeued, 1);

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Pending);
    assert_eq!(item.retry_count, 1);
}

#[tokio::test]
async fn item_that_keeps_stalling_is_dead_lettered() {
    let app = spawn_app_with(StubReply::Heuristic, ProcessorSettings::default());
    let id = app.enqueue("crashes every worker", Priority::Medium).await;

    for attempt in 1..=3 {
        app.queue
            .claim(&[id], app.clock.now(), Uuid::now_v7())
            .await
            .expect("claim");
        app.clock.advance(Duration::minutes(20));
        let cutoff = app.clock.now() - Duration::minutes(15);
        let report = app.processor.recover_stale(cutoff).await.expect("recover");
        if attempt < 3 {
            assert_eq!(report.requeued, 1);
        } else {
            assert_eq!(report.dead_lettered, 1);
        }
    }

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Rejected);
    assert_eq!(item.result, Some(ModerationResult::manual_review(3)));
    assert_eq!(app.log.entries().len(), 1);
    assert!(app.analyzer.calls().is_empty());
}

#[tokio::test]
async fn stalled_cycle_cannot_overwrite_the_recovered_verdict() {
    let app = spawn_app();
    let id = app.enqueue("see you at the meetup", Priority::Medium).await;
    app.queue
        .claim(&[id], app.clock.now(), Uuid::now_v7())
        .await
        .expect("claim");
    let stalled = app.moderation.get_item(id).await.expect("item");

    app.clock.advance(Duration::minutes(20));
    let clock: Arc<dyn Clock> = app.clock.clone();
    let scheduler = ModerationScheduler::new(app.processor.clone(), clock, 60, BUDGET, 15);
    let report = scheduler.run_once().await.expect("scheduler pass");
    assert_eq!(report.approved, 1);

    // the stalled cycle wakes up with a late, harsher verdict
    let late = ModerationResult {
        allowed: false,
        severity: Severity::Critical,
        categories: vec!["scam".to_string()],
        action: ModerationAction::Ban,
        reason: "late verdict".to_string(),
        confidence: 0.9,
    };
    let outcome = app
        .propagator
        .apply_verdict(&stalled, &late, app.clock.now())
        .await;
    assert!(matches!(outcome, Err(DomainError::Conflict(_))));

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Approved);
    assert!(app.log.entries().is_empty());
    assert!(
        app.actions
            .status_of(item.content_type, &item.content_id)
            .is_none()
    );
    assert!(app.actions.suspension_of(&item.user_id).is_none());
}

#[tokio::test]
async fn empty_content_id_is_refused() {
    let app = spawn_app();
    let mut new = submission("hello", Priority::Low);
    new.content_id = "   ".to_string();
    assert!(app.moderation.enqueue(new).await.is_err());
}

#[tokio::test]
async fn scheduler_pass_recovers_stale_claims_before_processing() {
    let app = spawn_app();
    let id = app.enqueue("left behind by a crashed cycle", Priority::Medium).await;
    app.queue
        .claim(&[id], app.clock.now(), Uuid::now_v7())
        .await
        .expect("claim");
    app.clock.advance(Duration::minutes(30));

    let clock: Arc<dyn Clock> = app.clock.clone();
    let scheduler = ModerationScheduler::new(app.processor.clone(), clock, 60, BUDGET, 15);
    let report = scheduler.run_once().await.expect("scheduler pass");
    assert_eq!(report.claimed, 1);
    assert_eq!(report.approved, 1);

    let item = app.moderation.get_item(id).await.expect("item");
    assert_eq!(item.status, QueueStatus::Approved);
    assert_eq!(item.retry_count, 1);
}
