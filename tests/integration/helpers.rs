use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use moderation::{
    application::{
        moderation::{
            analysis::AnalysisEngine,
            processor::{BatchProcessor, ProcessorSettings},
            propagator::ConsequencePropagator,
            use_case::ModerationUseCase,
        },
        reputation::scorer::ReputationScorer,
    },
    config::{Config, StorageBackend},
    domain::{
        moderation::{
            entity::{
                ContentType, ModerationQueueItem, ModerationResult, NewSubmission, Priority,
                QueueStatus, Severity,
            },
            repository::QueueStore,
        },
        shared::{
            clock::{Clock, ManualClock},
            errors::DomainError,
            pagination::PaginationRequest,
        },
    },
    infrastructure::{
        ml::{
            heuristic_analyzer::HeuristicAnalyzer,
            traits::{AnalyzerError, ContentAnalyzer},
        },
        repositories::in_memory::{
            InMemoryActivitySource, InMemoryContentActions, InMemoryModerationLog,
            InMemoryQueueStore, InMemoryReputationRepository,
        },
    },
    presentation::http::{
        middleware::auth::{Claims, Role, issue_token},
        routes::create_router,
        state::AppState,
    },
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{Barrier, Notify, broadcast};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";

/// What a `StubAnalyzer` answers with.
#[derive(Clone)]
pub enum StubReply {
    /// Delegate to the lexicon analyzer
    Heuristic,
    Raw(Value),
    Fail(AnalyzerError),
}

/// Analyzer double that records every batch it is handed.
pub struct StubAnalyzer {
    reply: StubReply,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubAnalyzer {
    pub fn new(reply: StubReply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ContentAnalyzer for StubAnalyzer {
    async fn analyze_raw(&self, contents: &[String]) -> Result<Value, AnalyzerError> {
        self.calls.lock().expect("calls lock").push(contents.to_vec());
        tokio::task::yield_now().await;
        match &self.reply {
            StubReply::Heuristic => HeuristicAnalyzer::new().analyze_raw(contents).await,
            StubReply::Raw(value) => Ok(value.clone()),
            StubReply::Fail(error) => Err(error.clone()),
        }
    }
}

/// Queue view for one of two racing cycles. Both cycles finish selecting
/// before either claims, and the waiting side claims only after its rival.
pub struct InterleavedQueue {
    inner: Arc<InMemoryQueueStore>,
    selected: Arc<Barrier>,
    rival_claimed: Arc<Notify>,
    waits_for_rival: bool,
}

impl InterleavedQueue {
    /// Returns `(waiting, rival)` views over the same store.
    pub fn pair(inner: Arc<InMemoryQueueStore>) -> (Self, Self) {
        let selected = Arc::new(Barrier::new(2));
        let rival_claimed = Arc::new(Notify::new());
        let view = |waits_for_rival| Self {
            inner: inner.clone(),
            selected: selected.clone(),
            rival_claimed: rival_claimed.clone(),
            waits_for_rival,
        };
        (view(true), view(false))
    }
}

#[async_trait]
impl QueueStore for InterleavedQueue {
    async fn enqueue(&self, item: &ModerationQueueItem) -> Result<(), DomainError> {
        self.inner.enqueue(item).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ModerationQueueItem>, DomainError> {
        self.inner.get(id).await
    }

    async fn list(
        &self,
        status: Option<QueueStatus>,
        page: &PaginationRequest,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        self.inner.list(status, page).await
    }

    async fn count(&self, status: Option<QueueStatus>) -> Result<i64, DomainError> {
        self.inner.count(status).await
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let selected = self.inner.fetch_pending(limit).await?;
        self.selected.wait().await;
        if self.waits_for_rival {
            self.rival_claimed.notified().await;
        }
        Ok(selected)
    }

    async fn claim(
        &self,
        ids: &[Uuid],
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<HashSet<Uuid>, DomainError> {
        let won = self.inner.claim(ids, claimed_at, token).await?;
        if !self.waits_for_rival {
            self.rival_claimed.notify_one();
        }
        Ok(won)
    }

    async fn complete(
        &self,
        id: Uuid,
        token: Uuid,
        status: QueueStatus,
        result: &ModerationResult,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.inner
            .complete(id, token, status, result, processed_at)
            .await
    }

    async fn release(
        &self,
        ids: &[Uuid],
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        self.inner.release(ids, token).await
    }

    async fn reclaim_stale(
        &self,
        claimed_before: DateTime<Utc>,
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        self.inner
            .reclaim_stale(claimed_before, claimed_at, token)
            .await
    }
}

pub struct TestApp {
    pub app: Router,
    pub queue: Arc<InMemoryQueueStore>,
    pub log: Arc<InMemoryModerationLog>,
    pub actions: Arc<InMemoryContentActions>,
    pub activity: Arc<InMemoryActivitySource>,
    pub clock: Arc<ManualClock>,
    pub analyzer: Arc<StubAnalyzer>,
    pub moderation: Arc<ModerationUseCase>,
    pub processor: Arc<BatchProcessor>,
    pub propagator: Arc<ConsequencePropagator>,
    pub scorer: Arc<ReputationScorer>,
    pub admin_token: String,
    pub service_token: String,
}

pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        enable_moderation_scheduler: false,
        enable_reputation_sweep: false,
        ..Config::default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(StubReply::Heuristic, ProcessorSettings::default())
}

pub fn spawn_app_with(reply: StubReply, settings: ProcessorSettings) -> TestApp {
    let config = test_config();
    let start = Utc
        .with_ymd_and_hms(2026, 10, 1, 12, 0, 0)
        .single()
        .expect("valid start time");
    let clock = Arc::new(ManualClock::new(start));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let queue = Arc::new(InMemoryQueueStore::new());
    let log = Arc::new(InMemoryModerationLog::new());
    let actions = Arc::new(InMemoryContentActions::new());
    let reputation = Arc::new(InMemoryReputationRepository::new());
    let activity = Arc::new(InMemoryActivitySource::new());
    let analyzer = Arc::new(StubAnalyzer::new(reply));

    let propagator = Arc::new(ConsequencePropagator::new(
        queue.clone(),
        log.clone(),
        actions.clone(),
        actions.clone(),
        Severity::High,
    ));
    let (tx, _) = broadcast::channel(100);
    let broadcaster = Arc::new(tx);
    let processor = Arc::new(
        BatchProcessor::new(
            queue.clone(),
            Arc::new(AnalysisEngine::new(analyzer.clone())),
            propagator.clone(),
            dyn_clock.clone(),
            settings,
        )
        .with_events(broadcaster.clone()),
    );
    let moderation = Arc::new(ModerationUseCase::new(
        queue.clone(),
        log.clone(),
        dyn_clock.clone(),
    ));
    let scorer = Arc::new(ReputationScorer::new(
        reputation,
        activity.clone(),
        dyn_clock,
    ));

    let state = AppState {
        config,
        queue: queue.clone(),
        moderation: moderation.clone(),
        processor: processor.clone(),
        reputation: scorer.clone(),
        ws_broadcaster: broadcaster,
    };

    TestApp {
        app: create_router(state),
        queue,
        log,
        actions,
        activity,
        clock,
        analyzer,
        moderation,
        processor,
        propagator,
        scorer,
        admin_token: token_for("admin-1", Role::Admin),
        service_token: token_for("community-service", Role::Service),
    }
}

pub fn token_for(sub: &str, role: Role) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    issue_token(&claims, JWT_SECRET).expect("failed to sign test token")
}

pub fn submission(content: &str, priority: Priority) -> NewSubmission {
    NewSubmission {
        user_id: "user-1".to_string(),
        user_name: "Test User".to_string(),
        content: content.to_string(),
        content_type: ContentType::Post,
        content_id: format!("post-{}", Uuid::now_v7()),
        priority,
    }
}

impl TestApp {
    /// Enqueues one item and moves the clock forward a second so enqueue
    /// times are strictly increasing.
    pub async fn enqueue(&self, content: &str, priority: Priority) -> Uuid {
        let id = self
            .moderation
            .enqueue(submission(content, priority))
            .await
            .expect("enqueue failed");
        self.clock.advance(Duration::seconds(1));
        id
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json<T: DeserializeOwned>(res: axum::response::Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

pub async fn read_text(res: axum::response::Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("invalid utf8")
}

pub async fn expect_status(
    res: axum::response::Response,
    expected: StatusCode,
) -> axum::response::Response {
    let actual = res.status();

    if actual == expected {
        return res;
    }

    let body = read_text(res).await;
    panic!(
        "HTTP status mismatch. Expected {}, got {}. Response body: {}",
        expected, actual, body
    );
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}
