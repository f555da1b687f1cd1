use axum::extract::DefaultBodyLimit;
use http::{HeaderValue, Method, header};
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
        moderation::repository::{
            AccountActions, ContentStatusWriter, ModerationLogSink, QueueStore,
        },
        reputation::repository::{ActivitySource, ReputationRepository},
        shared::clock::{Clock, SystemClock},
    },
    infrastructure::{
        database::pool::create_pool,
        ml::{heuristic_analyzer::HeuristicAnalyzer, llm_analyzer::LlmAnalyzer, traits::ContentAnalyzer},
        repositories::{
            in_memory::{
                InMemoryActivitySource, InMemoryContentActions, InMemoryModerationLog,
                InMemoryQueueStore, InMemoryReputationRepository,
            },
            sqlx_content_actions_repository::SqlxContentActionsRepository,
            sqlx_moderation_log_repository::SqlxModerationLogRepository,
            sqlx_queue_repository::SqlxQueueStore,
            sqlx_reputation_repository::{SqlxActivitySource, SqlxReputationRepository},
        },
        security::content_precheck::PrecheckCategories,
    },
    presentation::http::{routes::create_router, state::AppState},
    workers::{moderation_scheduler::ModerationScheduler, reputation_sweeper::ReputationSweeper},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

struct Stores {
    queue: Arc<dyn QueueStore>,
    log: Arc<dyn ModerationLogSink>,
    content: Arc<dyn ContentStatusWriter>,
    accounts: Arc<dyn AccountActions>,
    reputation: Arc<dyn ReputationRepository>,
    activity: Arc<dyn ActivitySource>,
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;
            let db = create_pool(database_url, config.database_max_connections).await?;
            let mut migrator = sqlx::migrate!("./migrations");
            migrator.set_ignore_missing(config.ignore_missing_migrations);
            migrator.run(&db).await?;

            let actions = Arc::new(SqlxContentActionsRepository::new(db.clone()));
            Ok(Stores {
                queue: Arc::new(SqlxQueueStore::new(db.clone())),
                log: Arc::new(SqlxModerationLogRepository::new(db.clone())),
                content: actions.clone(),
                accounts: actions,
                reputation: Arc::new(SqlxReputationRepository::new(db.clone())),
                activity: Arc::new(SqlxActivitySource::new(db)),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory stores; state is lost on restart");
            let actions = Arc::new(InMemoryContentActions::new());
            Ok(Stores {
                queue: Arc::new(InMemoryQueueStore::new()),
                log: Arc::new(InMemoryModerationLog::new()),
                content: actions.clone(),
                accounts: actions,
                reputation: Arc::new(InMemoryReputationRepository::new()),
                activity: Arc::new(InMemoryActivitySource::new()),
            })
        }
    }
}

fn build_analyzer(config: &Config) -> anyhow::Result<Arc<dyn ContentAnalyzer>> {
    match &config.analyzer_api_key {
        Some(key) => {
            tracing::info!(model = %config.analyzer_model, "using remote content analyzer");
            Ok(Arc::new(LlmAnalyzer::new(
                config.analyzer_api_url.clone(),
                key.clone(),
                config.analyzer_model.clone(),
                Duration::from_secs(config.analyzer_timeout_seconds),
            )?))
        }
        None => {
            tracing::info!("ANALYZER_API_KEY not set, using heuristic analyzer");
            Ok(Arc::new(HeuristicAnalyzer::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Uses RUST_LOG if set, otherwise sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new("info,moderation=debug,tower_http=debug")
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    let stores = build_stores(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (tx, _) = broadcast::channel(100);
    let broadcaster = Arc::new(tx);

    let engine = Arc::new(AnalysisEngine::new(build_analyzer(&config)?));
    let propagator = Arc::new(ConsequencePropagator::new(
        stores.queue.clone(),
        stores.log.clone(),
        stores.content.clone(),
        stores.accounts.clone(),
        config.suspension_severity,
    ));
    let settings = ProcessorSettings {
        batch_size: config.moderation_batch_size.max(1),
        max_retries: config.moderation_max_retries.max(1),
        precheck_categories: PrecheckCategories {
            banned_term: config.precheck_keyword_category.clone(),
            ..PrecheckCategories::default()
        },
    };
    let processor = Arc::new(
        BatchProcessor::new(
            stores.queue.clone(),
            engine,
            propagator,
            clock.clone(),
            settings,
        )
        .with_events(broadcaster.clone()),
    );
    let scorer = Arc::new(ReputationScorer::new(
        stores.reputation.clone(),
        stores.activity.clone(),
        clock.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        queue: stores.queue.clone(),
        moderation: Arc::new(ModerationUseCase::new(
            stores.queue.clone(),
            stores.log.clone(),
            clock.clone(),
        )),
        processor: processor.clone(),
        reputation: scorer.clone(),
        ws_broadcaster: broadcaster,
    };

    if config.enable_moderation_scheduler {
        let scheduler = ModerationScheduler::new(
            processor,
            clock.clone(),
            config.moderation_interval_seconds,
            Duration::from_secs(config.moderation_scheduled_budget_seconds),
            config.moderation_stale_claim_minutes,
        );
        tokio::spawn(async move { scheduler.start().await });
    }

    if config.enable_reputation_sweep {
        let sweeper = ReputationSweeper::new(scorer, config.reputation_sweep_interval_seconds);
        tokio::spawn(async move { sweeper.start().await });
    }

    let cors = if cfg!(debug_assertions) {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        // Admin dashboards call through their own backend; no browser origins by default.
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    };

    let app = create_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("moderation service listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
