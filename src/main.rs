//! Campus Judge - Application Entry Point
//!
//! Starts the HTTP intake, the grading workers and the recovery sweeper.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use campus_judge::{
    config::{CONFIG, QueueKind},
    constants::{API_BASE_PATH, MAX_REQUEST_BODY_SIZE, languages},
    db::{self, MemoryStore, PgStore, SharedStore},
    execution::build_backend,
    handlers,
    models::{Problem, TestCase},
    services::{GradingService, LeaderboardService, SubmissionService},
    state::AppState,
    worker::{JobQueue, MemoryJobQueue, RecoverySweeper, RedisJobQueue, WorkerPool},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Campus Judge server...");

    let store: SharedStore = match &CONFIG.database.url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(url, CONFIG.database.max_connections).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let store = MemoryStore::new();
            seed_demo_problem(&store).await;
            Arc::new(store)
        }
    };

    let queue: Arc<dyn JobQueue> = match (CONFIG.grading.queue, &CONFIG.redis.url) {
        (QueueKind::Redis, Some(url)) => {
            tracing::info!("Connecting to Redis...");
            Arc::new(RedisJobQueue::connect(url).await?)
        }
        _ => {
            tracing::warn!("Using the in-memory job queue");
            Arc::new(MemoryJobQueue::new())
        }
    };

    let backend = build_backend(&CONFIG.judge)?;
    let backend_name = backend.name();

    let grader = GradingService::new(Arc::clone(&store), backend);
    let pool = WorkerPool::spawn(CONFIG.grading.workers, Arc::clone(&queue), grader);
    let sweeper = RecoverySweeper::new(
        Arc::clone(&store),
        Arc::clone(&queue),
        CONFIG.grading.clone(),
    )
    .spawn(pool.subscribe());

    let state = AppState::new(
        SubmissionService::new(Arc::clone(&store), queue, CONFIG.grading.clone()),
        LeaderboardService::new(store),
        backend_name,
        CONFIG.server.admin_user_ids.clone(),
    );

    // Build the router
    let app = Router::new()
        .nest(API_BASE_PATH, handlers::routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start the server
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining grading workers...");
    pool.shutdown().await;
    if let Err(e) = sweeper.await {
        tracing::error!("Recovery sweeper ended abnormally: {}", e);
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    if CONFIG.server.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Give a database-less instance something to grade against
async fn seed_demo_problem(store: &MemoryStore) {
    let event_id = Uuid::new_v4();
    let problem = Problem {
        id: Uuid::new_v4(),
        event_id,
        title: "Sum of Two Numbers".to_string(),
        time_limit_ms: 2000,
        memory_limit_kb: 262_144,
        allowed_languages: languages::DEFAULT_ALLOWED
            .iter()
            .map(|l| l.to_string())
            .collect(),
        created_at: Utc::now(),
    };

    let cases = [("1 2\n", "3\n", 1), ("-5 5\n", "0\n", 1), ("1000000 2000000\n", "3000000\n", 2)]
        .into_iter()
        .enumerate()
        .map(|(i, (input, expected, weight))| TestCase {
            id: Uuid::new_v4(),
            problem_id: problem.id,
            input: input.to_string(),
            expected_output: Some(expected.to_string()),
            weight,
            is_sample: i == 0,
            order_index: i as i32,
            created_at: Utc::now(),
        })
        .collect();

    tracing::info!(
        event_id = %event_id,
        problem_id = %problem.id,
        "Seeded demo problem"
    );
    store.insert_problem(problem, cases).await;
}
