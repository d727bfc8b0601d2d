use bookbot_service::config::{LogFormat, ServiceConfig};
use bookbot_service::history::{HistoryStore, InMemoryHistoryStore, PostgresHistoryStore};
use bookbot_service::llm::{ModelInvoker, OpenRouterModel, SamplingParams};
use bookbot_service::service::{AppState, build_router};
use bookbot_service::workflow::Orchestrator;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing; JSON unless LOG_FORMAT=pretty
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "bookbot_service=debug,bookbot_flow=debug,tower_http=debug".into()
    });

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_format);

    let model = OpenRouterModel::new(
        &config.openrouter_api_key,
        config.model.clone(),
        SamplingParams::default(),
    );
    let mut invoker = ModelInvoker::new(Arc::new(model));
    if let Some(timeout) = config.model_timeout {
        info!(?timeout, "Model call timeout enabled");
        invoker = invoker.with_timeout(timeout);
    }
    if let Some(permits) = config.model_max_concurrency {
        info!(permits, "Model concurrency limit enabled");
        invoker = invoker.with_concurrency_limit(permits);
    }

    // Use PostgreSQL when DATABASE_URL is set, otherwise in-memory
    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(database_url) => {
            info!("Using PostgreSQL history store");
            match PostgresHistoryStore::connect(database_url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!(
                        "Failed to connect to PostgreSQL: {}. Falling back to in-memory history.",
                        e
                    );
                    Arc::new(InMemoryHistoryStore::new())
                }
            }
        }
        None => {
            info!("Using in-memory history store (set DATABASE_URL to use PostgreSQL)");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let state = AppState {
        orchestrator: Orchestrator::new(invoker),
        history,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(model = %config.model, "Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
