use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use copydesk_auth::{AuthConfig, TokenAuthority};
use copydesk_client::{RequestOptions, ResilientClient};
use copydesk_events::{EventEmitter, EventsConfig};
use copydesk_generation::{GenerationConfig, GenerationGateway};
use copydesk_insights::{InsightsConfig, InsightsGateway};
use copydesk_pipeline::TaskPipeline;
use copydesk_queue::{
    JobDispatcher, JobSource, NoopDispatcher, QueueConfig, RedisJobQueue, TaskWorker, WorkerConfig,
};
use copydesk_server::api::{self, AppState};
use copydesk_server::config::CopydeskConfig;
use copydesk_store::{MemoryTaskStore, PostgresConfig, PostgresTaskStore, TaskStore};

/// Copydesk writer HTTP server.
#[derive(Parser, Debug)]
#[command(name = "copydesk-server", about = "Content-generation task service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "copydesk.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = CopydeskConfig::load(Path::new(&cli.config))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Auth is the trust root; everything outbound signs with it.
    let mut auth_config = AuthConfig::new(config.auth.jwt_secret.clone())
        .with_root_issuer(config.auth.root_issuer.clone())
        .with_service_name(config.auth.service_name.clone());
    if let Some(secret) = config.auth.dev_admin_secret.clone() {
        auth_config = auth_config.with_dev_admin_secret(secret);
    }
    let authority = Arc::new(TokenAuthority::new(auth_config));

    let client = ResilientClient::new(RequestOptions::default())?;

    let store: Arc<dyn TaskStore> = match config.store.backend.as_str() {
        "postgres" => {
            let url = config
                .store
                .url
                .clone()
                .ok_or("store.backend = \"postgres\" requires store.url or DATABASE_URL")?;
            let pg_config = PostgresConfig {
                url,
                pool_size: config.store.pool_size,
                ..PostgresConfig::default()
            };
            let store = PostgresTaskStore::new(pg_config).await?;
            info!("task store: postgres");
            Arc::new(store)
        }
        _ => {
            info!("task store: memory");
            Arc::new(MemoryTaskStore::new())
        }
    };

    // Queue presence is a capability decided here, once.
    let (dispatcher, consumer): (Arc<dyn JobDispatcher>, Option<Arc<RedisJobQueue>>) =
        match config.queue.redis_url.clone() {
            Some(redis_url) => {
                let mut queue_config = QueueConfig::new(redis_url);
                if let Some(name) = config.queue.queue_name.clone() {
                    queue_config = queue_config.with_queue_name(name);
                }
                let queue = Arc::new(RedisJobQueue::new(queue_config)?);
                (Arc::clone(&queue) as Arc<dyn JobDispatcher>, Some(queue))
            }
            None => {
                info!("queue not configured (no redis url), running brokerless");
                (Arc::new(NoopDispatcher), None)
            }
        };

    let generation = Arc::new(GenerationGateway::new(
        client.clone(),
        Arc::clone(&authority),
        GenerationConfig::new(
            config.upstream.generation_url.clone(),
            config.upstream.profile_url.clone(),
        )
        .with_model(
            config.generation.provider.clone(),
            config.generation.model.clone(),
        ),
    ));
    let insights = Arc::new(InsightsGateway::new(
        client.clone(),
        Arc::clone(&authority),
        InsightsConfig {
            base_url: config.upstream.insights_url.clone(),
        },
    ));
    let events = Arc::new(EventEmitter::new(
        client.clone(),
        Arc::clone(&authority),
        EventsConfig {
            base_url: config.upstream.events_url.clone(),
        },
    ));

    let pipeline = Arc::new(TaskPipeline::new(
        Arc::clone(&store),
        dispatcher,
        generation,
        Arc::clone(&insights),
        events,
    ));

    let state = AppState {
        pipeline: Arc::clone(&pipeline),
        authority: Arc::clone(&authority),
        insights,
        store,
        service_name: config.auth.service_name.clone(),
    };
    let app = api::router(state);

    // Start the worker only when a broker backs the queue.
    let shutdown_token = CancellationToken::new();
    let worker_handle = consumer.map(|queue| {
        let self_url = config
            .queue
            .self_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
        let worker = Arc::new(TaskWorker::new(
            queue as Arc<dyn JobSource>,
            client.clone(),
            Arc::clone(&authority),
            WorkerConfig::new(self_url),
        ));
        tokio::spawn(worker.run(shutdown_token.clone()))
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, service = %config.auth.service_name, "service up");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown signal received");
    shutdown_token.cancel();

    let cleanup = async {
        if let Some(handle) = worker_handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        pipeline.shutdown().await;
    };
    let budget = Duration::from_secs(config.server.shutdown_timeout_seconds);
    if tokio::time::timeout(budget, cleanup).await.is_err() {
        warn!(timeout_s = budget.as_secs(), "forced shutdown after timeout");
    } else {
        info!("cleanup complete");
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
