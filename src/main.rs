use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;

use ticketdesk_api::api::{self, AppState};
use ticketdesk_api::assignment::{AgentScorer, AssignmentExecutor, AssignmentPolicy, Notifier, TicketWorkflow};
use ticketdesk_api::config::Config;
use ticketdesk_api::domain::repositories::{AgentRepository, TicketRepository};
use ticketdesk_api::events::{EventPublisher, MessageQueue, ReassignmentWorker};
use ticketdesk_api::infrastructure::notifications::LogNotifier;
use ticketdesk_api::infrastructure::queue::PostgresQueue;
use ticketdesk_api::infrastructure::repositories::{PostgresAgentRepository, PostgresTicketRepository};
use ticketdesk_api::infrastructure::scoring::HttpAgentScorer;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Service failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database connected and migrated");

    let tickets: Arc<dyn TicketRepository> = Arc::new(PostgresTicketRepository::new(pool.clone()));
    let agents: Arc<dyn AgentRepository> = Arc::new(PostgresAgentRepository::new(pool.clone()));
    let queue: Arc<dyn MessageQueue> = Arc::new(PostgresQueue::new(pool));

    let policy = match &config.scoring {
        Some(scoring) => {
            let scorer: Arc<dyn AgentScorer> = Arc::new(HttpAgentScorer::new(
                scoring.url.clone(),
                scoring.api_key.clone(),
                scoring.timeout,
            )?);
            tracing::info!(endpoint = %scoring.url, "Scoring collaborator enabled");
            AssignmentPolicy::new(Some(scorer), scoring.timeout)
        }
        None => {
            tracing::info!("SCORER_URL not set, assigning by workload only");
            AssignmentPolicy::workload_only()
        }
    };

    // No push endpoint is served, so assignments are only announced in the log
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let executor = AssignmentExecutor::new(tickets.clone(), agents.clone(), policy, notifier);
    let publisher = EventPublisher::new(queue.clone(), config.publish_created_events);
    let workflow = TicketWorkflow::new(tickets, agents, executor.clone(), publisher);

    // Reassignment worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = if config.run_worker {
        let worker = ReassignmentWorker::new(queue, executor, config.worker.clone());
        Some(tokio::spawn(worker.run(shutdown_rx)))
    } else {
        tracing::info!("RUN_WORKER disabled, queue events will not be consumed here");
        None
    };

    let app = api::router(AppState::new(workflow, config.jwt_secret.as_str()));

    // Start server
    tracing::info!("Server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        worker.await?;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
