//! Javelin - Endpoint Uptime Monitor

use javelin::activity::ActivityLog;
use javelin::config::ServerConfig;
use javelin::notify::Dispatcher;
use javelin::probe::{HttpRelay, Relay, RelayChecker};
use javelin::scheduler::Scheduler;
use javelin::store::{document, TargetStore};
use javelin::web::{AppState, Server};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("javelin=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting Javelin on port {}...", cfg.http_port);
    tracing::info!("Using state document at {}", cfg.state_path.display());

    // Restore state; a broken document never blocks startup
    let snapshot = match document::load(&cfg.state_path) {
        Ok(Some(snapshot)) => {
            tracing::info!("Loaded {} targets", snapshot.targets.len());
            snapshot
        }
        Ok(None) => {
            tracing::info!("No saved state, starting empty");
            Default::default()
        }
        Err(e) => {
            tracing::error!("Failed to load {}: {}; starting empty", cfg.state_path.display(), e);
            Default::default()
        }
    };

    let activity = Arc::new(ActivityLog::new());
    let store = Arc::new(TargetStore::from_snapshot(snapshot, activity.clone()));
    let relay: Arc<dyn Relay> = Arc::new(HttpRelay::new()?);
    let checker = Arc::new(RelayChecker::new(relay.clone()));
    let dispatcher = Arc::new(Dispatcher::from_config(&store.config(), activity));

    // Start scheduler
    let scheduler = Arc::new(Scheduler::new(store.clone(), checker, dispatcher.clone()));
    scheduler.start();

    // Persist in the background
    let writer = tokio::spawn(document::run_debounced_writer(
        store.clone(),
        cfg.state_path.clone(),
        cfg.persist_debounce,
    ));

    // Start web server
    let server = Server::new(AppState {
        config: cfg.clone(),
        store: store.clone(),
        scheduler: scheduler.clone(),
        dispatcher,
        relay,
    });
    server.start().await?;

    scheduler.stop();
    writer.abort();
    if let Err(e) = document::flush(&store, &cfg.state_path).await {
        tracing::error!("Failed to save state on shutdown: {}", e);
    }

    Ok(())
}
