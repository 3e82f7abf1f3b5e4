use clap::Parser;
use std::sync::Arc;

use recipe_catalog::handlers::router;
use recipe_catalog::{AppState, Args, MemoryStore, RateLimiter, Sweeper, logging};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments
    let args = Args::parse();
    logging::init(&args.log_level)?;

    let policies = args.policies();
    let limiter = Arc::new(RateLimiter::new());
    let state = AppState::new(Arc::new(MemoryStore::new()), limiter.clone(), policies);

    // expired entries get dropped in the background for the life of the server
    let sweeper = Sweeper::spawn(limiter, args.sweep_every());

    let app = router(state.clone());
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(port = args.port, "recipe catalog listening");
    tracing::info!(
        window_secs = args.rate_window,
        reads = args.read_limit,
        creates = args.create_limit,
        updates = args.update_limit,
        deletes = args.delete_limit,
        "rate limits per client"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    tracing::info!(recipes = state.store.len(), "server stopped");
    Ok(())
}
