mod health;
mod metrics;
mod recipes;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use std::time::Instant;

use crate::metrics::REQUEST_LATENCY;
use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use recipes::{
    create_recipe_handler, delete_recipe_handler, get_recipe_handler, list_recipes_handler,
    update_recipe_handler,
};

async fn track_latency(req: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let response = next.run(req).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}

// creating the router with routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/recipes",
            get(list_recipes_handler).post(create_recipe_handler),
        )
        .route(
            "/api/recipes/{slug}",
            get(get_recipe_handler)
                .put(update_recipe_handler)
                .delete(delete_recipe_handler),
        )
        .layer(middleware::from_fn(track_latency))
        .with_state(state)
}
