use std::sync::Arc;

use crate::config::RatePolicies;
use crate::rate_limit::RateLimiter;
use crate::store::MemoryStore;

// app's shared state, built once in main and cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub limiter: Arc<RateLimiter>,
    pub policies: Arc<RatePolicies>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>, limiter: Arc<RateLimiter>, policies: RatePolicies) -> Self {
        Self {
            store,
            limiter,
            policies: Arc::new(policies),
        }
    }
}
