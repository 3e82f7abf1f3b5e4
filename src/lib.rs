//! Recipe catalog core: per-client admission control, unique slug
//! resolution and request body normalization, plus the axum surface that
//! wires them together.

pub mod body;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod slug;
pub mod state;
pub mod store;

pub use body::{RawField, normalize};
pub use client::{ANONYMOUS_CLIENT, client_key};
pub use config::{Args, RatePolicies};
pub use error::{CatalogError, FieldError};
pub use rate_limit::{
    Clock, RateLimitDecision, RateLimitEntry, RateLimiter, RatePolicy, Sweeper, SystemClock,
};
pub use slug::{SlugLookup, canonicalize, resolve_unique};
pub use state::AppState;
pub use store::{MemoryStore, RecipeRepository};
