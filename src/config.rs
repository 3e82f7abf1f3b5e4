use clap::Parser;
use std::time::Duration;

use crate::rate_limit::RatePolicy;

// One year; keeps window ends well inside chrono's date range
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-catalog")]
#[command(about = "Recipe catalog API with per-client admission control")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Max read requests (list + single) per client per window
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub read_limit: u32,

    // Max creates per client per window
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub create_limit: u32,

    // Max updates per client per window
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub update_limit: u32,

    // Max deletes per client per window
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub delete_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub rate_window: u64,

    // How often expired rate limit entries are swept, in seconds
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub sweep_interval: u64,

    // Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn policies(&self) -> RatePolicies {
        let window = Duration::from_secs(self.rate_window);
        RatePolicies {
            list: RatePolicy::new("get-recipes", self.read_limit, window),
            get: RatePolicy::new("get-recipe", self.read_limit, window),
            create: RatePolicy::new("post-recipes", self.create_limit, window),
            update: RatePolicy::new("put-recipe", self.update_limit, window),
            delete: RatePolicy::new("delete-recipe", self.delete_limit, window),
        }
    }

    pub fn sweep_every(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

/// One policy per guarded endpoint class.
#[derive(Debug, Clone)]
pub struct RatePolicies {
    pub list: RatePolicy,
    pub get: RatePolicy,
    pub create: RatePolicy,
    pub update: RatePolicy,
    pub delete: RatePolicy,
}

impl Default for RatePolicies {
    fn default() -> Self {
        Args::parse_from(["recipe-catalog"]).policies()
    }
}
