use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, TextEncoder, register_counter,
    register_counter_vec, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: CounterVec = register_counter_vec!(
        "catalog_requests_total",
        "Total number of guarded requests",
        &["bucket"]
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: CounterVec = register_counter_vec!(
        "catalog_rate_limited_total",
        "Requests rejected by the admission gate",
        &["bucket"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge = register_gauge!(
        "catalog_rate_limit_entries",
        "Identifiers currently tracked by the admission gate"
    )
    .unwrap();
    pub static ref RATE_LIMIT_SWEPT: Counter = register_counter!(
        "catalog_rate_limit_swept_total",
        "Expired admission entries removed by the sweeper"
    )
    .unwrap();
    pub static ref SLUG_LOOKUPS: Counter = register_counter!(
        "catalog_slug_lookups_total",
        "Slug candidates looked up in the store"
    )
    .unwrap();
    pub static ref NAMING_CONFLICT_RETRIES: Counter = register_counter!(
        "catalog_naming_conflict_retries_total",
        "Writes retried after a slug uniqueness violation"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "catalog_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}

// Render everything in the default registry in text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
