pub mod clock;
pub mod config;
pub mod counter;
pub mod error;
pub mod gcra;
pub mod handlers;
pub mod key_generator;
pub mod metrics;
pub mod middleware;
pub mod quota;
pub mod response;
pub mod server;
pub mod store;

pub use config::Config;
pub use counter::Counter;
pub use error::{Error, Result};
pub use gcra::RateLimitDecision;
pub use key_generator::KeyStrategy;
pub use metrics::MetricsCollector;
pub use middleware::RateLimitLayer;
pub use quota::Quota;
pub use server::create_app;
pub use store::{AtomicCounterStore, CounterStore, MemoryStore, RedisStore};
