pub mod cache;
pub mod circuit_breaker;
pub mod cost_ledger;
pub mod rate_limiter;

pub use cache::{Fingerprint, ResponseCache};
pub use circuit_breaker::{BreakerState, Circuit, CircuitBreakerRegistry};
pub use cost_ledger::{synthesize_entry, CostLedger, LedgerSink, NullSink};
pub use rate_limiter::RateLimiter;
