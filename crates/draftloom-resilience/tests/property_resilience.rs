use std::time::Duration;

use draftloom_resilience::{Circuit, RateLimiter};
use draftloom_types::CircuitBreakerConfig;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The breaker never opens before `failure_threshold` consecutive failures,
    /// and always opens at or before it once reached.
    #[test]
    fn breaker_opens_only_at_or_past_threshold(threshold in 1u32..10, failures in 0u32..12) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let circuit = Circuit::new(CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout_ms: 60_000,
                monitoring_window_ms: 60_000,
            });
            for _ in 0..failures {
                circuit.record_failure().await;
            }
            let is_open = matches!(circuit.state().await, draftloom_resilience::BreakerState::Open);
            prop_assert_eq!(is_open, failures >= threshold);
        });
    }

    /// A fresh rate limiter admits exactly `cap` requests inside one window and
    /// refuses every request after that, regardless of cap size.
    #[test]
    fn rate_limiter_admits_exactly_cap_requests_per_window(cap in 1u32..20, attempts in 1u32..40) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let limiter = RateLimiter::new(Duration::from_secs(3600), cap);
            let mut admitted = 0u32;
            for _ in 0..attempts {
                if limiter.check("prop-user").await.is_ok() {
                    admitted += 1;
                }
            }
            prop_assert_eq!(admitted, cap.min(attempts));
        });
    }
}
