use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use draftloom_types::CircuitBreakerConfig;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    window_started_at: Instant,
}

/// A single named circuit, guarding one external dependency.
pub struct Circuit {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl Circuit {
    fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                window_started_at: Instant::now(),
            }),
        }
    }

    /// Returns the circuit's state, promoting `open -> half_open` if the recovery
    /// timeout has elapsed. Does not consume the half-open probe slot.
    pub async fn state(&self) -> BreakerState {
        let mut guard = self.inner.lock().await;
        self.maybe_recover(&mut guard);
        guard.state
    }

    /// Call this before attempting the guarded operation. Returns `false` when the
    /// call must be rejected fail-fast (`open`).
    pub async fn try_acquire(&self) -> bool {
        let mut guard = self.inner.lock().await;
        self.maybe_recover(&mut guard);
        !matches!(guard.state, BreakerState::Open)
    }

    pub async fn record_success(&self) {
        let mut guard = self.inner.lock().await;
        guard.consecutive_failures = 0;
        guard.state = BreakerState::Closed;
        guard.opened_at = None;
        guard.window_started_at = Instant::now();
    }

    pub async fn record_failure(&self) {
        let mut guard = self.inner.lock().await;
        let window = Duration::from_millis(self.config.monitoring_window_ms);
        if guard.window_started_at.elapsed() > window {
            guard.consecutive_failures = 0;
            guard.window_started_at = Instant::now();
        }
        guard.consecutive_failures += 1;

        match guard.state {
            BreakerState::HalfOpen => {
                guard.state = BreakerState::Open;
                guard.opened_at = Some(Instant::now());
            }
            BreakerState::Closed if guard.consecutive_failures >= self.config.failure_threshold => {
                guard.state = BreakerState::Open;
                guard.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    fn maybe_recover(&self, guard: &mut BreakerInner) {
        if guard.state != BreakerState::Open {
            return;
        }
        let Some(opened_at) = guard.opened_at else {
            return;
        };
        let recovery = Duration::from_millis(self.config.recovery_timeout_ms);
        if opened_at.elapsed() >= recovery {
            guard.state = BreakerState::HalfOpen;
        }
    }
}

/// A registry of named circuits, one per external dependency (`llm:openai`,
/// `search:duckduckgo`, ...), created lazily on first use.
#[derive(Clone)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    circuits: Arc<Mutex<HashMap<String, Arc<Circuit>>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn circuit(&self, dependency: &str) -> Arc<Circuit> {
        let mut circuits = self.circuits.lock().await;
        circuits
            .entry(dependency.to_string())
            .or_insert_with(|| Arc::new(Circuit::new(self.config.clone())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout_ms: 50,
            monitoring_window_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn opens_exactly_on_the_threshold_th_consecutive_failure() {
        let circuit = Circuit::new(fast_config());
        assert_eq!(circuit.state().await, BreakerState::Closed);
        circuit.record_failure().await;
        circuit.record_failure().await;
        assert_eq!(circuit.state().await, BreakerState::Closed);
        circuit.record_failure().await;
        assert_eq!(circuit.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn open_circuit_fails_fast_without_acquiring() {
        let circuit = Circuit::new(fast_config());
        for _ in 0..3 {
            circuit.record_failure().await;
        }
        assert!(!circuit.try_acquire().await);
    }

    #[tokio::test]
    async fn half_open_probe_closes_on_success_and_reopens_on_failure() {
        let circuit = Circuit::new(fast_config());
        for _ in 0..3 {
            circuit.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(circuit.state().await, BreakerState::HalfOpen);

        circuit.record_success().await;
        assert_eq!(circuit.state().await, BreakerState::Closed);

        for _ in 0..3 {
            circuit.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(circuit.state().await, BreakerState::HalfOpen);
        circuit.record_failure().await;
        assert_eq!(circuit.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn registry_reuses_circuit_per_dependency_name() {
        let registry = CircuitBreakerRegistry::new(fast_config());
        let a = registry.circuit("llm:openai").await;
        let b = registry.circuit("llm:openai").await;
        a.record_failure().await;
        assert_eq!(b.state().await, BreakerState::Closed);
        a.record_failure().await;
        a.record_failure().await;
        assert_eq!(b.state().await, BreakerState::Open);
    }
}
