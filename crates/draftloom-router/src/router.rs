use std::sync::Arc;

use arc_swap::ArcSwap;
use draftloom_types::{RoutingContext, WorkerKind};

use crate::default_rules::default_rules;
use crate::rule::{RouteTarget, RoutingRule};

/// Holds a priority-ordered, copy-on-write list of routing rules. Reads never
/// block on a writer: `route` takes a lock-free snapshot via `ArcSwap`.
pub struct Router {
    rules: ArcSwap<Vec<RoutingRule>>,
}

impl Router {
    pub fn new(fallback_worker: WorkerKind) -> Self {
        Self::with_rules(default_rules(fallback_worker))
    }

    pub fn with_rules(mut rules: Vec<RoutingRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            rules: ArcSwap::from_pointee(rules),
        }
    }

    /// Selects a worker for `ctx`. `is_healthy` reports whether a worker can
    /// currently accept dispatch (per circuit-breaker / registry state).
    pub fn route(&self, ctx: &RoutingContext, is_healthy: impl Fn(WorkerKind) -> bool) -> Option<WorkerKind> {
        let rules = self.rules.load();
        for rule in rules.iter() {
            if !rule.matches(ctx) {
                continue;
            }
            let resolved = match rule.target {
                RouteTarget::Worker(kind) => Some(kind),
                RouteTarget::CurrentPhase => ctx.current_phase,
            };
            let Some(kind) = resolved else {
                continue;
            };
            if is_healthy(kind) {
                return Some(kind);
            }
        }
        None
    }

    /// Inserts `rule`, keeping the list sorted descending by priority.
    pub fn add_rule(&self, rule: RoutingRule) {
        let mut updated: Vec<RoutingRule> = (**self.rules.load()).clone();
        updated.push(rule);
        updated.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.rules.store(Arc::new(updated));
    }

    pub fn remove_rule(&self, description: &str) {
        let mut updated: Vec<RoutingRule> = (**self.rules.load()).clone();
        updated.retain(|r| r.description != description);
        self.rules.store(Arc::new(updated));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.load().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloom_types::{Context, ProjectStatus, RequestType};

    fn ctx(current_phase: Option<WorkerKind>, request_type: RequestType, content_length: usize) -> RoutingContext {
        let context = Context::default();
        RoutingContext {
            current_phase,
            project_status: ProjectStatus {
                active_phase: current_phase,
                phase_count: context.previous_phases.len(),
            },
            previous_phases: context.previous_phases,
            content_length,
            last_worker: None,
            request_type,
            user_preferences: context.user_preferences,
        }
    }

    #[test]
    fn fresh_ideation_request_routes_to_ideation() {
        let router = Router::new(WorkerKind::Ideation);
        let c = ctx(Some(WorkerKind::Ideation), RequestType::NewConversation, 20);
        assert_eq!(router.route(&c, |_| true), Some(WorkerKind::Ideation));
    }

    #[test]
    fn no_match_and_unhealthy_fallback_returns_none() {
        let router = Router::new(WorkerKind::Ideation);
        let c = ctx(None, RequestType::NewConversation, 20);
        assert_eq!(router.route(&c, |_| false), None);
    }

    #[test]
    fn unhealthy_higher_priority_rule_falls_through_to_next_match() {
        let router = Router::new(WorkerKind::Ideation);
        let c = ctx(Some(WorkerKind::Refiner), RequestType::ContinueConversation, 20);
        // refiner unhealthy -> should fall through to the fallback rule (ideation)
        let selected = router.route(&c, |k| k != WorkerKind::Refiner);
        assert_eq!(selected, Some(WorkerKind::Ideation));
    }

    #[test]
    fn router_determinism_for_identical_context_and_rules() {
        let router = Router::new(WorkerKind::Ideation);
        let c = ctx(Some(WorkerKind::Media), RequestType::ContinueConversation, 10);
        let first = router.route(&c, |_| true);
        let second = router.route(&c, |_| true);
        assert_eq!(first, second);
    }

    #[test]
    fn add_rule_keeps_list_sorted_descending_by_priority() {
        let router = Router::new(WorkerKind::Ideation);
        router.add_rule(RoutingRule::new(
            200,
            "test high priority rule",
            crate::rule::RouteTarget::Worker(WorkerKind::Media),
            |_| true,
        ));
        let rules = router.rules.load();
        let priorities: Vec<i32> = rules.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(priorities[0], 200);
    }

    #[test]
    fn remove_rule_drops_named_rule() {
        let router = Router::new(WorkerKind::Ideation);
        let before = router.rule_count();
        router.remove_rule("fallback worker when nothing else matches");
        assert_eq!(router.rule_count(), before - 1);
    }
}
