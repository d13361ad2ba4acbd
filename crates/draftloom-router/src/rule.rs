use std::sync::Arc;

use draftloom_types::{RoutingContext, WorkerKind};

/// The resolved target of a matched rule. `CurrentPhase` is a sentinel that the
/// router resolves against the routing context's active phase at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Worker(WorkerKind),
    CurrentPhase,
}

#[derive(Clone)]
pub struct RoutingRule {
    pub priority: i32,
    pub description: String,
    pub target: RouteTarget,
    predicate: Arc<dyn Fn(&RoutingContext) -> bool + Send + Sync>,
}

impl RoutingRule {
    pub fn new(
        priority: i32,
        description: impl Into<String>,
        target: RouteTarget,
        predicate: impl Fn(&RoutingContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            priority,
            description: description.into(),
            target,
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, ctx: &RoutingContext) -> bool {
        (self.predicate)(ctx)
    }
}

impl std::fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingRule")
            .field("priority", &self.priority)
            .field("description", &self.description)
            .field("target", &self.target)
            .finish()
    }
}
