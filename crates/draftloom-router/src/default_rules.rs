use draftloom_types::{RequestType, WorkerKind};

use crate::rule::{RouteTarget, RoutingRule};

/// The default rule set from highest to lowest priority. Mirrors an
/// ordered-guard-clause admission policy: the first matching, healthy rule wins.
pub fn default_rules(fallback_worker: WorkerKind) -> Vec<RoutingRule> {
    vec![
        RoutingRule::new(
            100,
            "new conversation while ideation is the active phase",
            RouteTarget::Worker(WorkerKind::Ideation),
            |ctx| {
                ctx.current_phase == Some(WorkerKind::Ideation)
                    && ctx.request_type == RequestType::NewConversation
            },
        ),
        RoutingRule::new(
            90,
            "refiner is active, or ideation has already completed",
            RouteTarget::Worker(WorkerKind::Refiner),
            |ctx| {
                ctx.current_phase == Some(WorkerKind::Refiner)
                    || ctx.has_completed(WorkerKind::Ideation)
            },
        ),
        RoutingRule::new(
            80,
            "media is active, or continuing a media conversation",
            RouteTarget::Worker(WorkerKind::Media),
            |ctx| {
                ctx.current_phase == Some(WorkerKind::Media)
                    || (ctx.request_type == RequestType::ContinueConversation
                        && ctx.last_worker == Some(WorkerKind::Media))
            },
        ),
        RoutingRule::new(
            70,
            "factchecker is active, or enough prior phases and content to check",
            RouteTarget::Worker(WorkerKind::Factchecker),
            |ctx| {
                ctx.current_phase == Some(WorkerKind::Factchecker)
                    || (ctx.previous_phases.len() >= 2 && ctx.content_length > 500)
            },
        ),
        RoutingRule::new(
            60,
            "explicit phase transition resolves to the project's current phase",
            RouteTarget::CurrentPhase,
            |ctx| ctx.request_type == RequestType::PhaseTransition,
        ),
        RoutingRule::new(
            0,
            "fallback worker when nothing else matches",
            RouteTarget::Worker(fallback_worker),
            |_| true,
        ),
    ]
}
