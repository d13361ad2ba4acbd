use draftloom_router::Router;
use draftloom_types::{Context, ProjectStatus, RequestType, RoutingContext, WorkerKind};
use proptest::prelude::*;

fn worker_strategy() -> impl Strategy<Value = WorkerKind> {
    prop_oneof![
        Just(WorkerKind::Ideation),
        Just(WorkerKind::Refiner),
        Just(WorkerKind::Media),
        Just(WorkerKind::Factchecker),
    ]
}

fn request_type_strategy() -> impl Strategy<Value = RequestType> {
    prop_oneof![
        Just(RequestType::NewConversation),
        Just(RequestType::ContinueConversation),
        Just(RequestType::PhaseTransition),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// For a fixed rule list and an always-healthy worker pool, routing the same
    /// context twice always yields the same worker.
    #[test]
    fn router_is_deterministic(
        current_phase in proptest::option::of(worker_strategy()),
        request_type in request_type_strategy(),
        content_length in 0usize..2000,
    ) {
        let router = Router::new(WorkerKind::Ideation);
        let context = Context::default();
        let ctx = RoutingContext {
            current_phase,
            project_status: ProjectStatus { active_phase: current_phase, phase_count: 0 },
            previous_phases: context.previous_phases,
            content_length,
            last_worker: None,
            request_type,
            user_preferences: context.user_preferences,
        };
        let first = router.route(&ctx, |_| true);
        let second = router.route(&ctx, |_| true);
        prop_assert_eq!(first, second);
        prop_assert!(first.is_some(), "an always-healthy pool must always resolve to some worker");
    }
}
