pub mod default_rules;
pub mod router;
pub mod rule;

pub use default_rules::default_rules;
pub use router::Router;
pub use rule::{RouteTarget, RoutingRule};
