use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of worker roles the orchestrator can route a request to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Ideation,
    Refiner,
    Media,
    Factchecker,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 4] = [
        WorkerKind::Ideation,
        WorkerKind::Refiner,
        WorkerKind::Media,
        WorkerKind::Factchecker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Ideation => "ideation",
            WorkerKind::Refiner => "refiner",
            WorkerKind::Media => "media",
            WorkerKind::Factchecker => "factchecker",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_every_variant() {
        assert_eq!(WorkerKind::ALL.len(), 4);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(WorkerKind::Media.to_string(), "media");
    }
}
