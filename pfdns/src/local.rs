use std::time::{Duration, Instant};

use crate::evaluator::Outcome;

/// Local state for a DNS request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    /// What enforcement decided, once it ran.
    pub outcome: Option<Outcome>,

    /// Whether the reply was synthesized rather than forwarded.
    pub synthesized: bool,

    /// When the request was started
    pub time_started: Instant,
}

impl Local {
    pub fn time_elapsed(&self) -> Duration {
        let now = Instant::now();
        now - self.time_started
    }

    /// Short label for logging.
    pub fn outcome_label(&self) -> &'static str {
        self.outcome.as_ref().map_or("unevaluated", Outcome::as_str)
    }
}

impl Default for Local {
    fn default() -> Self {
        Self {
            outcome: None,
            synthesized: false,
            time_started: Instant::now(),
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod local_tests;
