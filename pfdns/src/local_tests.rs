#[cfg(test)]
mod tests {
    use super::super::Local;
    use crate::evaluator::Outcome;
    use std::time::Duration;

    #[test]
    fn test_local_default() {
        let local = Local::default();

        assert!(local.outcome.is_none());
        assert!(!local.synthesized);
        assert_eq!(local.outcome_label(), "unevaluated");
    }

    #[test]
    fn test_local_time_elapsed() {
        let local = Local::default();

        std::thread::sleep(Duration::from_millis(10));

        let elapsed = local.time_elapsed();
        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_millis(100));
    }

    #[test]
    fn test_local_equality() {
        let now = std::time::Instant::now();
        let local1 = Local {
            outcome: Some(Outcome::PassThrough),
            synthesized: false,
            time_started: now,
        };

        let mut local2 = local1.clone();
        assert_eq!(local1, local2);

        local2.outcome = Some(Outcome::NoAnswer);
        assert_ne!(local1, local2);
    }

    #[test]
    fn test_local_state_transitions() {
        let mut local = Local::default();

        local.outcome = Some(Outcome::Redirect("192.0.2.1".parse().unwrap()));
        local.synthesized = true;

        assert!(local.synthesized);
        assert_eq!(local.outcome_label(), "redirect");
    }
}
