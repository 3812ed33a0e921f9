//! Delete-threshold gate between diff and sync.

/// Outcome of comparing the removed-file count against the configured limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdDecision {
    pub proceed: bool,
    pub reason: String,
}

/// Allow the sync when `removed <= limit`. Equal counts proceed.
pub fn evaluate(removed: usize, limit: i64) -> ThresholdDecision {
    let proceed = i64::try_from(removed).is_ok_and(|removed| removed <= limit);

    let reason = if proceed {
        format!("Removed files {removed} meets threshold of {limit}, continuing to sync.")
    } else {
        format!("Removed files {removed} does not meet threshold of {limit}, not running sync.")
    };

    ThresholdDecision { proceed, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_limit_proceeds() {
        assert!(evaluate(0, 5).proceed);
        assert!(evaluate(4, 5).proceed);
    }

    #[test]
    fn test_equal_limit_proceeds() {
        let decision = evaluate(5, 5);
        assert!(decision.proceed);
        assert!(decision.reason.contains("meets threshold of 5"));
    }

    #[test]
    fn test_above_limit_aborts() {
        let decision = evaluate(6, 5);
        assert!(!decision.proceed);
        assert!(decision.reason.contains("does not meet threshold of 5"));
    }

    #[test]
    fn test_negative_limit_always_aborts() {
        assert!(!evaluate(0, -1).proceed);
    }
}
