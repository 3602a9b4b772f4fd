use crate::core::report::ConsultationReport;
use crate::domain::model::{RankedOutcome, ResidualResult};

/// The part of a report that decides whether listeners hear about it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSnapshot {
    pub right: ResidualResult,
    pub left: ResidualResult,
    pub right_outcome: RankedOutcome,
    pub left_outcome: RankedOutcome,
}

impl ResidualSnapshot {
    pub fn of(report: &ConsultationReport) -> Self {
        Self {
            right: report.right.residual.clone(),
            left: report.left.residual.clone(),
            right_outcome: report.right.outcome.clone(),
            left_outcome: report.left.outcome.clone(),
        }
    }
}

/// 記住上一次的殘餘角膜結果，只在變化時通知下游
#[derive(Debug, Default)]
pub struct ResidualMemo {
    last: Option<ResidualSnapshot>,
}

impl ResidualMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `next` and reports whether it differs from the previous value.
    pub fn update(&mut self, next: ResidualSnapshot) -> bool {
        if self.last.as_ref() == Some(&next) {
            return false;
        }
        self.last = Some(next);
        true
    }

    pub fn last(&self) -> Option<&ResidualSnapshot> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(residual: f64) -> ResidualSnapshot {
        let result = ResidualResult {
            combined: Some([Some(residual), Some(residual - 5.0), None]),
            by_zone: [Some(residual), None, None, None],
        };
        ResidualSnapshot {
            right: result.clone(),
            left: result,
            right_outcome: RankedOutcome::default(),
            left_outcome: RankedOutcome::default(),
        }
    }

    #[test]
    fn test_memo_suppresses_repeats() {
        let mut memo = ResidualMemo::new();
        assert!(memo.update(snapshot(460.0)));
        assert!(!memo.update(snapshot(460.0)));
        assert!(memo.update(snapshot(455.0)));
        assert!(!memo.update(snapshot(455.0)));
        assert_eq!(memo.last(), Some(&snapshot(455.0)));
    }

    #[test]
    fn test_reset_forces_next_notification() {
        let mut memo = ResidualMemo::new();
        assert!(memo.update(snapshot(460.0)));
        memo.reset();
        assert!(memo.update(snapshot(460.0)));
    }
}
