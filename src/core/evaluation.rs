use crate::core::classify::BiometricProfile;
use crate::core::ranking::{EligibilityRanker, RankingInput};
use crate::core::report::{ConsultationReport, EyeReport};
use crate::core::residual::ResidualCalculator;
use crate::core::resolver::{AblationResolver, TableSnapshot};
use crate::domain::model::{Eye, EyeMeasurement, EyePair, RankingPolicy};
use chrono::Utc;

/// Pure per-eye evaluation over one table snapshot.
pub fn evaluate_eye(
    eye: Eye,
    measurement: &EyeMeasurement,
    tables: &TableSnapshot,
    policy: &RankingPolicy,
) -> EyeReport {
    let ablation = AblationResolver::new(tables).resolve(measurement.myopia, measurement.astigmatism);
    let residual = ResidualCalculator::calculate(measurement.corneal_thickness, &ablation);

    // Only the smallest optical zone feeds the SMILE decision.
    let input = RankingInput {
        smile_residual: residual.smile_residual(),
        lasek_residual: residual.lasek_residual(),
        smile_ablation_depth: ablation.representative_zone(),
        myopia: measurement.myopia,
    };
    let outcome = EligibilityRanker::new(*policy).rank(&input);

    tracing::debug!(
        eye = eye.label(),
        smile_residual = ?input.smile_residual,
        lasek_residual = ?input.lasek_residual,
        smile_ablation = ?input.smile_ablation_depth,
        qualified = outcome.qualified.len(),
        "eye evaluated"
    );

    EyeReport {
        eye,
        measurement: measurement.clone(),
        profile: BiometricProfile::build(measurement, &ablation, policy),
        ablation,
        residual,
        outcome,
    }
}

pub fn evaluate_pair(
    pair: &EyePair,
    tables: &TableSnapshot,
    policy: &RankingPolicy,
) -> ConsultationReport {
    ConsultationReport {
        evaluated_at: Utc::now(),
        right: evaluate_eye(Eye::Right, &pair.right, tables, policy),
        left: evaluate_eye(Eye::Left, &pair.left, tables, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{CombinedTable, ZoneAblationTable};
    use crate::domain::model::{ExclusionReason, OpticalZone, ProcedureType, TableRow};

    fn snapshot(zone_value: f64) -> TableSnapshot {
        let zone = |z: OpticalZone, value: f64| {
            ZoneAblationTable::from_rows(
                z,
                vec![
                    TableRow::new(vec![None, Some(0.0), Some(-0.5)]),
                    TableRow::new(vec![Some(-1.0), Some(value), Some(value)]),
                    TableRow::new(vec![Some(-6.0), Some(value + 50.0), Some(value + 50.0)]),
                ],
            )
        };
        TableSnapshot {
            combined: CombinedTable::from_rows(&[TableRow::new(vec![
                Some(-1.5),
                Some(60.0),
                Some(65.0),
                Some(70.0),
            ])]),
            zones: [
                zone(OpticalZone::Mm6_0, zone_value),
                zone(OpticalZone::Mm6_3, zone_value + 5.0),
                zone(OpticalZone::Mm6_5, zone_value + 10.0),
                zone(OpticalZone::Mm6_8, zone_value + 15.0),
            ],
        }
    }

    fn measurement(myopia: f64) -> EyeMeasurement {
        EyeMeasurement {
            corneal_thickness: 520.0,
            myopia,
            astigmatism: -0.5,
            pupil_size: 6.0,
            target_vision: "1.0".to_string(),
        }
    }

    #[test]
    fn test_lasek_scenario() {
        let report = evaluate_eye(
            Eye::Right,
            &measurement(-1.0),
            &snapshot(40.0),
            &RankingPolicy::default(),
        );
        assert_eq!(
            report.residual.combined,
            Some([Some(460.0), Some(455.0), Some(450.0)])
        );
        assert_eq!(report.outcome.rank_of(ProcedureType::Lasek), Some(3));
        assert_eq!(report.outcome.rank_of(ProcedureType::SmilePro), Some(1));
        assert_eq!(report.residual.by_zone, [Some(480.0), Some(475.0), Some(470.0), Some(465.0)]);
    }

    #[test]
    fn test_excess_ablation_scenario() {
        let report = evaluate_eye(
            Eye::Left,
            &measurement(-1.0),
            &snapshot(145.0),
            &RankingPolicy::default(),
        );
        assert_eq!(
            report.outcome.reason_for(ProcedureType::SmilePro),
            Some(ExclusionReason::ExcessAblation)
        );
        assert_eq!(
            report.outcome.reason_for(ProcedureType::SmileLasik),
            Some(ExclusionReason::ExcessAblation)
        );
        assert_eq!(report.outcome.rank_of(ProcedureType::Lasek), Some(1));
    }

    #[test]
    fn test_missing_combined_row() {
        let report = evaluate_eye(
            Eye::Right,
            &measurement(-3.0),
            &snapshot(40.0),
            &RankingPolicy::default(),
        );
        assert_eq!(report.residual.combined, None);
        assert_eq!(
            report.outcome.reason_for(ProcedureType::Lasek),
            Some(ExclusionReason::InsufficientData)
        );
    }

    #[test]
    fn test_eyes_are_independent() {
        let tables = snapshot(40.0);
        let pair = EyePair {
            right: measurement(-1.0),
            left: measurement(-0.2),
        };
        let report = evaluate_pair(&pair, &tables, &RankingPolicy::default());
        let right_alone = evaluate_eye(Eye::Right, &pair.right, &tables, &RankingPolicy::default());

        assert_eq!(report.right.outcome, right_alone.outcome);
        assert_eq!(
            report.left.outcome.reason_for(ProcedureType::SmilePro),
            Some(ExclusionReason::MyopiaThresholdNotMet)
        );
    }
}
