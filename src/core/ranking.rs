use crate::domain::model::{
    DisqualifiedProcedure, ExclusionReason, GaugeReading, GaugeState, ProcedureCandidate,
    ProcedureType, QualifiedProcedure, RankedOutcome, RankingPolicy,
};
use std::cmp::Ordering;

/// Per-eye inputs to the ranker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingInput {
    pub smile_residual: Option<f64>,
    pub lasek_residual: Option<f64>,
    pub smile_ablation_depth: Option<f64>,
    pub myopia: f64,
}

pub struct EligibilityRanker {
    policy: RankingPolicy,
}

impl EligibilityRanker {
    pub fn new(policy: RankingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    pub fn candidates(&self, input: &RankingInput) -> [ProcedureCandidate; 3] {
        let ablation_too_high = self.policy.ablation_too_high(input.smile_ablation_depth);
        let myopia_out_of_range = self.policy.myopia_out_of_range(input.myopia);

        ProcedureType::ALL.map(|procedure| {
            let base = if procedure.is_smile() {
                input.smile_residual
            } else {
                input.lasek_residual
            };
            ProcedureCandidate {
                procedure,
                computed_residual: base.map(|residual| residual - procedure.residual_offset()),
                min_residual_threshold: procedure.min_residual(),
                ablation_too_high: procedure.is_smile() && ablation_too_high,
                myopia_out_of_range: procedure.is_smile() && myopia_out_of_range,
            }
        })
    }

    pub fn rank(&self, input: &RankingInput) -> RankedOutcome {
        let (mut qualified, disqualified): (Vec<ProcedureCandidate>, Vec<ProcedureCandidate>) =
            self.candidates(input)
                .into_iter()
                .partition(ProcedureCandidate::is_qualified);

        qualified.sort_by(compare_candidates);

        let qualified = qualified
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let display_rank = index + 1;
                QualifiedProcedure {
                    candidate,
                    display_rank,
                    gauge: GaugeReading {
                        percent: self.gauge_percent(&candidate, display_rank),
                        state: GaugeState::Normal,
                    },
                }
            })
            .collect();

        let disqualified = disqualified
            .into_iter()
            .map(|candidate| DisqualifiedProcedure {
                candidate,
                reason: exclusion_reason(&candidate),
                gauge: GaugeReading {
                    percent: 100.0,
                    state: GaugeState::Warning,
                },
            })
            .collect();

        RankedOutcome {
            qualified,
            disqualified,
        }
    }

    /// Display-only eligibility percentage. Not clamped.
    pub fn gauge_percent(&self, candidate: &ProcedureCandidate, display_rank: usize) -> f64 {
        let Some(value) = candidate.computed_residual else {
            return 0.0;
        };
        let span = self.policy.max_reference_residual - candidate.min_residual_threshold;
        if span == 0.0 {
            return 0.0;
        }
        let ratio = (value - candidate.min_residual_threshold) / span;

        match display_rank {
            1 => 85.0 + ratio * 15.0,
            2 => 60.0 + ratio * 15.0,
            3 => 30.0 + ratio * 10.0,
            _ => 0.0,
        }
    }
}

impl Default for EligibilityRanker {
    fn default() -> Self {
        Self::new(RankingPolicy::default())
    }
}

/// Priority ascending, then computed residual descending.
fn compare_candidates(a: &ProcedureCandidate, b: &ProcedureCandidate) -> Ordering {
    a.procedure
        .priority()
        .cmp(&b.procedure.priority())
        .then_with(|| {
            let a_value = a.computed_residual.unwrap_or(f64::NEG_INFINITY);
            let b_value = b.computed_residual.unwrap_or(f64::NEG_INFINITY);
            b_value.total_cmp(&a_value)
        })
}

fn exclusion_reason(candidate: &ProcedureCandidate) -> ExclusionReason {
    if candidate.ablation_too_high {
        ExclusionReason::ExcessAblation
    } else if candidate.myopia_out_of_range {
        ExclusionReason::MyopiaThresholdNotMet
    } else if candidate.computed_residual.is_none() {
        ExclusionReason::InsufficientData
    } else {
        ExclusionReason::CorneaTooThin
    }
}
