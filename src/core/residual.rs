use crate::domain::model::{AblationResult, BucketValues, ResidualResult, ZoneValues};

/// Remaining corneal thickness, floored at zero.
pub fn residual(thickness: f64, ablation: f64) -> f64 {
    (thickness - ablation).max(0.0)
}

/// Absent ablation stays absent.
pub fn residual_opt(thickness: f64, ablation: Option<f64>) -> Option<f64> {
    ablation.map(|depth| residual(thickness, depth))
}

pub struct ResidualCalculator;

impl ResidualCalculator {
    pub fn calculate(thickness: f64, ablation: &AblationResult) -> ResidualResult {
        let combined: Option<BucketValues> = ablation
            .combined
            .map(|values| values.map(|depth| residual_opt(thickness, depth)));
        let by_zone: ZoneValues = ablation.by_zone.map(|depth| residual_opt(thickness, depth));

        ResidualResult { combined, by_zone }
    }
}
