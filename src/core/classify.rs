use crate::domain::model::{AblationResult, EyeMeasurement, OpticalZone, RankingPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThicknessBand {
    Thin,
    SlightlyThin,
    Average,
    Thick,
    VeryThick,
}

impl ThicknessBand {
    pub fn of(thickness: f64) -> Self {
        if thickness < 460.0 {
            ThicknessBand::Thin
        } else if thickness < 500.0 {
            ThicknessBand::SlightlyThin
        } else if thickness < 550.0 {
            ThicknessBand::Average
        } else if thickness < 600.0 {
            ThicknessBand::Thick
        } else {
            ThicknessBand::VeryThick
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PupilBand {
    /// little night glare
    Small,
    Normal,
    /// more night glare
    Large,
}

impl PupilBand {
    pub fn of(pupil_size: f64) -> Self {
        if pupil_size < 5.5 {
            PupilBand::Small
        } else if pupil_size <= 6.5 {
            PupilBand::Normal
        } else {
            PupilBand::Large
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefractiveGrade {
    None,
    Mild,
    Moderate,
    High,
    Extreme,
}

impl RefractiveGrade {
    /// 0 ~ -3D mild, -3D ~ -6D moderate, -6D ~ -10D high, beyond extreme
    pub fn of_myopia(myopia: f64) -> Self {
        let magnitude = myopia.abs();
        if magnitude == 0.0 {
            RefractiveGrade::None
        } else if magnitude <= 3.0 {
            RefractiveGrade::Mild
        } else if magnitude <= 6.0 {
            RefractiveGrade::Moderate
        } else if magnitude <= 10.0 {
            RefractiveGrade::High
        } else {
            RefractiveGrade::Extreme
        }
    }

    pub fn of_astigmatism(astigmatism: f64) -> Self {
        let magnitude = astigmatism.abs();
        if magnitude <= 1.0 {
            RefractiveGrade::Mild
        } else if magnitude <= 2.0 {
            RefractiveGrade::Moderate
        } else if magnitude <= 3.0 {
            RefractiveGrade::High
        } else {
            RefractiveGrade::Extreme
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricProfile {
    pub thickness: ThicknessBand,
    pub pupil: PupilBand,
    pub myopia: RefractiveGrade,
    pub astigmatism: RefractiveGrade,
    pub myopia_flagged: bool,
    pub excess_ablation_zones: Vec<OpticalZone>,
}

impl BiometricProfile {
    pub fn build(
        measurement: &EyeMeasurement,
        ablation: &AblationResult,
        policy: &RankingPolicy,
    ) -> Self {
        let excess_ablation_zones = OpticalZone::ALL
            .into_iter()
            .filter(|zone| policy.ablation_too_high(ablation.by_zone[zone.index()]))
            .collect();

        Self {
            thickness: ThicknessBand::of(measurement.corneal_thickness),
            pupil: PupilBand::of(measurement.pupil_size),
            myopia: RefractiveGrade::of_myopia(measurement.myopia),
            astigmatism: RefractiveGrade::of_astigmatism(measurement.astigmatism),
            myopia_flagged: policy.myopia_out_of_range(measurement.myopia),
            excess_ablation_zones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thickness_bands() {
        assert_eq!(ThicknessBand::of(430.0), ThicknessBand::Thin);
        assert_eq!(ThicknessBand::of(460.0), ThicknessBand::SlightlyThin);
        assert_eq!(ThicknessBand::of(520.0), ThicknessBand::Average);
        assert_eq!(ThicknessBand::of(550.0), ThicknessBand::Thick);
        assert_eq!(ThicknessBand::of(640.0), ThicknessBand::VeryThick);
    }

    #[test]
    fn test_pupil_bands() {
        assert_eq!(PupilBand::of(5.0), PupilBand::Small);
        assert_eq!(PupilBand::of(6.5), PupilBand::Normal);
        assert_eq!(PupilBand::of(7.1), PupilBand::Large);
    }

    #[test]
    fn test_refractive_grades() {
        assert_eq!(RefractiveGrade::of_myopia(0.0), RefractiveGrade::None);
        assert_eq!(RefractiveGrade::of_myopia(-3.0), RefractiveGrade::Mild);
        assert_eq!(RefractiveGrade::of_myopia(-6.25), RefractiveGrade::High);
        assert_eq!(RefractiveGrade::of_myopia(-11.0), RefractiveGrade::Extreme);
        assert_eq!(RefractiveGrade::of_astigmatism(0.0), RefractiveGrade::Mild);
        assert_eq!(RefractiveGrade::of_astigmatism(-1.5), RefractiveGrade::Moderate);
        assert_eq!(RefractiveGrade::of_astigmatism(-3.25), RefractiveGrade::Extreme);
    }

    #[test]
    fn test_profile_flags() {
        let measurement = EyeMeasurement {
            corneal_thickness: 505.0,
            myopia: -9.0,
            astigmatism: -0.5,
            pupil_size: 6.0,
            target_vision: "1.0".to_string(),
        };
        let ablation = AblationResult {
            combined: None,
            by_zone: [Some(139.0), Some(141.0), None, Some(150.0)],
        };
        let profile = BiometricProfile::build(&measurement, &ablation, &RankingPolicy::default());

        assert!(profile.myopia_flagged);
        assert_eq!(
            profile.excess_ablation_zones,
            vec![OpticalZone::Mm6_3, OpticalZone::Mm6_8]
        );
        assert_eq!(profile.myopia, RefractiveGrade::High);
    }
}
