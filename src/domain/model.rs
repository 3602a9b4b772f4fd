use crate::utils::error::{ConsultError, Result};
use crate::utils::validation::{
    validate_diopter, validate_pupil_size, validate_target_vision, validate_thickness, Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Right,
    Left,
}

impl Eye {
    pub fn label(&self) -> &'static str {
        match self {
            Eye::Right => "R",
            Eye::Left => "L",
        }
    }

    fn field(&self, name: &str) -> String {
        match self {
            Eye::Right => format!("right.{}", name),
            Eye::Left => format!("left.{}", name),
        }
    }
}

/// 單眼檢查數據，建立後不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeMeasurement {
    /// µm
    pub corneal_thickness: f64,
    pub myopia: f64,
    pub astigmatism: f64,
    /// mm
    pub pupil_size: f64,
    pub target_vision: String,
}

impl EyeMeasurement {
    /// Key of the combined-diopter table.
    pub fn diopter_sum(&self) -> f64 {
        self.myopia + self.astigmatism
    }

    pub fn validate_for(&self, eye: Eye) -> Result<()> {
        validate_thickness(&eye.field("corneal_thickness"), self.corneal_thickness)?;
        validate_diopter(&eye.field("myopia"), self.myopia)?;
        validate_diopter(&eye.field("astigmatism"), self.astigmatism)?;
        validate_pupil_size(&eye.field("pupil_size"), self.pupil_size)?;
        validate_target_vision(&eye.field("target_vision"), &self.target_vision)
    }
}

/// Parses `thickness,myopia,astigmatism,pupil,target` as given on the command line.
impl FromStr for EyeMeasurement {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            return Err(ConsultError::InvalidMeasurement {
                field: "eye".to_string(),
                value: s.to_string(),
                reason: "expected five comma-separated fields: thickness,myopia,astigmatism,pupil,target"
                    .to_string(),
            });
        }

        let number = |field: &str, raw: &str| -> Result<f64> {
            raw.parse::<f64>().map_err(|e| ConsultError::InvalidMeasurement {
                field: field.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            corneal_thickness: number("corneal_thickness", parts[0])?,
            myopia: number("myopia", parts[1])?,
            astigmatism: number("astigmatism", parts[2])?,
            pupil_size: number("pupil_size", parts[3])?,
            target_vision: parts[4].to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyePair {
    pub right: EyeMeasurement,
    pub left: EyeMeasurement,
}

impl EyePair {
    pub fn get(&self, eye: Eye) -> &EyeMeasurement {
        match eye {
            Eye::Right => &self.right,
            Eye::Left => &self.left,
        }
    }
}

impl Validate for EyePair {
    fn validate(&self) -> Result<()> {
        self.right.validate_for(Eye::Right)?;
        self.left.validate_for(Eye::Left)
    }
}

/// A table cell after ingestion: numeric or absent.
pub type Cell = Option<f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn key(&self) -> Cell {
        self.cell(0)
    }

    pub fn cell(&self, index: usize) -> Cell {
        self.cells.get(index).copied().flatten()
    }
}

impl From<Vec<Cell>> for TableRow {
    fn from(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpticalZone {
    #[serde(rename = "6.0mm")]
    Mm6_0,
    #[serde(rename = "6.3mm")]
    Mm6_3,
    #[serde(rename = "6.5mm")]
    Mm6_5,
    #[serde(rename = "6.8mm")]
    Mm6_8,
}

impl OpticalZone {
    /// Smallest zone first; index 0 is the representative zone used for ranking.
    pub const ALL: [OpticalZone; 4] = [
        OpticalZone::Mm6_0,
        OpticalZone::Mm6_3,
        OpticalZone::Mm6_5,
        OpticalZone::Mm6_8,
    ];

    pub fn diameter_mm(&self) -> f64 {
        match self {
            OpticalZone::Mm6_0 => 6.0,
            OpticalZone::Mm6_3 => 6.3,
            OpticalZone::Mm6_5 => 6.5,
            OpticalZone::Mm6_8 => 6.8,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            OpticalZone::Mm6_0 => 0,
            OpticalZone::Mm6_3 => 1,
            OpticalZone::Mm6_5 => 2,
            OpticalZone::Mm6_8 => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OpticalZone::Mm6_0 => "6.0mm",
            OpticalZone::Mm6_3 => "6.3mm",
            OpticalZone::Mm6_5 => "6.5mm",
            OpticalZone::Mm6_8 => "6.8mm",
        }
    }

    pub fn from_diameter(diameter_mm: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|zone| (zone.diameter_mm() - diameter_mm).abs() < 1e-6)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PupilBucket {
    #[serde(rename = "5.5mm")]
    Mm5_5,
    #[serde(rename = "6.0mm")]
    Mm6_0,
    #[serde(rename = "6.5mm")]
    Mm6_5,
}

impl PupilBucket {
    pub const ALL: [PupilBucket; 3] = [PupilBucket::Mm5_5, PupilBucket::Mm6_0, PupilBucket::Mm6_5];

    /// The middle bucket feeds the LASEK decision.
    pub const REPRESENTATIVE: PupilBucket = PupilBucket::Mm6_0;

    pub fn index(&self) -> usize {
        match self {
            PupilBucket::Mm5_5 => 0,
            PupilBucket::Mm6_0 => 1,
            PupilBucket::Mm6_5 => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PupilBucket::Mm5_5 => "5.5mm",
            PupilBucket::Mm6_0 => "6.0mm",
            PupilBucket::Mm6_5 => "6.5mm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableId {
    Combined,
    Zone(OpticalZone),
}

impl TableId {
    pub fn all() -> Vec<TableId> {
        std::iter::once(TableId::Combined)
            .chain(OpticalZone::ALL.into_iter().map(TableId::Zone))
            .collect()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Combined => write!(f, "combined"),
            TableId::Zone(zone) => write!(f, "zone-{}", zone.label()),
        }
    }
}

pub type BucketValues = [Option<f64>; 3];
pub type ZoneValues = [Option<f64>; 4];

/// Ablation depths for one eye. `combined` is `None` when no row matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AblationResult {
    pub combined: Option<BucketValues>,
    pub by_zone: ZoneValues,
}

impl AblationResult {
    pub fn representative_zone(&self) -> Option<f64> {
        self.by_zone[0]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualResult {
    pub combined: Option<BucketValues>,
    pub by_zone: ZoneValues,
}

impl ResidualResult {
    pub fn lasek_residual(&self) -> Option<f64> {
        self.combined
            .and_then(|values| values[PupilBucket::REPRESENTATIVE.index()])
    }

    pub fn smile_residual(&self) -> Option<f64> {
        self.by_zone[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureType {
    SmilePro,
    SmileLasik,
    Lasek,
}

impl ProcedureType {
    pub const ALL: [ProcedureType; 3] = [
        ProcedureType::SmilePro,
        ProcedureType::SmileLasik,
        ProcedureType::Lasek,
    ];

    pub fn priority(&self) -> u8 {
        match self {
            ProcedureType::SmilePro => 1,
            ProcedureType::SmileLasik => 2,
            ProcedureType::Lasek => 3,
        }
    }

    /// Flap/cap allowance subtracted from the residual.
    pub fn residual_offset(&self) -> f64 {
        match self {
            ProcedureType::SmilePro => 100.0,
            ProcedureType::SmileLasik => 110.0,
            ProcedureType::Lasek => 70.0,
        }
    }

    pub fn min_residual(&self) -> f64 {
        match self {
            ProcedureType::SmilePro => 300.0,
            ProcedureType::SmileLasik => 310.0,
            ProcedureType::Lasek => 320.0,
        }
    }

    pub fn is_smile(&self) -> bool {
        matches!(self, ProcedureType::SmilePro | ProcedureType::SmileLasik)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcedureType::SmilePro => "SMILE Pro",
            ProcedureType::SmileLasik => "SMILE LASIK",
            ProcedureType::Lasek => "LASEK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcedureCandidate {
    pub procedure: ProcedureType,
    pub computed_residual: Option<f64>,
    pub min_residual_threshold: f64,
    pub ablation_too_high: bool,
    pub myopia_out_of_range: bool,
}

impl ProcedureCandidate {
    pub fn is_qualified(&self) -> bool {
        !self.ablation_too_high
            && !self.myopia_out_of_range
            && self
                .computed_residual
                .is_some_and(|value| value >= self.min_residual_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    ExcessAblation,
    MyopiaThresholdNotMet,
    InsufficientData,
    CorneaTooThin,
}

impl ExclusionReason {
    pub fn message(&self) -> &'static str {
        match self {
            ExclusionReason::ExcessAblation => "surgery not possible (excess ablation)",
            ExclusionReason::MyopiaThresholdNotMet => {
                "surgery not possible (myopia threshold not met)"
            }
            ExclusionReason::InsufficientData => "insufficient data (no matching reference data)",
            ExclusionReason::CorneaTooThin => "cornea too thin",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeState {
    Normal,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeReading {
    pub percent: f64,
    pub state: GaugeState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedProcedure {
    pub candidate: ProcedureCandidate,
    /// 1-based
    pub display_rank: usize,
    pub gauge: GaugeReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisqualifiedProcedure {
    pub candidate: ProcedureCandidate,
    pub reason: ExclusionReason,
    pub gauge: GaugeReading,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedOutcome {
    pub qualified: Vec<QualifiedProcedure>,
    pub disqualified: Vec<DisqualifiedProcedure>,
}

impl RankedOutcome {
    pub fn top(&self) -> Option<&QualifiedProcedure> {
        self.qualified.first()
    }

    pub fn rank_of(&self, procedure: ProcedureType) -> Option<usize> {
        self.qualified
            .iter()
            .find(|q| q.candidate.procedure == procedure)
            .map(|q| q.display_rank)
    }

    pub fn reason_for(&self, procedure: ProcedureType) -> Option<ExclusionReason> {
        self.disqualified
            .iter()
            .find(|d| d.candidate.procedure == procedure)
            .map(|d| d.reason)
    }

    pub fn len(&self) -> usize {
        self.qualified.len() + self.disqualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Limits applied by the eligibility ranker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingPolicy {
    pub max_reference_residual: f64,
    pub ablation_limit: f64,
    pub myopia_min: f64,
    pub myopia_max: f64,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            max_reference_residual: 500.0,
            ablation_limit: 140.0,
            myopia_min: 0.25,
            myopia_max: 8.5,
        }
    }
}

impl RankingPolicy {
    /// |myopia| outside the SMILE treatment window.
    pub fn myopia_out_of_range(&self, myopia: f64) -> bool {
        let magnitude = myopia.abs();
        magnitude <= self.myopia_min || magnitude >= self.myopia_max
    }

    pub fn ablation_too_high(&self, ablation: Option<f64>) -> bool {
        ablation.is_some_and(|depth| depth >= self.ablation_limit)
    }
}
