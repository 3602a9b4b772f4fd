use crate::core::classify::BiometricProfile;
use crate::domain::model::{
    AblationResult, Eye, EyeMeasurement, OpticalZone, PupilBucket, RankedOutcome,
    ResidualResult,
};
use crate::utils::error::{ConsultError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

const NO_DATA: &str = "no matching data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeReport {
    pub eye: Eye,
    pub measurement: EyeMeasurement,
    pub profile: BiometricProfile,
    pub ablation: AblationResult,
    pub residual: ResidualResult,
    pub outcome: RankedOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationReport {
    pub evaluated_at: DateTime<Utc>,
    pub right: EyeReport,
    pub left: EyeReport,
}

impl ConsultationReport {
    pub fn eyes(&self) -> [&EyeReport; 2] {
        [&self.right, &self.left]
    }

    pub fn eye(&self, eye: Eye) -> &EyeReport {
        match eye {
            Eye::Right => &self.right,
            Eye::Left => &self.left,
        }
    }
}

#[derive(Debug, Serialize)]
struct CsvLine<'a> {
    eye: &'a str,
    family: &'a str,
    variant: &'a str,
    ablation_um: Option<f64>,
    residual_um: Option<f64>,
}

pub fn to_json(report: &ConsultationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// 每眼每個變體一列：LASEK 三種瞳孔、SMILE 四種光學區
pub fn to_csv(report: &ConsultationReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for eye in report.eyes() {
        let label = eye.eye.label();
        for bucket in PupilBucket::ALL {
            writer.serialize(CsvLine {
                eye: label,
                family: "lasek",
                variant: bucket.label(),
                ablation_um: eye.ablation.combined.and_then(|v| v[bucket.index()]),
                residual_um: eye.residual.combined.and_then(|v| v[bucket.index()]),
            })?;
        }
        for zone in OpticalZone::ALL {
            writer.serialize(CsvLine {
                eye: label,
                family: "smile",
                variant: zone.label(),
                ablation_um: eye.ablation.by_zone[zone.index()],
                residual_um: eye.residual.by_zone[zone.index()],
            })?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| ConsultError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ConsultError::MalformedResponse {
        table: "report".to_string(),
        message: e.to_string(),
    })
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v))
}

pub fn render_text(report: &ConsultationReport) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    if write_report(&mut out, report).is_err() {
        tracing::error!("Failed to render text report");
    }
    out
}

fn write_report(out: &mut String, report: &ConsultationReport) -> fmt::Result {
    writeln!(
        out,
        "Consultation evaluated at {}",
        report.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    for eye in report.eyes() {
        writeln!(out)?;
        write_eye(out, eye)?;
    }
    Ok(())
}

fn write_eye(out: &mut String, eye: &EyeReport) -> fmt::Result {
    let m = &eye.measurement;
    writeln!(
        out,
        "[{}] thickness {:.0}um, myopia {:.2}D{}, astigmatism {:.2}D, pupil {:.1}mm, target {}",
        eye.eye.label(),
        m.corneal_thickness,
        m.myopia,
        if eye.profile.myopia_flagged { " (!)" } else { "" },
        m.astigmatism,
        m.pupil_size,
        m.target_vision
    )?;

    match eye.ablation.combined {
        Some(ablation) => {
            let residual = eye.residual.combined.unwrap_or([None; 3]);
            writeln!(out, "  LASIK/LASEK  pupil  ablation  residual")?;
            for bucket in PupilBucket::ALL {
                writeln!(
                    out,
                    "               {:<6} {:>8}  {:>8}",
                    bucket.label(),
                    fmt_value(ablation[bucket.index()]),
                    fmt_value(residual[bucket.index()])
                )?;
            }
        }
        None => writeln!(out, "  LASIK/LASEK  {}", NO_DATA)?,
    }

    if eye.ablation.by_zone.iter().all(Option::is_none) {
        writeln!(out, "  SMILE        {}", NO_DATA)?;
    } else {
        writeln!(out, "  SMILE        zone   ablation  residual")?;
        for zone in OpticalZone::ALL {
            let flag = if eye.profile.excess_ablation_zones.contains(&zone) {
                " (!)"
            } else {
                ""
            };
            writeln!(
                out,
                "               {:<6} {:>8}  {:>8}{}",
                zone.label(),
                fmt_value(eye.ablation.by_zone[zone.index()]),
                fmt_value(eye.residual.by_zone[zone.index()]),
                flag
            )?;
        }
    }

    for q in &eye.outcome.qualified {
        writeln!(
            out,
            "  #{} {:<12} {:>5.1}%  (margin {})",
            q.display_rank,
            q.candidate.procedure.label(),
            q.gauge.percent,
            fmt_value(q.candidate.computed_residual)
        )?;
    }
    for d in &eye.outcome.disqualified {
        writeln!(
            out,
            "  x  {:<12} {}",
            d.candidate.procedure.label(),
            d.reason
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::evaluation::evaluate_eye;
    use crate::core::resolver::{CombinedTable, TableSnapshot};
    use crate::domain::model::{RankingPolicy, TableRow};

    fn report() -> ConsultationReport {
        let snapshot = TableSnapshot {
            combined: CombinedTable::from_rows(&[TableRow::new(vec![
                Some(-1.5),
                Some(60.0),
                Some(65.0),
                Some(70.0),
            ])]),
            zones: Default::default(),
        };
        let right = EyeMeasurement {
            corneal_thickness: 520.0,
            myopia: -1.0,
            astigmatism: -0.5,
            pupil_size: 6.0,
            target_vision: "1.0".to_string(),
        };
        let left = EyeMeasurement {
            myopia: -2.0,
            ..right.clone()
        };
        let policy = RankingPolicy::default();
        ConsultationReport {
            evaluated_at: Utc::now(),
            right: evaluate_eye(Eye::Right, &right, &snapshot, &policy),
            left: evaluate_eye(Eye::Left, &left, &snapshot, &policy),
        }
    }

    #[test]
    fn test_csv_has_one_line_per_variant() {
        let csv = to_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "eye,family,variant,ablation_um,residual_um");
        assert_eq!(lines.len(), 1 + 2 * 7);
        assert_eq!(lines[2], "R,lasek,6.0mm,65.0,455.0");
        assert_eq!(lines[4], "R,smile,6.0mm,,");
        assert_eq!(lines[9], "L,lasek,6.0mm,,");
    }

    #[test]
    fn test_json_round_trips() {
        let report = report();
        let json = to_json(&report).unwrap();
        let parsed: ConsultationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.right.outcome, report.right.outcome);
        assert!(json.contains("\"LASEK\""));
    }

    #[test]
    fn test_text_marks_missing_data() {
        let text = render_text(&report());
        assert!(text.contains("[R]"));
        assert!(text.contains("#1 LASEK"));
        assert!(text.contains("SMILE        no matching data"));
        assert!(text.contains("LASIK/LASEK  no matching data"));
        assert!(text.contains("insufficient data"));
    }

    #[test]
    fn test_text_lists_both_eyes_in_order() {
        let text = render_text(&report());
        let right = text.find("[R]").unwrap();
        let left = text.find("[L]").unwrap();
        assert!(text.starts_with("Consultation evaluated at "));
        assert!(right < left);
        assert_eq!(text.matches("LASIK/LASEK  pupil  ablation  residual").count(), 1);
        assert!(text[left..].contains("LASIK/LASEK  no matching data"));
        assert!(text.contains("               6.0mm        65       455"));
    }
}
