use crate::core::numeric::{hundredths, nearest_index};
use crate::domain::model::{
    AblationResult, BucketValues, Cell, OpticalZone, TableRow, ZoneValues,
};
use serde::{Deserialize, Serialize};

/// Cylinder axis width of the zone sheets.
pub const MAX_CYLINDER_COLUMNS: usize = 21;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedDiopterRow {
    pub key: f64,
    /// 5.5 / 6.0 / 6.5 mm pupil buckets
    pub ablations: BucketValues,
}

/// LASIK/LASEK table keyed by myopia + astigmatism.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedTable {
    rows: Vec<CombinedDiopterRow>,
}

impl CombinedTable {
    /// Rows without a numeric key are dropped. Returns `None` when nothing usable remains.
    pub fn from_rows(rows: &[TableRow]) -> Option<Self> {
        let rows: Vec<CombinedDiopterRow> = rows
            .iter()
            .filter_map(|row| {
                row.key().map(|key| CombinedDiopterRow {
                    key,
                    ablations: [row.cell(1), row.cell(2), row.cell(3)],
                })
            })
            .collect();

        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact match on the key at hundredth-diopter precision; first match wins.
    pub fn lookup(&self, diopter_sum: f64) -> Option<BucketValues> {
        let wanted = hundredths(diopter_sum);
        self.rows
            .iter()
            .find(|row| hundredths(row.key) == wanted)
            .map(|row| row.ablations)
    }
}

/// SMILE ablation table for one optical zone.
///
/// Column 0 of every row is the spherical key. Row 0 doubles as the header:
/// its remaining cells are the cylindrical axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAblationTable {
    pub zone: OpticalZone,
    rows: Vec<TableRow>,
    sphere_keys: Vec<Cell>,
    cylinder_keys: Vec<Cell>,
}

impl ZoneAblationTable {
    pub fn from_rows(zone: OpticalZone, rows: Vec<TableRow>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let sphere_keys: Vec<Cell> = rows.iter().map(TableRow::key).collect();
        let cylinder_keys: Vec<Cell> = (1..=MAX_CYLINDER_COLUMNS)
            .take(rows[0].cells.len().saturating_sub(1))
            .map(|index| rows[0].cell(index))
            .collect();

        Some(Self {
            zone,
            rows,
            sphere_keys,
            cylinder_keys,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn defined_sphere_keys(&self) -> usize {
        self.sphere_keys.iter().flatten().count()
    }

    pub fn axis_width(&self) -> usize {
        self.cylinder_keys.iter().flatten().count()
    }

    /// Nearest row by sphere, nearest column by cylinder, read the intersection.
    pub fn lookup(&self, myopia: f64, astigmatism: f64) -> Option<f64> {
        let row_index = nearest_index(&self.sphere_keys, myopia)?;
        let column_index = nearest_index(&self.cylinder_keys, astigmatism)?;
        let value = self.rows.get(row_index)?.cell(column_index + 1);

        tracing::trace!(
            zone = self.zone.label(),
            row_index,
            column_index,
            ?value,
            "zone lookup"
        );
        value
    }
}

/// The reference tables fetched for one evaluation. Missing tables are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    pub combined: Option<CombinedTable>,
    pub zones: [Option<ZoneAblationTable>; 4],
}

impl TableSnapshot {
    pub fn zone(&self, zone: OpticalZone) -> Option<&ZoneAblationTable> {
        self.zones[zone.index()].as_ref()
    }

    pub fn available_tables(&self) -> usize {
        usize::from(self.combined.is_some()) + self.zones.iter().flatten().count()
    }
}

pub struct AblationResolver<'a> {
    tables: &'a TableSnapshot,
}

impl<'a> AblationResolver<'a> {
    pub fn new(tables: &'a TableSnapshot) -> Self {
        Self { tables }
    }

    pub fn resolve(&self, myopia: f64, astigmatism: f64) -> AblationResult {
        let diopter_sum = myopia + astigmatism;
        let combined = self
            .tables
            .combined
            .as_ref()
            .and_then(|table| table.lookup(diopter_sum));

        if combined.is_none() {
            tracing::debug!("No combined-table row for diopter sum {:.2}", diopter_sum);
        }

        let mut by_zone: ZoneValues = [None; 4];
        for zone in OpticalZone::ALL {
            by_zone[zone.index()] = self
                .tables
                .zone(zone)
                .and_then(|table| table.lookup(myopia, astigmatism));
        }

        AblationResult { combined, by_zone }
    }
}
