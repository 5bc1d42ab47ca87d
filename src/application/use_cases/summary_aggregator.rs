use std::collections::BTreeMap;

use crate::domain::equipment::EquipmentRow;
use crate::domain::summary::{DatasetSummary, MeasurementValues};

// ============================================================
// SUMMARY AGGREGATOR
// ============================================================

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Running min/max/sum for one measurement column
#[derive(Debug, Clone, Copy)]
struct ColumnStats {
    sum: f64,
    min: f64,
    max: f64,
}

impl ColumnStats {
    fn seed(value: f64) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Compute count, means, per-type counts and min/max over the rows.
///
/// An empty input is not an error: every number is zero and the type
/// distribution is empty.
pub fn summarize(rows: &[EquipmentRow]) -> DatasetSummary {
    let Some(first) = rows.first() else {
        return DatasetSummary::default();
    };

    let mut flowrate = ColumnStats::seed(first.flowrate);
    let mut pressure = ColumnStats::seed(first.pressure);
    let mut temperature = ColumnStats::seed(first.temperature);
    let mut type_distribution: BTreeMap<String, i64> = BTreeMap::new();
    *type_distribution
        .entry(first.equipment_type.clone())
        .or_insert(0) += 1;

    for row in &rows[1..] {
        flowrate.push(row.flowrate);
        pressure.push(row.pressure);
        temperature.push(row.temperature);
        *type_distribution
            .entry(row.equipment_type.clone())
            .or_insert(0) += 1;
    }

    let count = rows.len() as f64;

    DatasetSummary {
        total_count: rows.len() as i64,
        avg_flowrate: round2(flowrate.sum / count),
        avg_pressure: round2(pressure.sum / count),
        avg_temperature: round2(temperature.sum / count),
        type_distribution,
        min_values: MeasurementValues {
            flowrate: round2(flowrate.min),
            pressure: round2(pressure.min),
            temperature: round2(temperature.min),
        },
        max_values: MeasurementValues {
            flowrate: round2(flowrate.max),
            pressure: round2(pressure.max),
            temperature: round2(temperature.max),
        },
    }
}
