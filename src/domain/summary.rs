use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value per measurement column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValues {
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: BTreeMap<String, i64>,
    pub min_values: MeasurementValues,
    pub max_values: MeasurementValues,
}

impl DatasetSummary {
    /// Share of each equipment type in percent, one decimal, sorted by type.
    pub fn type_percentages(&self) -> Vec<(String, i64, f64)> {
        self.type_distribution
            .iter()
            .map(|(equipment_type, count)| {
                let share = if self.total_count > 0 {
                    *count as f64 / self.total_count as f64 * 100.0
                } else {
                    0.0
                };
                (equipment_type.clone(), *count, (share * 10.0).round() / 10.0)
            })
            .collect()
    }
}
