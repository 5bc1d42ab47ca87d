use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::equipment::EquipmentRecord;

/// Metadata and headline averages of one uploaded CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    #[serde(skip_serializing, default)]
    pub owner_id: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

/// Values needed to create a dataset. The id is assigned by storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub owner_id: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDetail {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub equipment_items: Vec<EquipmentRecord>,
}

/// Result of a completed ingestion: the stored dataset and the ids evicted
/// to keep the owner within the retention limit.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub dataset: Dataset,
    pub evicted: Vec<i64>,
}
