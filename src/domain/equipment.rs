use serde::{Deserialize, Serialize};

pub const COLUMN_NAME: &str = "Equipment Name";
pub const COLUMN_TYPE: &str = "Type";
pub const COLUMN_FLOWRATE: &str = "Flowrate";
pub const COLUMN_PRESSURE: &str = "Pressure";
pub const COLUMN_TEMPERATURE: &str = "Temperature";

/// Header columns every upload must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_NAME,
    COLUMN_TYPE,
    COLUMN_FLOWRATE,
    COLUMN_PRESSURE,
    COLUMN_TEMPERATURE,
];

/// One parsed CSV row, before it is attached to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRow {
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRow {
    pub fn new(
        name: impl Into<String>,
        equipment_type: impl Into<String>,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            name: name.into(),
            equipment_type: equipment_type.into(),
            flowrate,
            pressure,
            temperature,
        }
    }
}

/// A persisted equipment row. Owned by exactly one dataset and removed with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: i64,
    #[serde(skip_serializing, default)]
    pub dataset_id: i64,
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRecord {
    pub fn as_row(&self) -> EquipmentRow {
        EquipmentRow {
            name: self.name.clone(),
            equipment_type: self.equipment_type.clone(),
            flowrate: self.flowrate,
            pressure: self.pressure,
            temperature: self.temperature,
        }
    }
}
