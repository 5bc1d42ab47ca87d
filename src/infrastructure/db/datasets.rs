use crate::domain::dataset::{Dataset, IngestOutcome, NewDataset};
use crate::domain::equipment::{EquipmentRecord, EquipmentRow};
use crate::domain::error::{AppError, Result};
use crate::domain::retention::RetentionPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use super::DatasetRepository;

const DATASET_COLUMNS: &str =
    "id, owner_id, filename, uploaded_at, total_count, avg_flowrate, avg_pressure, avg_temperature";

pub struct SqliteDatasetRepository {
    pool: SqlitePool,
}

impl SqliteDatasetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatasetRepository for SqliteDatasetRepository {
    async fn ingest(
        &self,
        dataset: &NewDataset,
        rows: &[EquipmentRow],
        policy: &RetentionPolicy,
    ) -> Result<IngestOutcome> {
        // The first statement is a write, so the transaction holds SQLite's
        // single writer lock from here until commit.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin ingestion: {e}")))?;

        let inserted = sqlx::query(
            "INSERT INTO datasets (owner_id, filename, uploaded_at, total_count, avg_flowrate, avg_pressure, avg_temperature) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(dataset.owner_id)
        .bind(&dataset.filename)
        .bind(dataset.uploaded_at)
        .bind(dataset.total_count)
        .bind(dataset.avg_flowrate)
        .bind(dataset.avg_pressure)
        .bind(dataset.avg_temperature)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert dataset: {e}")))?;

        let dataset_id = inserted.last_insert_rowid();

        for row in rows {
            sqlx::query(
                "INSERT INTO equipment (dataset_id, name, equipment_type, flowrate, pressure, temperature) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(dataset_id)
            .bind(&row.name)
            .bind(&row.equipment_type)
            .bind(row.flowrate)
            .bind(row.pressure)
            .bind(row.temperature)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert equipment row: {e}")))?;
        }

        let owned = sqlx::query_as::<_, DatasetEntity>(&format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE owner_id = ? \
             ORDER BY uploaded_at DESC, id DESC"
        ))
        .bind(dataset.owner_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list owner datasets: {e}")))?;

        let owned: Vec<Dataset> = owned.into_iter().map(|e| e.into()).collect();
        let evicted = policy.evictions(&owned);

        for id in &evicted {
            sqlx::query("DELETE FROM equipment WHERE dataset_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to evict equipment rows: {e}"))
                })?;
            sqlx::query("DELETE FROM datasets WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to evict dataset: {e}")))?;
        }

        let stored = owned
            .into_iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| {
                AppError::Internal(format!("Dataset {dataset_id} missing after insert"))
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit ingestion: {e}")))?;

        Ok(IngestOutcome {
            dataset: stored,
            evicted,
        })
    }

    async fn list_by_owner(&self, owner_id: i64, limit: Option<i64>) -> Result<Vec<Dataset>> {
        let rows = sqlx::query_as::<_, DatasetEntity>(&format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE owner_id = ? \
             ORDER BY uploaded_at DESC, id DESC LIMIT ?"
        ))
        .bind(owner_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list datasets: {e}")))?;

        Ok(rows.into_iter().map(|e| e.into()).collect())
    }

    async fn get(&self, owner_id: i64, dataset_id: i64) -> Result<Option<Dataset>> {
        let row = sqlx::query_as::<_, DatasetEntity>(&format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE id = ? AND owner_id = ?"
        ))
        .bind(dataset_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dataset: {e}")))?;

        Ok(row.map(|e| e.into()))
    }

    async fn records(&self, dataset_id: i64) -> Result<Vec<EquipmentRecord>> {
        let rows = sqlx::query_as::<_, EquipmentEntity>(
            "SELECT id, dataset_id, name, equipment_type, flowrate, pressure, temperature \
             FROM equipment WHERE dataset_id = ? ORDER BY name, id",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list equipment: {e}")))?;

        Ok(rows.into_iter().map(|e| e.into()).collect())
    }

    async fn delete(&self, owner_id: i64, dataset_id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin delete: {e}")))?;

        let result = sqlx::query("DELETE FROM datasets WHERE id = ? AND owner_id = ?")
            .bind(dataset_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete dataset: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM equipment WHERE dataset_id = ?")
            .bind(dataset_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete equipment: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit delete: {e}")))?;

        Ok(true)
    }
}

// Internal entities for database mapping
#[derive(sqlx::FromRow)]
struct DatasetEntity {
    id: i64,
    owner_id: i64,
    filename: String,
    uploaded_at: DateTime<Utc>,
    total_count: i64,
    avg_flowrate: f64,
    avg_pressure: f64,
    avg_temperature: f64,
}

impl From<DatasetEntity> for Dataset {
    fn from(e: DatasetEntity) -> Self {
        Self {
            id: e.id,
            owner_id: e.owner_id,
            filename: e.filename,
            uploaded_at: e.uploaded_at,
            total_count: e.total_count,
            avg_flowrate: e.avg_flowrate,
            avg_pressure: e.avg_pressure,
            avg_temperature: e.avg_temperature,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EquipmentEntity {
    id: i64,
    dataset_id: i64,
    name: String,
    equipment_type: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl From<EquipmentEntity> for EquipmentRecord {
    fn from(e: EquipmentEntity) -> Self {
        Self {
            id: e.id,
            dataset_id: e.dataset_id,
            name: e.name,
            equipment_type: e.equipment_type,
            flowrate: e.flowrate,
            pressure: e.pressure,
            temperature: e.temperature,
        }
    }
}
