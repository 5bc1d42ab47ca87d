use crate::application::use_cases::summary_aggregator::summarize;
use crate::domain::dataset::{Dataset, DatasetDetail, NewDataset};
use crate::domain::error::{AppError, Result};
use crate::domain::retention::RetentionPolicy;
use crate::domain::summary::DatasetSummary;
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::db::DatasetRepository;
use crate::infrastructure::pdf::ReportRenderer;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

pub struct DatasetUseCase {
    repository: Arc<dyn DatasetRepository + Send + Sync>,
    parser: CsvParser,
    renderer: ReportRenderer,
    retention: RetentionPolicy,
    max_upload_bytes: usize,
}

impl DatasetUseCase {
    pub fn new(
        repository: Arc<dyn DatasetRepository + Send + Sync>,
        retention: RetentionPolicy,
        max_upload_bytes: usize,
        report_row_limit: usize,
    ) -> Self {
        Self {
            repository,
            parser: CsvParser::new(),
            renderer: ReportRenderer::new(report_row_limit),
            retention,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate, parse and store an uploaded CSV for `owner_id`, then trim
    /// the owner's datasets to the retention limit.
    pub async fn upload(&self, owner_id: i64, filename: &str, content: &[u8]) -> Result<DatasetDetail> {
        if !filename.to_ascii_lowercase().ends_with(".csv") {
            return Err(AppError::ValidationError("File must be a CSV".to_string()));
        }
        if content.len() > self.max_upload_bytes {
            return Err(AppError::ValidationError(format!(
                "File exceeds the maximum upload size of {} bytes",
                self.max_upload_bytes
            )));
        }

        let rows = self.parser.parse_bytes(content)?;
        let summary = summarize(&rows);

        let new_dataset = NewDataset {
            owner_id,
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            total_count: summary.total_count,
            avg_flowrate: summary.avg_flowrate,
            avg_pressure: summary.avg_pressure,
            avg_temperature: summary.avg_temperature,
        };

        let outcome = self
            .repository
            .ingest(&new_dataset, &rows, &self.retention)
            .await
            .map_err(|e| {
                error!(error = %e, owner_id, filename = %filename, "Failed to store dataset");
                e
            })?;

        if !outcome.evicted.is_empty() {
            info!(
                owner_id,
                evicted = ?outcome.evicted,
                limit = self.retention.limit(),
                "Evicted datasets over retention limit"
            );
        }

        let equipment_items = self.repository.records(outcome.dataset.id).await?;
        Ok(DatasetDetail {
            dataset: outcome.dataset,
            equipment_items,
        })
    }

    pub async fn list(&self, owner_id: i64) -> Result<Vec<Dataset>> {
        self.repository
            .list_by_owner(owner_id, Some(self.retention.limit() as i64))
            .await
    }

    pub async fn detail(&self, owner_id: i64, dataset_id: i64) -> Result<DatasetDetail> {
        let dataset = self.owned(owner_id, dataset_id).await?;
        let equipment_items = self.repository.records(dataset.id).await?;
        Ok(DatasetDetail {
            dataset,
            equipment_items,
        })
    }

    pub async fn delete(&self, owner_id: i64, dataset_id: i64) -> Result<()> {
        if self.repository.delete(owner_id, dataset_id).await? {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    pub async fn summary(&self, owner_id: i64, dataset_id: i64) -> Result<DatasetSummary> {
        let dataset = self.owned(owner_id, dataset_id).await?;
        let records = self.repository.records(dataset.id).await?;
        let rows: Vec<_> = records.iter().map(|r| r.as_row()).collect();
        Ok(summarize(&rows))
    }

    /// PDF bytes of the dataset report.
    pub async fn report(&self, owner_id: i64, dataset_id: i64) -> Result<Vec<u8>> {
        let dataset = self.owned(owner_id, dataset_id).await?;
        let records = self.repository.records(dataset.id).await?;
        let rows: Vec<_> = records.iter().map(|r| r.as_row()).collect();
        let summary = summarize(&rows);

        self.renderer
            .render(&dataset, &records, &summary)
            .map_err(|e| {
                error!(error = %e, dataset_id, "Failed to render report");
                e
            })
    }

    async fn owned(&self, owner_id: i64, dataset_id: i64) -> Result<Dataset> {
        self.repository
            .get(owner_id, dataset_id)
            .await?
            .ok_or_else(not_found)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Dataset not found".to_string())
}
