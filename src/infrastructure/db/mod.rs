pub mod connection;
pub mod datasets;
pub mod users;

use crate::domain::dataset::{Dataset, IngestOutcome, NewDataset};
use crate::domain::equipment::{EquipmentRecord, EquipmentRow};
use crate::domain::error::Result;
use crate::domain::retention::RetentionPolicy;
use crate::domain::user::{NewUser, User};
use async_trait::async_trait;

pub use datasets::SqliteDatasetRepository;
pub use users::SqliteUserRepository;

/// Storage for datasets and their equipment rows, always scoped to an owner.
#[async_trait]
pub trait DatasetRepository {
    /// Store the dataset and all rows, then evict the owner's surplus
    /// datasets under `policy`. Either everything is applied or nothing is.
    async fn ingest(
        &self,
        dataset: &NewDataset,
        rows: &[EquipmentRow],
        policy: &RetentionPolicy,
    ) -> Result<IngestOutcome>;

    /// Owner's datasets, newest upload first.
    async fn list_by_owner(&self, owner_id: i64, limit: Option<i64>) -> Result<Vec<Dataset>>;

    async fn get(&self, owner_id: i64, dataset_id: i64) -> Result<Option<Dataset>>;

    /// Rows of a dataset ordered by equipment name.
    async fn records(&self, dataset_id: i64) -> Result<Vec<EquipmentRecord>>;

    /// Delete a dataset with its rows. Returns false when nothing matched.
    async fn delete(&self, owner_id: i64, dataset_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository {
    /// Fails with a validation error when the username is taken.
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Existing token of the user, or `candidate` after storing it.
    async fn get_or_create_token(&self, user_id: i64, candidate: &str) -> Result<String>;

    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;
}
