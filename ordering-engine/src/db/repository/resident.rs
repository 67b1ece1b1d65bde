//! Resident Repository

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Resident, ResidentCreate, ResidentStatus};
use crate::utils::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const RESIDENT_TABLE: &str = "resident";

#[derive(Clone)]
pub struct ResidentRepository {
    base: BaseRepository,
}

impl ResidentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find resident by full id string ("resident:…")
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Resident>> {
        let record_id = parse_record_id(id)?;
        let resident: Option<Resident> = self.base.db().select(record_id).await?;
        Ok(resident)
    }

    /// Create a new resident (account flow / seeding)
    pub async fn create(&self, data: ResidentCreate) -> RepoResult<Resident> {
        let resident = Resident {
            id: None,
            name: data.name,
            unit_no: data.unit_no,
            phone: data.phone,
            status: data.status.unwrap_or(ResidentStatus::Pending),
            created_at: now_millis(),
        };

        let created: Option<Resident> = self
            .base
            .db()
            .create(RESIDENT_TABLE)
            .content(resident)
            .await?;

        created.ok_or_else(|| RepoError::Database("Failed to create resident".to_string()))
    }
}
