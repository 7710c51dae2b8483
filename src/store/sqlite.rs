//! SQLite persistence backend.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Schema,
};

use super::backend::{check_quota, StateBackend};
use super::entity;
use crate::error::Result;

/// Key/value backend persisting into a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pub(crate) db: DatabaseConnection,
    quota: Option<usize>,
}

impl SqliteBackend {
    /// Connect to `database_url` and create the table if missing.
    pub async fn connect(database_url: &str, quota: Option<usize>) -> Result<Self> {
        let db = Database::connect(database_url).await?;

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let mut create_table = schema.create_table_from_entity(entity::Entity);
        create_table.if_not_exists();
        db.execute(backend.build(&create_table)).await?;

        tracing::debug!("Opened state database at {}", database_url);
        Ok(Self { db, quota })
    }
}

#[async_trait]
impl StateBackend for SqliteBackend {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let entry = entity::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?;
        Ok(entry.map(|model| model.value))
    }

    async fn save(&self, key: &str, value: String) -> Result<()> {
        let others: usize = entity::Entity::find()
            .filter(entity::Column::Key.ne(key))
            .all(&self.db)
            .await?
            .iter()
            .map(|model| model.value.len())
            .sum();
        check_quota(self.quota, others, value.len())?;

        let size = value.len();
        let model = entity::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        };

        entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(entity::Column::Key)
                    .update_columns([entity::Column::Value, entity::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        tracing::debug!("Saved '{}' ({} bytes)", key, size);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        entity::Entity::delete_by_id(key.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}
