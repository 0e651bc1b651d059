use std::sync::Arc;

use dashmap::DashMap;
use sea_orm::sea_query::Alias;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use tokio::sync::Mutex;

use stratus_entity::{user, user_file, UserFile};

/// Aggregate size of a user's stored files in bytes.
///
/// A failed read logs and degrades to zero, so callers may briefly see
/// usage lower than actual until the next successful read.
pub async fn usage(db: &DatabaseConnection, user_id: i32) -> i64 {
    let total = UserFile::find()
        .select_only()
        .column_as(
            user_file::Column::Size.sum().cast_as(Alias::new("BIGINT")),
            "total",
        )
        .filter(user_file::Column::UserId.eq(user_id))
        .into_tuple::<Option<i64>>()
        .one(db)
        .await;

    match total {
        Ok(sum) => sum.flatten().unwrap_or(0),
        Err(e) => {
            tracing::warn!("Failed to read storage usage for user {}: {}", user_id, e);
            0
        }
    }
}

/// Check whether `additional` bytes fit in the user's quota
pub async fn admit(db: &DatabaseConnection, user: &user::Model, additional: i64) -> bool {
    let used = usage(db, user.id).await;
    user.has_capacity_for(used, additional)
}

/// Usage as a percentage of the quota, zero when no quota is set
pub fn usage_percent(used: i64, max_storage: i64) -> f64 {
    if max_storage <= 0 {
        return 0.0;
    }
    (used as f64 / max_storage as f64) * 100.0
}

/// Per-user upload guard. An upload holds its owner's lock across the
/// admission check and the write that follows, so two uploads cannot
/// both pass admission against the same free space.
#[derive(Clone, Default)]
pub struct UploadLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a user's uploads
    pub fn for_user(&self, user_id: i32) -> Arc<Mutex<()>> {
        self.locks.entry(user_id).or_default().value().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
    use stratus_migration::{Migrator, MigratorTrait};

    async fn setup_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn create_user(db: &DatabaseConnection, username: &str, max_storage: i64) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            full_name: Set(username.to_string()),
            storage_path: Set(format!("{}_storage", username)),
            max_storage: Set(max_storage),
            is_superuser: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn add_file(db: &DatabaseConnection, user_id: i32, size: i64) {
        user_file::ActiveModel {
            user_id: Set(user_id),
            original_name: Set("data.bin".to_string()),
            stored_location: Set(format!("loc/{}", uuid::Uuid::new_v4())),
            size: Set(size),
            upload_date: Set(chrono::Utc::now()),
            comment: Set(String::new()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_usage_empty_is_zero() {
        let db = setup_db().await;
        let user = create_user(&db, "alice", 1000).await;

        assert_eq!(usage(&db, user.id).await, 0);
    }

    #[tokio::test]
    async fn test_usage_sums_owned_files_only() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice", 1000).await;
        let bob = create_user(&db, "bob", 1000).await;
        add_file(&db, alice.id, 300).await;
        add_file(&db, alice.id, 200).await;
        add_file(&db, bob.id, 400).await;

        assert_eq!(usage(&db, alice.id).await, 500);
        assert_eq!(usage(&db, bob.id).await, 400);
    }

    #[tokio::test]
    async fn test_usage_degrades_to_zero_on_query_failure() {
        // No migrations ran, so the files table does not exist
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();

        assert_eq!(usage(&db, 1).await, 0);
    }

    #[tokio::test]
    async fn test_admission_boundary() {
        let db = setup_db().await;
        let user = create_user(&db, "carol", 100).await;
        add_file(&db, user.id, 40).await;

        assert!(admit(&db, &user, 60).await);
        assert!(!admit(&db, &user, 61).await);
        assert!(admit(&db, &user, 0).await);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(50, 200), 25.0);
        assert_eq!(usage_percent(0, 200), 0.0);
        assert_eq!(usage_percent(42, 0), 0.0);
    }

    #[test]
    fn test_upload_locks_shared_per_user() {
        let locks = UploadLocks::new();

        let first = locks.for_user(1);
        let second = locks.for_user(1);
        let other = locks.for_user(2);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
