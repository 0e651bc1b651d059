use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,

    /// Login name (unique)
    #[sea_orm(unique)]
    pub username: String,

    /// Contact address (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Root directory name for this user's files, assigned at creation
    #[sea_orm(unique)]
    pub storage_path: String,

    /// Storage quota in bytes
    pub max_storage: i64,

    /// Elevated accounts may act on other users' records
    pub is_superuser: bool,

    /// When the account was created
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_file::Entity")]
    UserFile,
}

impl Related<super::user_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserFile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            created_at: Set(chrono::Utc::now()),
            ..ActiveModelTrait::default()
        }
    }
}

impl Model {
    /// Check whether `additional` bytes fit within the quota given the
    /// current usage
    pub fn has_capacity_for(&self, used: i64, additional: i64) -> bool {
        used + additional <= self.max_storage
    }
}
