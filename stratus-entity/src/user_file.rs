use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "user_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,

    /// Owning user
    pub user_id: i32,

    /// Filename as claimed at upload time (display only)
    pub original_name: String,

    /// Opaque path of the stored bytes, relative to the storage root
    pub stored_location: String,

    /// Size in bytes, measured from the received stream
    pub size: i64,

    /// When the file was uploaded
    pub upload_date: ChronoDateTimeUtc,

    /// When the file was last downloaded, if ever
    pub last_download: Option<ChronoDateTimeUtc>,

    /// Free-form note attached by the owner
    pub comment: String,

    /// Anonymous download token, present while sharing is enabled
    #[sea_orm(unique)]
    pub share_token: Option<Uuid>,

    /// When the share link lapses (never, if unset)
    pub share_expiry: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            upload_date: Set(chrono::Utc::now()),
            ..ActiveModelTrait::default()
        }
    }
}

impl Model {
    /// Check if a share link has been issued for this file
    pub fn is_shared(&self) -> bool {
        self.share_token.is_some()
    }

    /// Check if the share link has lapsed. Lapsed links keep their
    /// token until rotated or disabled, they just stop resolving.
    pub fn is_share_expired(&self) -> bool {
        if let Some(share_expiry) = self.share_expiry {
            chrono::Utc::now() > share_expiry
        } else {
            false
        }
    }

    /// Check if the share link currently resolves to the file
    pub fn is_share_active(&self) -> bool {
        self.is_shared() && !self.is_share_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record() -> Model {
        Model {
            id: 1,
            user_id: 1,
            original_name: "report.pdf".to_string(),
            stored_location: "user_1_storage/abc.pdf".to_string(),
            size: 1024,
            upload_date: Utc::now(),
            last_download: None,
            comment: String::new(),
            share_token: None,
            share_expiry: None,
        }
    }

    #[test]
    fn unshared_record_is_not_active() {
        let file = record();
        assert!(!file.is_shared());
        assert!(!file.is_share_expired());
        assert!(!file.is_share_active());
    }

    #[test]
    fn share_without_expiry_never_lapses() {
        let mut file = record();
        file.share_token = Some(Uuid::new_v4());
        assert!(file.is_shared());
        assert!(!file.is_share_expired());
        assert!(file.is_share_active());
    }

    #[test]
    fn share_with_future_expiry_is_active() {
        let mut file = record();
        file.share_token = Some(Uuid::new_v4());
        file.share_expiry = Some(Utc::now() + Duration::days(7));
        assert!(file.is_share_active());
    }

    #[test]
    fn share_with_past_expiry_is_lapsed_but_still_shared() {
        let mut file = record();
        file.share_token = Some(Uuid::new_v4());
        file.share_expiry = Some(Utc::now() - Duration::seconds(1));
        assert!(file.is_shared());
        assert!(file.is_share_expired());
        assert!(!file.is_share_active());
    }
}
