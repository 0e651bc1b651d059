use crate::error::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use stratus_migration::{Migrator, MigratorTrait};

pub async fn setup_database(database_url: &str) -> Result<DatabaseConnection> {
    tracing::info!("🔗 Connecting to database: {}", database_url);

    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    tracing::info!("🔄 Running database migrations...");
    Migrator::up(&db, None).await?;
    tracing::info!("✅ Migrations completed successfully");

    Ok(db)
}

pub struct CreateFileParams {
    pub user_id: i32,
    pub original_name: String,
    pub stored_location: String,
    pub size: i64,
    pub comment: String,
}

pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub max_storage: Option<i64>,
    pub is_superuser: bool,
}

// Database operations for users
pub mod user_ops {
    use super::*;
    use crate::config::Config;
    use crate::error::AppError;
    use crate::storage::FileStorage;
    use sea_orm::*;
    use stratus_entity::{user, User};

    fn validate_username(username: &str) -> Result<()> {
        let mut chars = username.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest_alphanumeric = chars.all(|c| c.is_ascii_alphanumeric());

        if !starts_with_letter || !rest_alphanumeric || !(4..=20).contains(&username.len()) {
            return Err(AppError::BadRequest(
                "Username must be 4-20 characters, start with a letter and contain only letters and digits"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<()> {
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(AppError::BadRequest("Invalid email address".to_string())),
        }
    }

    pub async fn create_user(
        db: &DatabaseConnection,
        config: &Config,
        params: CreateUserParams,
    ) -> Result<user::Model> {
        validate_username(&params.username)?;
        validate_email(&params.email)?;

        if let Some(max_storage) = params.max_storage {
            if max_storage < config.min_quota {
                return Err(AppError::BadRequest(format!(
                    "Storage quota must be at least {} bytes",
                    config.min_quota
                )));
            }
        }

        let taken = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(params.username.clone()))
                    .add(user::Column::Email.eq(params.email.clone())),
            )
            .count(db)
            .await?;
        if taken > 0 {
            return Err(AppError::BadRequest(
                "Username or email already in use".to_string(),
            ));
        }

        // The admin account is always elevated
        let is_superuser = params.is_superuser || params.username == "admin";
        let max_storage = params.max_storage.unwrap_or(if is_superuser {
            config.admin_quota
        } else {
            config.default_quota
        });

        // The storage path embeds the row id, which does not exist
        // until after the insert; start from a unique placeholder
        let user_model = user::ActiveModel {
            username: Set(params.username),
            email: Set(params.email),
            full_name: Set(params.full_name),
            storage_path: Set(format!("user_pending_{}", uuid::Uuid::new_v4())),
            max_storage: Set(max_storage),
            is_superuser: Set(is_superuser),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let user = user_model.insert(db).await?;

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.storage_path = Set(format!("user_{}_storage", user_id));
        let user = active.update(db).await?;

        tracing::info!("👤 Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user_by_id(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<Option<user::Model>> {
        let user = User::find_by_id(user_id).one(db).await?;
        Ok(user)
    }

    pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
        let users = User::find().order_by_asc(user::Column::Id).all(db).await?;
        Ok(users)
    }

    pub async fn delete_user(
        db: &DatabaseConnection,
        storage: &FileStorage,
        cache: &crate::cache::ListingCache,
        user_id: i32,
    ) -> Result<()> {
        let user = User::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound)?;

        // Remove the user's files from disk; the records go with the
        // user through the cascade
        if let Err(e) = storage.delete_user_dir(&user.storage_path).await {
            tracing::warn!(
                "Failed to delete storage directory {}: {}",
                user.storage_path,
                e
            );
        }

        User::delete_by_id(user.id).exec(db).await?;
        cache.invalidate(user.id).await;

        tracing::info!("🗑️  Deleted user {} ({})", user.username, user.id);
        Ok(())
    }

    /// Provision the default elevated account on an empty installation
    pub async fn ensure_admin(db: &DatabaseConnection, config: &Config) -> Result<()> {
        let existing = User::find().count(db).await?;
        if existing > 0 {
            return Ok(());
        }

        let admin = create_user(
            db,
            config,
            CreateUserParams {
                username: "admin".to_string(),
                email: config.admin_contact.clone(),
                full_name: "Administrator".to_string(),
                max_storage: None,
                is_superuser: true,
            },
        )
        .await?;

        tracing::info!("👤 Provisioned default admin account ({})", admin.id);
        Ok(())
    }
}

// Database operations for file records
pub mod file_ops {
    use super::*;
    use crate::cache::ListingCache;
    use crate::error::AppError;
    use crate::storage::FileStorage;
    use sea_orm::sea_query::Expr;
    use sea_orm::*;
    use stratus_entity::{user, user_file, UserFile};
    use stratus_types::FileResponse;
    use uuid::Uuid;

    /// Shape a record for API responses and the listing cache
    pub fn file_response(file: user_file::Model, owner: &str) -> FileResponse {
        FileResponse {
            id: file.id,
            original_name: file.original_name,
            size: file.size,
            upload_date: file.upload_date,
            last_download: file.last_download,
            comment: file.comment,
            share_token: file.share_token,
            share_expiry: file.share_expiry,
            owner: owner.to_string(),
        }
    }

    pub async fn create_file_record(
        db: &DatabaseConnection,
        cache: &ListingCache,
        params: CreateFileParams,
    ) -> Result<user_file::Model> {
        let file_model = user_file::ActiveModel {
            user_id: Set(params.user_id),
            original_name: Set(params.original_name),
            stored_location: Set(params.stored_location),
            size: Set(params.size),
            upload_date: Set(chrono::Utc::now()),
            comment: Set(params.comment),
            ..Default::default()
        };

        let file = file_model.insert(db).await?;
        cache.invalidate(file.user_id).await;
        Ok(file)
    }

    /// Listing for a user, served from the cache when fresh
    pub async fn list_files_for_user(
        db: &DatabaseConnection,
        cache: &ListingCache,
        owner: &user::Model,
    ) -> Result<Vec<FileResponse>> {
        if let Some(files) = cache.get(owner.id).await {
            tracing::debug!("Listing cache hit for user {}", owner.id);
            return Ok(files);
        }

        let files = UserFile::find()
            .filter(user_file::Column::UserId.eq(owner.id))
            .order_by_asc(user_file::Column::Id)
            .all(db)
            .await?;

        let listing: Vec<FileResponse> = files
            .into_iter()
            .map(|file| file_response(file, &owner.username))
            .collect();

        cache.put(owner.id, &listing).await;
        Ok(listing)
    }

    pub async fn get_file_by_id(
        db: &DatabaseConnection,
        file_id: i32,
    ) -> Result<Option<user_file::Model>> {
        let file = UserFile::find_by_id(file_id).one(db).await?;
        Ok(file)
    }

    /// Fetch a record enforcing the owner-or-elevated rule. Unknown ids
    /// are NotFound; known ids owned by someone else are
    /// PermissionDenied, with nothing about the record disclosed.
    pub async fn get_file_for(
        db: &DatabaseConnection,
        file_id: i32,
        requester: &user::Model,
    ) -> Result<user_file::Model> {
        let file = UserFile::find_by_id(file_id)
            .one(db)
            .await?
            .ok_or(AppError::FileNotFound)?;

        if file.user_id != requester.id && !requester.is_superuser {
            return Err(AppError::PermissionDenied);
        }

        Ok(file)
    }

    pub async fn get_file_by_share_token(
        db: &DatabaseConnection,
        token: Uuid,
    ) -> Result<Option<user_file::Model>> {
        let file = UserFile::find()
            .filter(user_file::Column::ShareToken.eq(token))
            .one(db)
            .await?;
        Ok(file)
    }

    /// Apply a metadata edit. Only the comment is writable; any edit
    /// resets the download marker.
    pub async fn update_file_record(
        db: &DatabaseConnection,
        cache: &ListingCache,
        file: user_file::Model,
        comment: Option<String>,
    ) -> Result<user_file::Model> {
        let mut active: user_file::ActiveModel = file.into();
        if let Some(comment) = comment {
            active.comment = Set(comment);
        }
        active.last_download = Set(None);
        let file = active.update(db).await?;

        cache.invalidate(file.user_id).await;
        Ok(file)
    }

    pub async fn delete_file_record(
        db: &DatabaseConnection,
        cache: &ListingCache,
        storage: &FileStorage,
        file: user_file::Model,
    ) -> Result<()> {
        // Remove the bytes first; a failure is logged and the record
        // goes away regardless
        if let Err(e) = storage.delete_file(&file.stored_location).await {
            tracing::warn!(
                "Failed to delete file from storage: {} - {}",
                file.stored_location,
                e
            );
        }

        UserFile::delete_by_id(file.id).exec(db).await?;
        cache.invalidate(file.user_id).await;

        Ok(())
    }

    /// Stamp a successful download
    pub async fn touch_last_download(
        db: &DatabaseConnection,
        cache: &ListingCache,
        file: user_file::Model,
    ) -> Result<user_file::Model> {
        let user_id = file.user_id;
        let mut active: user_file::ActiveModel = file.into();
        active.last_download = Set(Some(chrono::Utc::now()));
        let file = active.update(db).await?;

        cache.invalidate(user_id).await;
        Ok(file)
    }

    /// Issue a share token, rotating any existing one. The expiry is
    /// set from `expiry_days` when given and cleared otherwise.
    pub async fn enable_share(
        db: &DatabaseConnection,
        cache: &ListingCache,
        file: user_file::Model,
        expiry_days: Option<i64>,
    ) -> Result<user_file::Model> {
        // expiry_days comes from the client, so both the span and the
        // resulting timestamp must be range-checked
        let expiry = match expiry_days {
            Some(days) => Some(
                chrono::Duration::try_days(days)
                    .and_then(|span| chrono::Utc::now().checked_add_signed(span))
                    .ok_or_else(|| {
                        AppError::BadRequest("Share expiry is out of range".to_string())
                    })?,
            ),
            None => None,
        };

        let mut active: user_file::ActiveModel = file.into();
        active.share_token = Set(Some(Uuid::new_v4()));
        active.share_expiry = Set(expiry);
        let file = active.update(db).await?;

        cache.invalidate(file.user_id).await;
        Ok(file)
    }

    /// Revoke a share token
    pub async fn disable_share(
        db: &DatabaseConnection,
        cache: &ListingCache,
        file: user_file::Model,
    ) -> Result<user_file::Model> {
        let mut active: user_file::ActiveModel = file.into();
        active.share_token = Set(None);
        active.share_expiry = Set(None);
        let file = active.update(db).await?;

        cache.invalidate(file.user_id).await;
        Ok(file)
    }

    /// Clear share state on records whose expiry has lapsed. Lapsed
    /// links already refuse downloads; this only scrubs them.
    pub async fn cleanup_expired_shares(
        db: &DatabaseConnection,
        cache: &ListingCache,
    ) -> Result<u64> {
        let now = chrono::Utc::now();

        let lapsed = UserFile::find()
            .filter(user_file::Column::ShareToken.is_not_null())
            .filter(user_file::Column::ShareExpiry.lt(now))
            .all(db)
            .await?;

        if lapsed.is_empty() {
            return Ok(0);
        }

        let result = UserFile::update_many()
            .col_expr(user_file::Column::ShareToken, Expr::value(None::<Uuid>))
            .col_expr(
                user_file::Column::ShareExpiry,
                Expr::value(None::<chrono::DateTime<chrono::Utc>>),
            )
            .filter(user_file::Column::ShareToken.is_not_null())
            .filter(user_file::Column::ShareExpiry.lt(now))
            .exec(db)
            .await?;

        let mut owners: Vec<i32> = lapsed.iter().map(|file| file.user_id).collect();
        owners.sort_unstable();
        owners.dedup();
        for user_id in owners {
            cache.invalidate(user_id).await;
        }

        Ok(result.rows_affected)
    }
}
