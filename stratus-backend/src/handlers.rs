use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{Response, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::database::{file_ops, user_ops, CreateFileParams, CreateUserParams};
use crate::error::{AppError, Result};
use crate::extractor::AuthUser;
use crate::{
    quota, AppState, CreateUserRequest, FileResponse, ListOptions, ShareRequest, ShareResponse,
    StorageUsageResponse, UpdateFileRequest, UserResponse,
};
use stratus_entity::{user, user_file};

#[derive(Serialize)]
pub struct CleanupResponse {
    pub items_cleaned: u64,
    pub cleanup_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "stratus-backend",
        "timestamp": chrono::Utc::now()
    }))
}

fn user_response(user: user::Model) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        full_name: user.full_name,
        storage_path: user.storage_path,
        max_storage: user.max_storage,
        is_superuser: user.is_superuser,
        created_at: user.created_at,
    }
}

/// Last path segment of a claimed filename, if any
fn claimed_basename(name: &str) -> Option<String> {
    name.rsplit(['/', '\\'])
        .next()
        .map(|basename| basename.trim().to_string())
        .filter(|basename| !basename.is_empty())
}

/// Resolve the user whose data a request addresses. The `user_id`
/// query parameter switches the subject for elevated callers and is
/// ignored for everyone else.
async fn resolve_subject(
    state: &AppState,
    auth: &AuthUser,
    user_id: Option<i32>,
) -> Result<user::Model> {
    match user_id {
        Some(id) if auth.is_elevated() && id != auth.user.id => {
            user_ops::get_user_by_id(&state.db, id)
                .await?
                .ok_or(AppError::UserNotFound)
        }
        _ => Ok(auth.user.clone()),
    }
}

/// Resolve a record's owner for response shaping
async fn resolve_owner(state: &AppState, auth: &AuthUser, owner_id: i32) -> Result<user::Model> {
    if owner_id == auth.user.id {
        Ok(auth.user.clone())
    } else {
        user_ops::get_user_by_id(&state.db, owner_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

// File listing endpoint
pub async fn list_files(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<Vec<FileResponse>>> {
    let subject = resolve_subject(&state, &auth, options.user_id).await?;
    let files = file_ops::list_files_for_user(&state.db, &state.cache, &subject).await?;
    Ok(Json(files))
}

// File upload endpoint
pub async fn upload_file(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut claimed_name: Option<String> = None;
    let mut comment = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                claimed_name = field.file_name().map(|n| n.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read file data".to_string()))?;

                if data.len() > state.config.max_upload_size {
                    return Err(AppError::FileTooLarge);
                }

                file_data = Some(data.to_vec());
            }
            "comment" => {
                comment = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read comment".to_string()))?;
            }
            _ => {
                // Skip unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("No file was uploaded".to_string()))?;
    let original_name = claimed_name
        .as_deref()
        .and_then(claimed_basename)
        .ok_or_else(|| AppError::BadRequest("No file was uploaded".to_string()))?;

    let size = file_data.len() as i64;

    // Uploads for one user serialize here: the admission check and the
    // write below must see each other's effects
    let lock = state.upload_locks.for_user(auth.user.id);
    let _guard = lock.lock().await;

    if !quota::admit(&state.db, &auth.user, size).await {
        return Err(AppError::QuotaExceeded(state.config.admin_contact.clone()));
    }

    let stored_location = state
        .storage
        .store_file(&auth.user.storage_path, &original_name, &file_data)
        .await?;

    let record = match file_ops::create_file_record(
        &state.db,
        &state.cache,
        CreateFileParams {
            user_id: auth.user.id,
            original_name,
            stored_location: stored_location.clone(),
            size,
            comment,
        },
    )
    .await
    {
        Ok(record) => record,
        Err(e) => {
            // Do not leave bytes behind that no record accounts for
            if let Err(cleanup_err) = state.storage.delete_file(&stored_location).await {
                tracing::warn!(
                    "Failed to remove stored bytes after insert failure: {} - {}",
                    stored_location,
                    cleanup_err
                );
            }
            return Err(e);
        }
    };

    tracing::info!(
        "📁 File uploaded: {} ({} bytes) for user {}",
        record.original_name,
        record.size,
        auth.user.username
    );

    Ok((
        StatusCode::CREATED,
        Json(file_ops::file_response(record, &auth.user.username)),
    ))
}

// File metadata endpoint
pub async fn get_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<Json<FileResponse>> {
    let file = file_ops::get_file_for(&state.db, file_id, &auth.user).await?;
    let owner = resolve_owner(&state, &auth, file.user_id).await?;
    Ok(Json(file_ops::file_response(file, &owner.username)))
}

// Metadata edit endpoint
pub async fn update_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
    Json(request): Json<UpdateFileRequest>,
) -> Result<Json<FileResponse>> {
    let file = file_ops::get_file_for(&state.db, file_id, &auth.user).await?;
    let file = file_ops::update_file_record(&state.db, &state.cache, file, request.comment).await?;
    let owner = resolve_owner(&state, &auth, file.user_id).await?;
    Ok(Json(file_ops::file_response(file, &owner.username)))
}

// File deletion endpoint
pub async fn delete_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<StatusCode> {
    let file = file_ops::get_file_for(&state.db, file_id, &auth.user).await?;
    file_ops::delete_file_record(&state.db, &state.cache, &state.storage, file).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Authenticated download endpoint
pub async fn download_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<Response<Body>> {
    let file = file_ops::get_file_for(&state.db, file_id, &auth.user).await?;

    let handle = state.storage.open_file(&file.stored_location).await?;
    let file = file_ops::touch_last_download(&state.db, &state.cache, file).await?;

    tracing::info!(
        "📥 File downloaded: {} by {}",
        file.original_name,
        auth.user.username
    );

    stream_response(&file, handle)
}

// Anonymous download endpoint, reached through a share token
pub async fn shared_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response<Body>> {
    // A token that does not even parse reads the same as an unknown one
    let token = token.parse::<Uuid>().map_err(|_| AppError::FileNotFound)?;

    let file = file_ops::get_file_by_share_token(&state.db, token)
        .await?
        .ok_or(AppError::FileNotFound)?;

    if file.is_share_expired() {
        return Err(AppError::ShareLinkExpired);
    }

    let handle = state.storage.open_file(&file.stored_location).await?;
    let file = file_ops::touch_last_download(&state.db, &state.cache, file).await?;

    tracing::info!("📥 File downloaded via share link: {}", file.original_name);

    stream_response(&file, handle)
}

/// Build the attachment response streaming the stored bytes
fn stream_response(file: &user_file::Model, handle: tokio::fs::File) -> Result<Response<Body>> {
    // Sanitize filename for the Content-Disposition header
    let sanitized_filename = file
        .original_name
        .replace('\"', "\\\"")
        .replace(['\n', '\r'], " ");

    let stream = ReaderStream::new(handle);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/octet-stream")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", sanitized_filename),
        )
        .header("Content-Length", file.size.to_string())
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::ServerError(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

// Share endpoint: issues a fresh token each call, owner only. Lookups
// answer NotFound for everyone else, the same as an unknown id.
pub async fn share_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>> {
    let file = file_ops::get_file_by_id(&state.db, file_id)
        .await?
        .filter(|file| file.user_id == auth.user.id)
        .ok_or(AppError::FileNotFound)?;

    let file = file_ops::enable_share(&state.db, &state.cache, file, request.expiry_days).await?;

    let share_token = file
        .share_token
        .ok_or_else(|| AppError::ServerError("Share token missing after update".to_string()))?;

    tracing::info!("🔗 Share link issued for file {}", file.id);

    Ok(Json(ShareResponse {
        id: file.id,
        share_token,
        share_expiry: file.share_expiry,
    }))
}

// Share revocation endpoint, owner only
pub async fn unshare_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<StatusCode> {
    let file = file_ops::get_file_by_id(&state.db, file_id)
        .await?
        .filter(|file| file.user_id == auth.user.id)
        .ok_or(AppError::FileNotFound)?;

    file_ops::disable_share(&state.db, &state.cache, file).await?;

    tracing::info!("🔗 Share link revoked for file {}", file_id);

    Ok(StatusCode::NO_CONTENT)
}

// Storage usage endpoint
pub async fn storage_usage(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<StorageUsageResponse>> {
    let subject = resolve_subject(&state, &auth, options.user_id).await?;
    let used = quota::usage(&state.db, subject.id).await;

    Ok(Json(StorageUsageResponse {
        used,
        max_storage: subject.max_storage,
        percent: quota::usage_percent(used, subject.max_storage),
    }))
}

// Caller profile endpoint
pub async fn current_user(auth: AuthUser) -> Json<UserResponse> {
    Json(user_response(auth.user))
}

// User listing endpoint, elevated only
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>> {
    auth.require_elevated()?;
    let users = user_ops::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(user_response).collect()))
}

// User provisioning endpoint, elevated only
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    auth.require_elevated()?;

    let user = user_ops::create_user(
        &state.db,
        &state.config,
        CreateUserParams {
            username: request.username,
            email: request.email,
            full_name: request.full_name,
            max_storage: request.max_storage,
            is_superuser: request.is_superuser.unwrap_or(false),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user_response(user))))
}

// User removal endpoint, elevated only
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode> {
    auth.require_elevated()?;
    user_ops::delete_user(&state.db, &state.storage, &state.cache, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Expired share scrub endpoint, elevated only
pub async fn cleanup_expired_shares(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>> {
    auth.require_elevated()?;

    tracing::info!("🧹 Starting cleanup of expired share links");

    let cleaned_count = file_ops::cleanup_expired_shares(&state.db, &state.cache).await?;

    tracing::info!("✅ Cleaned up {} expired share links", cleaned_count);

    Ok(Json(CleanupResponse {
        items_cleaned: cleaned_count,
        cleanup_type: "expired_shares".to_string(),
        timestamp: chrono::Utc::now(),
    }))
}
