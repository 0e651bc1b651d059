use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Request types
#[derive(Serialize, Deserialize, Clone)]
pub struct UpdateFileRequest {
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ShareRequest {
    pub expiry_days: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub max_storage: Option<i64>,
    pub is_superuser: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListOptions {
    pub user_id: Option<i32>,
}

// Response types
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct FileResponse {
    pub id: i32,
    pub original_name: String,
    pub size: i64,
    pub upload_date: chrono::DateTime<chrono::Utc>,
    pub last_download: Option<chrono::DateTime<chrono::Utc>>,
    pub comment: String,
    pub share_token: Option<Uuid>,
    pub share_expiry: Option<chrono::DateTime<chrono::Utc>>,
    pub owner: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ShareResponse {
    pub id: i32,
    pub share_token: Uuid,
    pub share_expiry: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct StorageUsageResponse {
    pub used: i64,
    pub max_storage: i64,
    pub percent: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub storage_path: String,
    pub max_storage: i64,
    pub is_superuser: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
