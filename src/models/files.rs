use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::ProjectFileRow;

#[derive(Deserialize, ToSchema)]
pub struct FileUpsertRequest {
    pub path: String,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct FileCreateRequest {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct FileDeleteRequest {
    pub path: String,
}

#[derive(Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<ProjectFileRow>,
}

#[derive(Serialize, ToSchema)]
pub struct FileDeleteResponse {
    pub success: bool,
}
