use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::{CollaboratorRow, ProjectFileRow, ProjectRow};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Absent fields are left unchanged
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectRow>,
}

/// A project with its files and collaborator roster
#[derive(Serialize, ToSchema)]
pub struct ProjectDetailResponse {
    pub project: ProjectRow,
    pub files: Vec<ProjectFileRow>,
    pub collaborators: Vec<CollaboratorRow>,
}

#[derive(Serialize, ToSchema)]
pub struct ProjectDeleteResponse {
    pub success: bool,
}
