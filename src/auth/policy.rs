use axum::http::StatusCode;
use tracing::error;

use crate::auth::AuthUser;
use crate::db::{CollabStore, StoreError};
use crate::models::{api_error, ApiError, ProjectRow, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
}

/// Decide access from the persisted facts about one user and one project.
///
/// Owners may do anything. Any collaboration role grants read; only
/// `OWNER` and `EDITOR` roles grant write.
pub fn evaluate(project: &ProjectRow, user_id: &str, role: Option<Role>, capability: Capability) -> bool {
    if project.owner_id == user_id {
        return true;
    }
    match (capability, role) {
        (Capability::Read, Some(_)) => true,
        (Capability::Write, Some(role)) => role.can_write(),
        (_, None) => false,
    }
}

/// Check a capability against the store. Always reads fresh rows so a role
/// change applies to the very next event of an already joined session.
/// A missing project is a denial, not an error.
pub async fn can_access(
    store: &dyn CollabStore,
    user_id: &str,
    project_id: &str,
    capability: Capability,
) -> Result<bool, StoreError> {
    let project = match store.find_project(project_id).await? {
        Some(project) => project,
        None => return Ok(false),
    };
    if project.owner_id == user_id {
        return Ok(true);
    }
    let role = store.find_collaboration_role(project_id, user_id).await?;
    Ok(evaluate(&project, user_id, role, capability))
}

/// REST guard around [`can_access`]
pub async fn ensure_access(
    store: &dyn CollabStore,
    user: &AuthUser,
    project_id: &str,
    capability: Capability,
) -> Result<(), ApiError> {
    match can_access(store, &user.id, project_id, capability).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            "Project not found or insufficient permissions",
        )),
        Err(e) => {
            error!("Access check for project {} failed: {}", project_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to check project access"))
        }
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin {
        return Ok(());
    }
    Err(api_error(StatusCode::FORBIDDEN, "Admin access required"))
}
