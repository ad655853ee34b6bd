use chrono::Utc;
use tracing::{debug, warn};

use crate::db::{CollabStore, StoreError};
use crate::models::ProjectFileRow;

/// Reject paths that cannot name a file inside a project
pub fn validate_file_path(path: &str) -> Result<(), String> {
    if path.trim().is_empty() {
        return Err("File path is required".to_string());
    }
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(format!("Invalid file path '{}'", path));
    }
    if path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(format!("Invalid file path '{}'", path));
    }
    Ok(())
}

/// Replace the whole content of a file, creating it when missing, then bump
/// the project's modification time.
///
/// Last write wins: concurrent writers to one path are neither merged nor
/// serialized. A failed timestamp bump fails the whole save, so callers never
/// announce an edit whose project record is stale.
pub async fn save_file(
    store: &dyn CollabStore,
    project_id: &str,
    path: &str,
    content: &str,
) -> Result<ProjectFileRow, StoreError> {
    let file = store.upsert_file(project_id, path, content).await?;
    debug!("Saved '{}' in project {} ({} bytes)", path, project_id, file.size);

    if let Err(e) = store.touch_project(project_id, Utc::now()).await {
        warn!("Saved '{}' but could not update modification time of project {}: {}", path, project_id, e);
        return Err(e);
    }
    Ok(file)
}
