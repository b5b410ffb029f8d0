use crate::errors::AppError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::error;

/// Reads a JSON array from `path`. Missing, empty or unparsable files yield
/// an empty collection.
pub async fn load_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(err) => {
                error!("failed to parse {}: {err}", path.display());
                Vec::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            Vec::new()
        }
    }
}

/// Rewrites `path` with the whole collection. The payload goes to a sibling
/// temp file first and is renamed into place.
pub async fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(items).map_err(AppError::storage)?;
    let staging = staging_path(path);
    fs::write(&staging, payload).await.map_err(AppError::storage)?;
    fs::rename(&staging, path).await.map_err(AppError::storage)?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;

    fn unique_path(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("gantt_storage_{label}_{}_{nanos}.json", std::process::id()));
        path
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let items: Vec<TaskType> = load_collection(&unique_path("missing")).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn corrupt_and_blank_files_are_empty() {
        let corrupt = unique_path("corrupt");
        fs::write(&corrupt, b"{ not json").await.unwrap();
        let items: Vec<TaskType> = load_collection(&corrupt).await;
        assert!(items.is_empty());

        let blank = unique_path("blank");
        fs::write(&blank, b"  \n").await.unwrap();
        let items: Vec<TaskType> = load_collection(&blank).await;
        assert!(items.is_empty());

        let _ = fs::remove_file(&corrupt).await;
        let _ = fs::remove_file(&blank).await;
    }

    #[tokio::test]
    async fn saved_collection_loads_back() {
        let path = unique_path("saved");
        let types = vec![TaskType::new("QA", "#00ff00")];
        save_collection(&path, &types).await.unwrap();
        let loaded: Vec<TaskType> = load_collection(&path).await;
        assert_eq!(loaded, types);
        assert!(!staging_path(&path).exists());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let mut path = unique_path("nodir");
        path.push("data.json");
        let err = save_collection::<TaskType>(&path, &[]).await.unwrap_err();
        assert_eq!(err.message, "Failed to save data");
    }
}
