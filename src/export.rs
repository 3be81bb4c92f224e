use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Writes `bytes` into `dir` under `file_name`, never replacing an existing
/// file: `data.csv` becomes `data (1).csv`, `data (2).csv`, ...
pub async fn save_download(dir: &Path, file_name: &str, bytes: Vec<u8>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create download directory {}", dir.display()))?;

    let path = available_path(dir, file_name).await;
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "download saved");
    Ok(path)
}

async fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !exists(&candidate).await {
        return candidate;
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    let mut n = 1;
    loop {
        let name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_into_fresh_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("downloads");

        let path = save_download(&dir, "data.csv", b"A,B\n1,2".to_vec()).await.unwrap();

        assert_eq!(path, dir.join("data.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A,B\n1,2");
    }

    #[tokio::test]
    async fn collisions_get_a_numbered_suffix() {
        let tmp = tempfile::tempdir().unwrap();

        let first = save_download(tmp.path(), "chart.png", vec![1]).await.unwrap();
        let second = save_download(tmp.path(), "chart.png", vec![2]).await.unwrap();
        let third = save_download(tmp.path(), "chart.png", vec![3]).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "chart.png");
        assert_eq!(second.file_name().unwrap(), "chart (1).png");
        assert_eq!(third.file_name().unwrap(), "chart (2).png");
        assert_eq!(std::fs::read(&first).unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn names_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        save_download(tmp.path(), "notes", vec![]).await.unwrap();
        let second = save_download(tmp.path(), "notes", vec![]).await.unwrap();
        assert_eq!(second.file_name().unwrap(), "notes (1)");
    }
}
