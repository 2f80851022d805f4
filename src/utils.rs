use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "weather_survey_cache";

pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("Creating directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Creates the parent directory of `file` if it has one.
pub async fn ensure_parent_exists(file: &Path) -> io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_dir_exists_creates_nested() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");
        ensure_dir_exists(&nested).await?;
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir_exists(&nested).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_dir_exists_rejects_file() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("plain.txt");
        tokio::fs::write(&file, b"x").await?;
        assert!(ensure_dir_exists(&file).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_parent_exists_without_parent() -> io::Result<()> {
        ensure_parent_exists(Path::new("cities.csv")).await
    }
}
