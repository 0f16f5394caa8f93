use crate::error::WindAtlasError;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "wind_atlas_cache";

pub fn get_cache_dir() -> Result<PathBuf, WindAtlasError> {
    dirs::cache_dir()
        .ok_or(WindAtlasError::CacheDirResolution)
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> Result<(), WindAtlasError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(WindAtlasError::CacheDirCreation(
                    path.to_path_buf(),
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "cache path exists but is not a directory",
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| WindAtlasError::CacheDirCreation(path.to_path_buf(), e)),
        Err(e) => Err(WindAtlasError::CacheDirCreation(path.to_path_buf(), e)),
    }
}
