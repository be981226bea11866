use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found at {0}")]
    Missing(PathBuf),
    #[error("model '{name}' not found in cache ({cache}) or bundled directory")]
    NotFound { name: String, cache: String },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit path (must exist)
/// 2. User cache directory (platform-specific)
/// 3. Bundled path (for development / pre-packaged installs)
pub fn resolve(
    name: &str,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }

    let cache_dir = model_cache_dir();
    if let Ok(ref dir) = cache_dir {
        let cached_path = dir.join(name);
        if cached_path.exists() {
            return Ok(cached_path);
        }
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        cache: cache_dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| "<none>".into()),
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/genreshift/models/`
/// - Linux: `$XDG_CACHE_HOME/genreshift/models/` or `~/.cache/genreshift/models/`
/// - Windows: `%LOCALAPPDATA%/genreshift/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_returned_when_present() {
        let tmp = TempDir::new().unwrap();
        let model_path = tmp.path().join("model.onnx");
        fs::write(&model_path, b"fake model data").unwrap();

        let resolved = resolve("model.onnx", Some(&model_path), None).unwrap();
        assert_eq!(resolved, model_path);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.onnx");
        let err = resolve("absent.onnx", Some(&missing), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == missing));
    }

    #[test]
    fn test_bundled_file_found() {
        let tmp = TempDir::new().unwrap();
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&bundled_dir).unwrap();
        // Unique name so a real cache entry cannot shadow it.
        let name = "genreshift_test_bundled_model_7f3a.onnx";
        fs::write(bundled_dir.join(name), b"bundled model").unwrap();

        let resolved = resolve(name, None, Some(&bundled_dir)).unwrap();
        assert_eq!(resolved, bundled_dir.join(name));
    }

    #[test]
    fn test_not_found_anywhere() {
        let tmp = TempDir::new().unwrap();
        let err = resolve("genreshift_no_such_model_91c2.onnx", None, Some(tmp.path()))
            .unwrap_err();
        assert!(matches!(err, ModelResolveError::NotFound { .. }));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("genreshift"));
        assert!(path.to_string_lossy().contains("models"));
    }
}
