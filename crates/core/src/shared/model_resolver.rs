use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// A named model file and where to fetch it when no local copy exists.
#[derive(Clone, Copy, Debug)]
pub struct ModelSpec {
    pub name: &'static str,
    pub url: &'static str,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model in the platform cache directory.
///
/// Resolution order: cache directory, then `bundled_dir`, then download
/// into the cache.
pub fn resolve(
    spec: ModelSpec,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, spec, bundled_dir, progress)
}

/// Same as [`resolve`] with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    spec: ModelSpec,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(spec.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled_path) = bundled_dir.map(|dir| dir.join(spec.name)) {
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", spec.name, spec.url);
    download(spec.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/EmotionMirror/models/`
/// - Linux: `$XDG_CACHE_HOME/EmotionMirror/models/` or `~/.cache/EmotionMirror/models/`
/// - Windows: `%LOCALAPPDATA%/EmotionMirror/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("EmotionMirror").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = stream_to(url, &temp_path, progress).and_then(|()| {
        fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source: e,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn stream_to(
    url: &str,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SPEC: ModelSpec = ModelSpec {
        name: "test_model.onnx",
        url: "http://invalid.nonexistent.example.com/model.onnx",
    };

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join(SPEC.name);
        fs::write(&cached, b"cached").unwrap();

        let resolved = resolve_in(tmp.path(), SPEC, None, None).unwrap();

        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&bundled_dir).unwrap();
        fs::write(bundled_dir.join(SPEC.name), b"bundled").unwrap();

        let resolved = resolve_in(&cache_dir, SPEC, Some(&bundled_dir), None).unwrap();

        assert_eq!(resolved, bundled_dir.join(SPEC.name));
        assert_eq!(fs::read(resolved).unwrap(), b"bundled");
    }

    #[test]
    fn test_model_cache_dir_is_app_scoped() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("EmotionMirror"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_failed_download_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(tmp.path(), SPEC, None, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!tmp.path().join(SPEC.name).exists());
        assert!(!tmp.path().join("test_model.part").exists());
    }
}
