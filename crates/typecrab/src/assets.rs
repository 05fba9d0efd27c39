use crate::resolver::AssetResolver;
use crate::transport::Upstream;
use async_std::fs;
use async_std::path::Path as AsyncPath;
use fontbundle_core::{CacheKey, FontError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An asset present in the on-disk cache.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub key: CacheKey,
    pub path: PathBuf,
    /// Whether this call fetched the asset rather than finding it cached.
    pub filled: bool,
}

impl CachedAsset {
    pub async fn read(&self) -> Result<Vec<u8>> {
        fs::read(AsyncPath::new(&self.path))
            .await
            .map_err(|e| FontError::cache_write(&self.path, e))
    }
}

/// Disk-backed, write-once-per-key asset store.
///
/// Layout is `<root>/<Family-Slug>/<Family-Slug>-<weight>.<ext>`; a file's
/// existence is the only metadata. Entries are never evicted or refreshed.
#[derive(Clone)]
pub struct AssetCache {
    root: PathBuf,
    resolver: AssetResolver,
    upstream: Arc<dyn Upstream>,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>, resolver: AssetResolver, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            root: root.into(),
            resolver,
            upstream,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Returns the cached asset for `key`, resolving and fetching it first on
    /// a miss. Resolution and fetch errors pass through unchanged.
    pub async fn get(&self, key: &CacheKey) -> Result<CachedAsset> {
        let path = self.path_for(key);
        if is_file(&path).await {
            log::debug!("Cache hit for {}", key.entry_name());
            return Ok(CachedAsset {
                key: key.clone(),
                path,
                filled: false,
            });
        }

        let location = self
            .resolver
            .resolve(&key.family, key.weight, key.format)
            .await?;
        let bytes = self
            .upstream
            .fetch_bytes(&location)
            .await
            .map_err(|e| FontError::upstream(location.as_str(), e))?;
        if bytes.is_empty() {
            return Err(FontError::upstream(location, "empty asset body"));
        }

        publish(&path, &bytes).await?;
        log::info!("Cached {} ({} bytes)", key.entry_name(), bytes.len());

        Ok(CachedAsset {
            key: key.clone(),
            path,
            filled: true,
        })
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(AsyncPath::new(path))
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Writes `bytes` to a unique temporary file beside `path`, then renames it
/// into place. Concurrent fills of one key each publish identical bytes, so
/// the last rename wins and readers never observe a partial file.
async fn publish(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| FontError::cache_write(path, std::io::Error::other("no parent directory")))?;
    fs::create_dir_all(AsyncPath::new(parent))
        .await
        .map_err(|e| FontError::cache_write(parent, e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    fs::write(AsyncPath::new(&tmp_path), bytes)
        .await
        .map_err(|e| FontError::cache_write(&tmp_path, e))?;

    if let Err(e) = fs::rename(AsyncPath::new(&tmp_path), AsyncPath::new(path)).await {
        let _ = fs::remove_file(AsyncPath::new(&tmp_path)).await;
        // Platforms that refuse to replace an existing file: another fill won.
        if !is_file(path).await {
            return Err(FontError::cache_write(path, e));
        }
    }
    Ok(())
}
