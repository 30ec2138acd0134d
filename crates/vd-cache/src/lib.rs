//! Rendered-content cache.
//!
//! [`ContentCache`] stores one fully rendered page per cache id as a plain
//! `.html` file on disk. The cache id is computed by the caller from
//! everything that influences the rendered output (content version, request
//! variant, visibility flags), so validity reduces to entry-file existence.
//!
//! Two store variants exist behind the same type:
//!
//! - [`CacheStore::File`]: entries live under a directory on disk
//! - [`CacheStore::Disabled`]: every lookup misses and every write is
//!   discarded, for environments where caching is switched off
//!
//! On construction of a file-backed cache, a `VERSION` file in the cache
//! root is validated against the current content version. On mismatch the
//! entire cache directory is wiped and recreated, so entries rendered from
//! a previous content revision are never served.
//!
//! All cache I/O is best effort: failures are logged and degrade to a miss
//! or a dropped write, never to a render failure.

use std::fs;
use std::path::{Path, PathBuf};

use vd_config::CacheConfig;

/// Cache of rendered pages, one entry per cache id.
#[derive(Debug)]
pub struct ContentCache {
    cache_id: String,
    store: CacheStore,
}

/// Backing store of a [`ContentCache`].
#[derive(Debug)]
pub enum CacheStore {
    /// Entries stored as `{dir}/{cache_id}.html` files.
    File {
        /// Cache root directory.
        dir: PathBuf,
    },
    /// No-op store: always misses, never writes.
    Disabled,
}

impl ContentCache {
    /// Create a file-backed cache, validating the cache version.
    ///
    /// If the `VERSION` file inside `dir` does not match `version`, the
    /// entire cache directory is removed and recreated with the new
    /// version. Errors during validation are logged but never fatal.
    #[must_use]
    pub fn persistent(dir: PathBuf, version: &str, cache_id: impl Into<String>) -> Self {
        validate_version(&dir, version);
        Self {
            cache_id: cache_id.into(),
            store: CacheStore::File { dir },
        }
    }

    /// Create a cache that always misses and never writes.
    #[must_use]
    pub fn disabled(cache_id: impl Into<String>) -> Self {
        Self {
            cache_id: cache_id.into(),
            store: CacheStore::Disabled,
        }
    }

    /// Create the cache variant selected by configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig, version: &str, cache_id: impl Into<String>) -> Self {
        if config.enabled {
            Self::persistent(config.dir.clone(), version, cache_id)
        } else {
            Self::disabled(cache_id)
        }
    }

    /// The id this cache reads and writes under.
    #[must_use]
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Whether a cached page exists for the current cache id.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match &self.store {
            CacheStore::File { dir } => entry_path(dir, &self.cache_id).is_file(),
            CacheStore::Disabled => false,
        }
    }

    /// Read the cached page for the current cache id.
    ///
    /// Returns an empty string when the entry is missing or unreadable;
    /// callers are expected to check [`Self::is_valid`] first.
    #[must_use]
    pub fn cached_content(&self) -> String {
        let CacheStore::File { dir } = &self.store else {
            return String::new();
        };
        let path = entry_path(dir, &self.cache_id);
        match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("failed to read cache entry {}: {e}", path.display());
                String::new()
            }
        }
    }

    /// Store a rendered page under the current cache id.
    pub fn cache_content(&self, content: &str) {
        let CacheStore::File { dir } = &self.store else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!("failed to create cache directory {}: {e}", dir.display());
            return;
        }
        let path = entry_path(dir, &self.cache_id);
        if let Err(e) = fs::write(&path, content) {
            tracing::warn!("failed to write cache entry {}: {e}", path.display());
        }
    }

    /// Store a copy of a rendered page under `debug/` for inspection.
    ///
    /// Debug copies are never read back by the cache; they exist so a
    /// developer can diff what was actually served.
    pub fn save_content_for_debug(&self, content: &str) {
        let CacheStore::File { dir } = &self.store else {
            return;
        };
        let debug_dir = dir.join("debug");
        if let Err(e) = fs::create_dir_all(&debug_dir) {
            tracing::warn!(
                "failed to create debug cache directory {}: {e}",
                debug_dir.display()
            );
            return;
        }
        let path = entry_path(&debug_dir, &self.cache_id);
        if let Err(e) = fs::write(&path, content) {
            tracing::warn!("failed to write debug cache entry {}: {e}", path.display());
        }
    }
}

/// Path of the entry file for a cache id.
fn entry_path(dir: &Path, cache_id: &str) -> PathBuf {
    dir.join(format!("{cache_id}.html"))
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::persistent(tmp.path().join("cache"), "1.0", "page_en_full");

        assert!(!cache.is_valid());
        cache.cache_content("<html>hello</html>");
        assert!(cache.is_valid());
        assert_eq!(cache.cached_content(), "<html>hello</html>");
    }

    #[test]
    fn test_entries_keyed_by_cache_id() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");
        let full = ContentCache::persistent(root.clone(), "1.0", "page_full");
        let tabular = ContentCache::persistent(root, "1.0", "page_tabular");

        full.cache_content("full page");
        assert!(full.is_valid());
        assert!(!tabular.is_valid());
        assert_eq!(tabular.cached_content(), "");
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = ContentCache::persistent(tmp.path().join("cache"), "1.0", "page");

        cache.cache_content("first");
        cache.cache_content("second");
        assert_eq!(cache.cached_content(), "second");
    }

    #[test]
    fn test_disabled_cache_never_hits() {
        let cache = ContentCache::disabled("page");

        cache.cache_content("discarded");
        assert!(!cache.is_valid());
        assert_eq!(cache.cached_content(), "");
        assert_eq!(cache.cache_id(), "page");
    }

    #[test]
    fn test_from_config_selects_variant() {
        let tmp = TempDir::new().unwrap();

        let enabled = CacheConfig {
            enabled: true,
            dir: tmp.path().join("cache"),
        };
        let cache = ContentCache::from_config(&enabled, "1.0", "page");
        cache.cache_content("stored");
        assert!(cache.is_valid());

        let disabled = CacheConfig {
            enabled: false,
            dir: tmp.path().join("cache"),
        };
        let cache = ContentCache::from_config(&disabled, "1.0", "page");
        // The disabled variant ignores entries the persistent one wrote.
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_debug_copy_is_separate_from_entry() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");
        let cache = ContentCache::persistent(root.clone(), "1.0", "page");

        cache.save_content_for_debug("debug only");

        // A debug copy is not a cache entry.
        assert!(!cache.is_valid());
        let debug = fs::read_to_string(root.join("debug/page.html")).unwrap();
        assert_eq!(debug, "debug only");
    }

    #[test]
    fn test_version_match_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        let cache = ContentCache::persistent(root.clone(), "1.0", "page");
        cache.cache_content("preserved");

        let cache2 = ContentCache::persistent(root, "1.0", "page");
        assert!(cache2.is_valid());
        assert_eq!(cache2.cached_content(), "preserved");
    }

    #[test]
    fn test_version_mismatch_wipes_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        let cache = ContentCache::persistent(root.clone(), "1.0", "page");
        cache.cache_content("will be wiped");

        let cache2 = ContentCache::persistent(root.clone(), "1.1", "page");
        assert!(!cache2.is_valid());

        let version = fs::read_to_string(root.join("VERSION")).unwrap();
        assert_eq!(version, "1.1");
    }

    #[test]
    fn test_missing_version_file_wipes_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        // A cache directory from before version stamping existed.
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("orphan.html"), "stale").unwrap();

        let cache = ContentCache::persistent(root.clone(), "1.0", "orphan");
        assert!(!cache.is_valid());

        let version = fs::read_to_string(root.join("VERSION")).unwrap();
        assert_eq!(version, "1.0");
    }

    #[test]
    fn test_nonexistent_root_initialized() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("deeply/nested/cache");

        assert!(!root.exists());
        let _cache = ContentCache::persistent(root.clone(), "1.0", "page");

        assert!(root.exists());
        let version = fs::read_to_string(root.join("VERSION")).unwrap();
        assert_eq!(version, "1.0");
    }
}
