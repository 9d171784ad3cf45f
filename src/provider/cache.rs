// Read-through disk cache for timing API responses

use crate::errors::OvercutError;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

// Normalized URLs can collide ('>' and '<' both map to '_'), so every file
// name carries a fingerprint of the full URL as well.
const MAX_NAME_PREFIX_LEN: usize = 96;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// On-disk cache of raw timing API response bodies, keyed by request URL.
///
/// Responses never change once published, so entries are kept forever. An
/// in-memory map fronts the files to avoid re-reading bodies that were
/// already touched in this run. Writes go through a unique temporary file
/// followed by a rename, so two fetch workers storing the same URL at the
/// same time cannot interleave their bytes.
pub struct ResponseCache {
    /// Base directory for cached response files
    cache_path: PathBuf,
    /// In-memory front for bodies already read or written in this run
    mem: Mutex<HashMap<String, String>>,
    /// Sequence number for unique temporary file names
    temp_seq: AtomicU64,
}

impl ResponseCache {
    /// Create a cache rooted at the given directory, creating it if needed.
    pub fn new(cache_path: PathBuf) -> Result<Self, OvercutError> {
        if !cache_path.exists() {
            fs::create_dir_all(&cache_path).map_err(|e| OvercutError::CacheDir {
                path: cache_path.display().to_string(),
                source: e,
            })?;
        }

        Ok(Self {
            cache_path,
            mem: Mutex::new(HashMap::new()),
            temp_seq: AtomicU64::new(0),
        })
    }

    /// Look up the cached body for a URL. Disk errors are treated as a miss.
    pub fn lookup(&self, url: &str) -> Option<String> {
        if let Ok(mem) = self.mem.lock()
            && let Some(body) = mem.get(url)
        {
            return Some(body.clone());
        }

        let file_path = self.file_path_for(url);
        if !file_path.exists() {
            return None;
        }

        match fs::read_to_string(&file_path) {
            Ok(body) => {
                debug!("Cache hit for {} at {:?}", url, file_path);
                if let Ok(mut mem) = self.mem.lock() {
                    mem.insert(url.to_string(), body.clone());
                }
                Some(body)
            }
            Err(e) => {
                warn!("Could not read cached response {:?}: {}", file_path, e);
                None
            }
        }
    }

    /// Store a response body for a URL.
    pub fn store(&self, url: &str, body: &str) -> Result<(), OvercutError> {
        let file_path = self.file_path_for(url);
        let temp_path = self.cache_path.join(format!(
            "{}.{}.tmp",
            std::process::id(),
            self.temp_seq.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&temp_path, body).map_err(|e| OvercutError::CacheWrite {
            path: temp_path.display().to_string(),
            source: e,
        })?;

        fs::rename(&temp_path, &file_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            OvercutError::CacheWrite {
                path: file_path.display().to_string(),
                source: e,
            }
        })?;

        if let Ok(mut mem) = self.mem.lock() {
            mem.insert(url.to_string(), body.to_string());
        }

        Ok(())
    }

    /// Get the cache directory path
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Generate the file path for a given request URL
    fn file_path_for(&self, url: &str) -> PathBuf {
        let filename = format!(
            "{}.{:016x}.json",
            Self::normalize_url(url),
            Self::fingerprint(url)
        );
        self.cache_path.join(filename)
    }

    /// Normalize a URL for consistent, filesystem-safe file naming
    fn normalize_url(url: &str) -> String {
        let normalized: String = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();

        normalized.chars().take(MAX_NAME_PREFIX_LEN).collect()
    }

    // FNV-1a, stable across runs so cache files survive restarts.
    fn fingerprint(url: &str) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        for byte in url.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }
}
