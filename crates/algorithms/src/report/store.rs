//! Persistence of analysis results keyed by session id

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;
use tracing::debug;
use verileaf_core::{Error, Result};

use super::result::{AnalysisResult, SessionId};

/// Keyed storage of completed analyses
pub trait ResultStore: Send + Sync {
    /// Store a result under its own session id
    fn persist(&self, result: &AnalysisResult) -> Result<SessionId>;

    /// Fetch a stored result; unknown ids fail with [`Error::SessionNotFound`]
    fn load(&self, id: &SessionId) -> Result<AnalysisResult>;
}

// ---------------------------------------------------------------------------
// JSON files
// ---------------------------------------------------------------------------

/// One pretty-printed `<session_id>.json` file per result in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store for writing, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open a store for reading without touching the filesystem.
    ///
    /// A missing directory behaves as an empty store: every `load` fails
    /// with [`Error::SessionNotFound`].
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl ResultStore for JsonFileStore {
    fn persist(&self, result: &AnalysisResult) -> Result<SessionId> {
        let path = self.path_for(&result.session_id);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(result)?;
        if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path)) {
            // Remove the partial file; the write or rename error is reported
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Stored session {} at {}", result.session_id, path.display());
        Ok(result.session_id.clone())
    }

    fn load(&self, id: &SessionId) -> Result<AnalysisResult> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SessionNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

/// Bounded in-memory store; the least recently used result is evicted first
pub struct MemoryStore {
    inner: Mutex<LruCache<SessionId, AnalysisResult>>,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` results (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<SessionId, AnalysisResult>>> {
        self.inner
            .lock()
            .map_err(|_| Error::Other("result store lock poisoned".to_string()))
    }
}

impl ResultStore for MemoryStore {
    fn persist(&self, result: &AnalysisResult) -> Result<SessionId> {
        self.lock()?.put(result.session_id.clone(), result.clone());
        Ok(result.session_id.clone())
    }

    fn load(&self, id: &SessionId) -> Result<AnalysisResult> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }
}
