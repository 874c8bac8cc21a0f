use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::storage::TokenStorage;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token storage backed by a JSON map file in the cache directory.
///
/// Every write rewrites the whole file through a temp file + rename, so a
/// crash mid-write never leaves a truncated session behind. The file is
/// created with 0600 permissions on unix since it holds bearer tokens.
pub struct FileTokenStorage {
    cache_dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileTokenStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            write_lock: Mutex::new(()),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create {}", self.cache_dir.display()))?;
        write_atomic(&self.session_path(), values)
    }

    /// Read-modify-write. An unparseable file is replaced rather than
    /// blocking every later write.
    fn modify(&self, f: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Session file lock poisoned"))?;
        let (mut values, corrupt) = match self.load() {
            Ok(values) => (values, false),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(error = %e, "Discarding unreadable session file");
                (HashMap::new(), true)
            }
            Err(e) => return Err(e),
        };
        if f(&mut values) || corrupt {
            self.save(&values)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|values| values.remove(key).is_some())
    }
}

fn write_atomic(path: &Path, values: &HashMap<String, String>) -> Result<()> {
    let contents = serde_json::to_string_pretty(values)?;
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Session path has no parent directory"))?;
    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, contents).context("Failed to write temp session file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set session file permissions")?;
    }

    std::fs::rename(&tmp_path, path).context("Failed to replace session file")?;
    debug!(path = %path.display(), "Session file written");
    Ok(())
}
