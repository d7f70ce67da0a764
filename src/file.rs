use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::{env, fs};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec};
use crate::error::RepoError;
use crate::traits::{Identifiable, Repo};

/// Bytes escaped when an identifier becomes a filename component: everything
/// except ASCII alphanumerics and `- _ . ~`. In particular `%`, `/` and `\`
/// are always escaped, which keeps the id → filename mapping injective and
/// invertible via percent-decoding.
const FILENAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Construction parameters for [`FileRepo`].
#[derive(Debug, Clone)]
pub struct FileOptions {
    directory: PathBuf,
    extension: String,
}

impl FileOptions {
    /// Build options rooted at `dir`, resolving a relative path against the
    /// current working directory. `ext` is an optional filename extension
    /// (`""` for none; a leading dot is accepted and normalized away).
    pub fn new(dir: impl AsRef<Path>, ext: &str) -> Result<Self, RepoError> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(RepoError::Storage("directory cannot be empty".into()));
        }

        let directory = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| RepoError::Storage(e.to_string()))?
                .join(dir)
        };

        Ok(Self {
            directory,
            extension: ext.trim_start_matches('.').to_string(),
        })
    }

    /// The absolute root directory entities are stored under.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// FileRepo is a [`Repo`] implementation storing one file per entity directly
/// under a root directory: `{directory}/{percent_escape(id)}.{extension}`.
///
/// The filesystem gives no per-key isolation, so FileRepo synthesizes it from
/// a lock table: a mutex-guarded map of identifier → `Arc<RwLock<()>>`. The
/// table mutex is held only for the lookup-or-insert of a key's lock, never
/// across file I/O, so operations on distinct identifiers never contend.
/// A key's lock is created on first access and kept until [`Repo::close`] —
/// the table only grows, which is an accepted trade-off for bounded
/// identifier cardinality.
///
/// Writes overwrite in place (create-or-truncate, no temp-file rename); a
/// crash mid-write can leave a truncated file. Reads of a key are only
/// blocked by an in-flight write of the same key.
pub struct FileRepo<T, C = JsonCodec<T>> {
    // Guards creation of per-key locks, never file I/O.
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,

    opts: FileOptions,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FileRepo<T, JsonCodec<T>>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    /// Open a repository at `opts.directory()` with the default JSON codec.
    /// The directory is created with owner-only permissions if absent.
    pub fn new(opts: FileOptions) -> Result<Self, RepoError> {
        Self::with_codec(opts, JsonCodec::new())
    }
}

impl<T, C> FileRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    /// Open a repository with an explicit codec.
    pub fn with_codec(opts: FileOptions, codec: C) -> Result<Self, RepoError> {
        create_root(&opts.directory)?;
        debug!("FileRepo: opened at {:?}", opts.directory);

        Ok(Self {
            locks: Mutex::new(HashMap::new()),
            opts,
            codec,
            _marker: PhantomData,
        })
    }

    /// Return the per-key lock for `id`, creating it on first access.
    ///
    /// The table mutex makes lookup-or-insert atomic: no two callers can end
    /// up holding different lock objects for the same identifier. It is
    /// released before the caller takes the per-key lock itself.
    fn lock_for(&self, id: &str) -> Arc<RwLock<()>> {
        let mut table = self.locks.lock().unwrap();
        table.entry(id.to_string()).or_default().clone()
    }

    fn key_path(&self, id: &str) -> PathBuf {
        let mut filename = utf8_percent_encode(id, FILENAME_SET).to_string();
        if !self.opts.extension.is_empty() {
            filename.push('.');
            filename.push_str(&self.opts.extension);
        }
        self.opts.directory.join(filename)
    }

    /// Strip the configured extension from a filename via exact suffix match.
    /// Returns None if the extension is configured but missing.
    fn strip_extension<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.opts.extension.is_empty() {
            return Some(name);
        }
        name.strip_suffix(self.opts.extension.as_str())
            .and_then(|s| s.strip_suffix('.'))
    }

    /// List stored identifiers from the root directory's direct entries.
    ///
    /// The namespace is flat: subdirectories are skipped entirely, never
    /// descended into. Filenames that don't carry the configured extension
    /// or don't percent-decode are not ours and are skipped with a warning.
    fn list_ids(&self) -> Result<Vec<String>, RepoError> {
        let entries = fs::read_dir(&self.opts.directory)
            .map_err(|e| RepoError::Storage(e.to_string()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepoError::Storage(e.to_string()))?;
            let file_type = entry
                .file_type()
                .map_err(|e| RepoError::Storage(e.to_string()))?;
            if file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!("FileRepo: skipping non-UTF-8 filename {:?}", name);
                continue;
            };
            let Some(stem) = self.strip_extension(name) else {
                continue;
            };

            match percent_decode_str(stem).decode_utf8() {
                Ok(id) => ids.push(id.into_owned()),
                Err(_) => {
                    warn!("FileRepo: skipping undecodable filename {:?}", name);
                }
            }
        }

        Ok(ids)
    }
}

impl<T, C> Repo<T> for FileRepo<T, C>
where
    T: Identifiable,
    C: Codec<T>,
{
    fn get(&self, id: &str) -> Result<Option<T>, RepoError> {
        let path = self.key_path(id);
        let lock = self.lock_for(id);

        let data = {
            let _guard = lock.read().unwrap();
            fs::read(&path)
        };

        let data = match data {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepoError::Storage(e.to_string())),
        };

        Ok(Some(self.codec.decode(&data)?))
    }

    fn get_all(&self) -> Result<Vec<T>, RepoError> {
        let ids = self.list_ids()?;

        let mut all = Vec::with_capacity(ids.len());
        for id in ids {
            // A key listed but gone by read time was removed concurrently;
            // skip it rather than failing the whole call. Decode errors
            // still abort.
            match self.get(&id)? {
                Some(entry) => all.push(entry),
                None => continue,
            }
        }

        Ok(all)
    }

    fn count(&self) -> Result<u64, RepoError> {
        Ok(self.list_ids()?.len() as u64)
    }

    fn add(&self, entry: &T) -> Result<(), RepoError> {
        let id = entry.id();
        if id.is_empty() {
            return Err(RepoError::EmptyId);
        }

        let data = self.codec.encode(entry)?;
        let path = self.key_path(id);
        let lock = self.lock_for(id);

        let _guard = lock.write().unwrap();
        write_entry(&path, &data)
    }

    fn remove(&self, id: &str) -> Result<(), RepoError> {
        let path = self.key_path(id);
        let lock = self.lock_for(id);

        let _guard = lock.write().unwrap();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepoError::Storage(e.to_string())),
        }
    }

    fn close(&self) -> Result<(), RepoError> {
        self.locks.lock().unwrap().clear();
        Ok(())
    }
}

/// Create the root directory if absent, owner-only on Unix.
fn create_root(dir: &Path) -> Result<(), RepoError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(|e| RepoError::Storage(e.to_string()))
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir).map_err(|e| RepoError::Storage(e.to_string()))
    }
}

/// Write the full encoded record, create-or-truncate, owner-only on Unix.
/// Overwrites in place; no temp-file-and-rename step.
fn write_entry(path: &Path, data: &[u8]) -> Result<(), RepoError> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        file.write_all(data)
            .map_err(|e| RepoError::Storage(e.to_string()))
    }
    #[cfg(not(unix))]
    {
        fs::write(path, data).map_err(|e| RepoError::Storage(e.to_string()))
    }
}
