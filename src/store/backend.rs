//! Container backends.
//!
//! A [`ContainerBackend`] is a hierarchical key/value store with an
//! attribute side channel: every entry holds payload bytes plus a
//! JSON-serializable attribute mapping addressed by the same key. The
//! trait requires atomic per-key writes (payload and attributes land
//! together or not at all) and child enumeration so the index can be
//! re-derived purely from the container's layout.
//!
//! Two implementations ship with the crate:
//!
//! - [`DirectoryBackend`]: production backend mapping key segments to
//!   directories, with writes staged through temporary files and committed
//!   by rename. Cross-process exclusion comes from an advisory `flock` on a
//!   lock file at the container root.
//! - [`MemoryBackend`]: in-memory backend for tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;


use super::error::StorageError;
use crate::payload::Mapping;

/// Payload file name inside an entry directory.
const PAYLOAD_FILE: &str = "payload.bin";
/// Attribute sidecar file name inside an entry directory.
const ATTRS_FILE: &str = "attrs.json";
/// Prefix of staging directories awaiting commit.
const STAGING_PREFIX: &str = ".staging-";
/// Advisory lock file at the container root.
const LOCK_FILE: &str = ".lock";

/// Whether a child of a group is itself a group or a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// An intermediate group with further children.
    Group,
    /// A leaf entry holding payload and attributes.
    Entry,
}

/// One immediate child of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// The child's segment name.
    pub name: String,
    /// Group or entry.
    pub kind: ChildKind,
}

/// Guard for a container-wide advisory lock, released on drop.
pub trait BackendLock: Send {}

/// Hierarchical key/value container with an attribute side channel.
///
/// Keys are `/`-separated segment paths produced by the key codec. The
/// backend stores them opaquely; it neither parses nor invents keys.
pub trait ContainerBackend: Send + Sync {
    /// Try to acquire the container-wide advisory lock without blocking.
    ///
    /// `Ok(None)` means another handle currently holds a conflicting lock.
    /// Backends whose medium is reachable from other processes must ground
    /// this in an OS-level lock; purely in-process backends may hand out a
    /// no-op guard.
    fn try_lock(&self, exclusive: bool) -> Result<Option<Box<dyn BackendLock>>, StorageError>;

    /// Atomically write an entry: payload bytes and attributes land as one
    /// unit, replacing any previous entry at the key.
    fn write_entry(&self, key: &str, payload: &[u8], attrs: &Mapping) -> Result<(), StorageError>;

    /// Read an entry's payload bytes. `None` when no entry exists.
    fn read_payload(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Read an entry's attribute mapping. `None` when no entry exists.
    fn read_attrs(&self, key: &str) -> Result<Option<Mapping>, StorageError>;

    /// Replace an existing entry's attribute mapping.
    fn write_attrs(&self, key: &str, attrs: &Mapping) -> Result<(), StorageError>;

    /// Remove an entry and its attributes. Returns whether one existed.
    fn remove_entry(&self, key: &str) -> Result<bool, StorageError>;

    /// List the immediate children of a group. The empty string names the
    /// root group.
    fn list_children(&self, group: &str) -> Result<Vec<Child>, StorageError>;
}

/// Enumerate every entry key in a container, depth first, in sorted order.
pub fn enumerate_entry_keys<B: ContainerBackend + ?Sized>(
    backend: &B,
) -> Result<Vec<String>, StorageError> {
    let mut keys = Vec::new();
    let mut pending = vec![String::new()];
    while let Some(group) = pending.pop() {
        for child in backend.list_children(&group)? {
            let key = if group.is_empty() {
                child.name
            } else {
                format!("{group}/{}", child.name)
            };
            match child.kind {
                ChildKind::Entry => keys.push(key),
                ChildKind::Group => pending.push(key),
            }
        }
    }
    keys.sort();
    Ok(keys)
}

/// Filesystem-backed container: one directory per key segment, payload and
/// attribute files inside the leaf directory.
#[derive(Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    /// Open (or create) a container rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(DirectoryBackend { root })
    }

    /// The container's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.split('/').any(|segment| {
                segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
            })
        {
            return Err(StorageError::Corrupt {
                key: key.to_owned(),
                reason: "key is not a well-formed segment path".to_owned(),
            });
        }
        Ok(self.root.join(key))
    }

    fn is_entry(path: &Path) -> bool {
        path.join(PAYLOAD_FILE).is_file()
    }

    /// Remove now-empty ancestor groups after an entry was deleted.
    fn prune_empty_groups(&self, mut dir: PathBuf) {
        while dir.starts_with(&self.root) && dir != self.root {
            match fs::read_dir(&dir) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                }
                Err(_) => break,
            }
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            if !dir.pop() {
                break;
            }
        }
    }
}

/// Holds the open lock file for as long as the flock is needed.
struct FileLock {
    file: fs::File,
}

impl BackendLock for FileLock {}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl ContainerBackend for DirectoryBackend {
    fn try_lock(&self, exclusive: bool) -> Result<Option<Box<dyn BackendLock>>, StorageError> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.root.join(LOCK_FILE))?;
        let locked = if exclusive {
            fs2::FileExt::try_lock_exclusive(&file)
        } else {
            fs2::FileExt::try_lock_shared(&file)
        };
        match locked {
            Ok(()) => Ok(Some(Box::new(FileLock { file }))),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_entry(&self, key: &str, payload: &[u8], attrs: &Mapping) -> Result<(), StorageError> {
        let dest = self.resolve(key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage the whole entry next to the root, then commit by rename so
        // readers never observe a half-written entry.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)?;
        fs::write(staging.path().join(PAYLOAD_FILE), payload)?;
        let attrs_bytes =
            serde_json::to_vec_pretty(attrs).map_err(|err| StorageError::Corrupt {
                key: key.to_owned(),
                reason: format!("attributes are not JSON-serializable: {err}"),
            })?;
        fs::write(staging.path().join(ATTRS_FILE), attrs_bytes)?;
        let staged = staging.into_path();

        if dest.exists() {
            // Swap: retire the old entry, move the staged one in, then
            // drop the old. A failed swap restores the old entry.
            let retired = self.root.join(format!(
                "{STAGING_PREFIX}retired-{}",
                std::process::id()
            ));
            fs::rename(&dest, &retired)?;
            if let Err(err) = fs::rename(&staged, &dest) {
                let _ = fs::rename(&retired, &dest);
                let _ = fs::remove_dir_all(&staged);
                return Err(err.into());
            }
            let _ = fs::remove_dir_all(&retired);
        } else if let Err(err) = fs::rename(&staged, &dest) {
            let _ = fs::remove_dir_all(&staged);
            return Err(err.into());
        }
        Ok(())
    }

    fn read_payload(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.resolve(key)?.join(PAYLOAD_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn read_attrs(&self, key: &str) -> Result<Option<Mapping>, StorageError> {
        let dir = self.resolve(key)?;
        if !Self::is_entry(&dir) {
            return Ok(None);
        }
        let path = dir.join(ATTRS_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Some(Mapping::new()))
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|err| {
            StorageError::Corrupt {
                key: key.to_owned(),
                reason: format!("attribute sidecar is not valid JSON: {err}"),
            }
        })
    }

    fn write_attrs(&self, key: &str, attrs: &Mapping) -> Result<(), StorageError> {
        let dir = self.resolve(key)?;
        if !Self::is_entry(&dir) {
            return Err(StorageError::MissingEntry {
                key: key.to_owned(),
            });
        }
        let bytes = serde_json::to_vec_pretty(attrs).map_err(|err| StorageError::Corrupt {
            key: key.to_owned(),
            reason: format!("attributes are not JSON-serializable: {err}"),
        })?;
        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        staged.write_all(&bytes)?;
        staged
            .persist(dir.join(ATTRS_FILE))
            .map_err(|err| StorageError::Io(err.error))?;
        Ok(())
    }

    fn remove_entry(&self, key: &str) -> Result<bool, StorageError> {
        let dir = self.resolve(key)?;
        if !Self::is_entry(&dir) {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        let mut parent = dir;
        if parent.pop() {
            self.prune_empty_groups(parent);
        }
        Ok(true)
    }

    fn list_children(&self, group: &str) -> Result<Vec<Child>, StorageError> {
        let dir = if group.is_empty() {
            self.root.clone()
        } else {
            self.resolve(group)?
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.starts_with(STAGING_PREFIX) {
                continue;
            }
            let kind = if Self::is_entry(&entry.path()) {
                ChildKind::Entry
            } else {
                ChildKind::Group
            };
            children.push(Child { name, kind });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

/// In-memory container for tests and ephemeral stores.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, (Vec<u8>, Mapping)>>,
}

impl MemoryBackend {
    /// An empty in-memory container.
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

/// In-memory containers have no medium other processes could reach, so
/// the in-process store lock alone is exhaustive.
struct NoopLock;

impl BackendLock for NoopLock {}

impl ContainerBackend for MemoryBackend {
    fn try_lock(&self, _exclusive: bool) -> Result<Option<Box<dyn BackendLock>>, StorageError> {
        Ok(Some(Box::new(NoopLock)))
    }

    fn write_entry(&self, key: &str, payload: &[u8], attrs: &Mapping) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("backend mutex poisoned");
        entries.insert(key.to_owned(), (payload.to_vec(), attrs.clone()));
        Ok(())
    }

    fn read_payload(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().expect("backend mutex poisoned");
        Ok(entries.get(key).map(|(payload, _)| payload.clone()))
    }

    fn read_attrs(&self, key: &str) -> Result<Option<Mapping>, StorageError> {
        let entries = self.entries.lock().expect("backend mutex poisoned");
        Ok(entries.get(key).map(|(_, attrs)| attrs.clone()))
    }

    fn write_attrs(&self, key: &str, attrs: &Mapping) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("backend mutex poisoned");
        match entries.get_mut(key) {
            Some((_, stored)) => {
                *stored = attrs.clone();
                Ok(())
            }
            None => Err(StorageError::MissingEntry {
                key: key.to_owned(),
            }),
        }
    }

    fn remove_entry(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock().expect("backend mutex poisoned");
        Ok(entries.remove(key).is_some())
    }

    fn list_children(&self, group: &str) -> Result<Vec<Child>, StorageError> {
        let entries = self.entries.lock().expect("backend mutex poisoned");
        let mut children: Vec<Child> = Vec::new();
        let mut push = |child: Child| {
            if !children.iter().any(|existing| *existing == child) {
                children.push(child);
            }
        };
        for key in entries.keys() {
            let remainder = if group.is_empty() {
                key.as_str()
            } else {
                match key.strip_prefix(group).and_then(|k| k.strip_prefix('/')) {
                    Some(remainder) => remainder,
                    None => continue,
                }
            };
            match remainder.split_once('/') {
                Some((name, _)) => push(Child {
                    name: name.to_owned(),
                    kind: ChildKind::Group,
                }),
                None => push(Child {
                    name: remainder.to_owned(),
                    kind: ChildKind::Entry,
                }),
            }
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}
