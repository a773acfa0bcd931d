//! Small key-value persistence for the column configuration and source files

use crate::config::ColumnConfig;
use crate::session::SourceFile;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key of the serialized [`ColumnConfig`]
pub const COLUMN_CONFIG_KEY: &str = "column-config";
/// Key of the JSON list of stored source file names
pub const SOURCE_INDEX_KEY: &str = "audit-files";
const SOURCE_PREFIX: &str = "blob:";

/// Escaped keys longer than this are shortened to stay under file-name limits
const MAX_FILE_NAME: usize = 200;
/// Bytes of the escaped key kept in front of the digest
const KEPT_PREFIX: usize = 120;

/// Byte-valued key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
    /// Removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by one file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create store directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

/// Map a key to a file name: `[A-Za-z0-9_-]` kept, everything else `%XX`.
///
/// Names over [`MAX_FILE_NAME`] bytes become a prefix, `~` and the SHA-256
/// of the full key; escaping never emits `~`, so the two forms cannot clash.
fn escape_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    if name.len() > MAX_FILE_NAME {
        name.truncate(KEPT_PREFIX);
        name.push('~');
        name.push_str(&format!("{:x}", Sha256::digest(key.as_bytes())));
    }
    name
}

/// Load the stored column configuration.
///
/// A missing or malformed blob is reported as no configuration.
pub fn load_column_config<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<ColumnConfig>> {
    let Some(bytes) = store.get(COLUMN_CONFIG_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_slice(&bytes) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            log::warn!("Ignoring malformed column configuration: {}", e);
            Ok(None)
        }
    }
}

pub fn save_column_config<S: KeyValueStore + ?Sized>(
    store: &mut S,
    config: &ColumnConfig,
) -> Result<()> {
    let json = serde_json::to_vec_pretty(config)?;
    store.set(COLUMN_CONFIG_KEY, &json)
}

pub fn clear_column_config<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    store.remove(COLUMN_CONFIG_KEY)
}

fn source_key(name: &str) -> String {
    format!("{}{}", SOURCE_PREFIX, name)
}

fn load_source_index<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<String>> {
    let Some(bytes) = store.get(SOURCE_INDEX_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_slice(&bytes) {
        Ok(names) => Ok(names),
        Err(e) => {
            log::warn!("Ignoring malformed source index: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Replace the stored source files with `sources`
pub fn save_sources<S: KeyValueStore + ?Sized>(
    store: &mut S,
    sources: &[SourceFile],
) -> Result<()> {
    for stale in load_source_index(store)? {
        if !sources.iter().any(|s| s.name == stale) {
            store.remove(&source_key(&stale))?;
        }
    }
    for source in sources {
        store.set(&source_key(&source.name), &source.bytes)?;
    }
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    store.set(SOURCE_INDEX_KEY, &serde_json::to_vec(&names)?)
}

/// Load the stored source files in their stored order
pub fn load_sources<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for name in load_source_index(store)? {
        match store.get(&source_key(&name))? {
            Some(bytes) => sources.push(SourceFile::new(name, bytes)),
            None => log::warn!("Stored source '{}' is missing its bytes", name),
        }
    }
    Ok(sources)
}

pub fn clear_sources<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    for name in load_source_index(store)? {
        store.remove(&source_key(&name))?;
    }
    store.remove(SOURCE_INDEX_KEY)
}
