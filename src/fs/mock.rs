// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { created: SystemTime },
    Dir { created: SystemTime, children: Vec<String> },
}

impl MockEntry {
    fn created(&self) -> SystemTime {
        match self {
            MockEntry::File { created } | MockEntry::Dir { created, .. } => *created,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Logical clock: every new entry is one second younger than the last.
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.entries.contains_key(path) {
            return;
        }
        let created = self.tick();
        self.entries.insert(
            path.to_path_buf(),
            MockEntry::Dir {
                created,
                children: Vec::new(),
            },
        );
        self.link_to_parent(path);
    }

    fn link_to_parent(&mut self, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent == path {
            return;
        }
        self.ensure_dir(parent);
        if let Some(MockEntry::Dir { children, .. }) = self.entries.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

/// In-memory filesystem for tests.
///
/// `read_dir` lists children in insertion order, unsorted.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.ensure_dir(path.as_ref());
    }

    /// Add a directory with an explicit creation time (seconds since epoch).
    pub fn add_dir_created_at(&self, path: impl AsRef<Path>, secs: u64) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.ensure_dir(path);
        if let Some(MockEntry::Dir { created, .. }) = state.entries.get_mut(path) {
            *created = UNIX_EPOCH + Duration::from_secs(secs);
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        let created = state.tick();
        state
            .entries
            .insert(path.to_path_buf(), MockEntry::File { created });
        state.link_to_parent(path);
    }
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::Dir { .. }))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(MockEntry::File { .. }) = state.entries.get(path) {
            return Err(anyhow!("Is a file: {:?}", path));
        }
        state.ensure_dir(path);
        Ok(())
    }

    fn created(&self, path: &Path) -> Result<SystemTime> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(path)
            .map(MockEntry::created)
            .ok_or_else(|| anyhow!("Not found: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::Dir { children, .. }) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
