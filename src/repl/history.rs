use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use dialoguer::History;
use log::debug;

/// Line history for the REPL prompt, persisted to a plain text file.
///
/// Entries are kept newest first in memory and written oldest first, one per line.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    entries: VecDeque<String>,
    max_entries: usize,
}

impl FileHistory {
    /// Load at most `max_entries` of the most recent lines from `path`.
    /// A missing or unreadable file starts an empty history.
    pub fn load(path: impl Into<PathBuf>, max_entries: usize) -> FileHistory {
        let path = path.into();
        let mut entries = VecDeque::new();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines().filter(|line| !line.trim().is_empty()) {
                    entries.push_front(line.to_string());
                }
                entries.truncate(max_entries);
            }
            Err(e) => debug!("No history loaded from {}: {e}", path.display()),
        }
        FileHistory {
            path,
            entries,
            max_entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn save(&self) -> io::Result<()> {
        let mut contents = String::new();
        for entry in self.entries.iter().take(self.max_entries).rev() {
            contents.push_str(entry);
            contents.push('\n');
        }
        std::fs::write(&self.path, contents)
    }
}

impl<T: ToString> History<T> for FileHistory {
    fn read(&self, pos: usize) -> Option<String> {
        self.entries.get(pos).cloned()
    }

    fn write(&mut self, val: &T) {
        let line = val.to_string();
        let line = line.trim();
        if line.is_empty() || line.contains('\n') {
            return;
        }
        if self.entries.front().map(String::as_str) == Some(line) {
            return;
        }
        self.entries.push_front(line.to_string());
        self.entries.truncate(self.max_entries);
    }
}
