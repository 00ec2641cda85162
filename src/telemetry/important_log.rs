//! # Important Log
//!
//! Fixed-capacity ring of messages an operator should see even when the regular log
//! is noisy: startup, reload failures, signals. Newest entries come first and the
//! oldest one is dropped once the ring is full. Nothing is written until `flush`.

use log::warn;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug)]
pub struct ImportantLog {
    capacity: usize,
    entries: RwLock<VecDeque<String>>,
}

impl ImportantLog {
    /// Creates an empty ring. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("important: {}", message);

        let mut entries = self.entries.write();
        entries.push_front(message);
        entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }

    /// Writes every entry, newest first, one per line. The ring is left intact.
    pub fn flush<W: Write>(&self, writer: &mut W) -> Result<usize, String> {
        let entries = self.entries.read();
        for entry in entries.iter() {
            writeln!(writer, "{}", entry)
                .map_err(|e| format!("Failed to write important log: {}", e))?;
        }
        writer
            .flush()
            .map_err(|e| format!("Failed to flush important log: {}", e))?;
        Ok(entries.len())
    }

    /// Appends a flush to `path`, creating the file and its directory if needed.
    pub fn flush_to_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create important log directory: {}", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open important log file: {}", e))?;
        let mut writer = BufWriter::new(file);
        self.flush(&mut writer)
    }
}
