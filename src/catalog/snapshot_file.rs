//! Catalog snapshot file - last known good catalog rows on disk.
//!
//! Lets a restarting bidder serve from the previous catalog when the
//! primary source is unavailable.
//!
//! # File Format
//! ```text
//! Header (JSON, padded to a fixed-width first line):
//!   magic: "DSPC"
//!   version: 1
//!   body_len: u64
//!
//! Body (bincode):
//!   CatalogRows
//! ```

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::loader::{CatalogLoader, CatalogRows, DimensionSchema};
use crate::error::{BidderError, Result};

const MAGIC: &str = "DSPC";
const VERSION: u32 = 1;
const HEADER_WIDTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Header {
    magic: String,
    version: u32,
    body_len: u64,
}

/// Binary catalog snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes rows through a temp file and an atomic rename.
    pub fn write(&self, rows: &CatalogRows) -> std::result::Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directory: {}", e))?;
        }

        let body = bincode::serialize(rows).map_err(|e| format!("Serialize rows failed: {}", e))?;

        let header = serde_json::to_string(&Header {
            magic: MAGIC.to_string(),
            version: VERSION,
            body_len: body.len() as u64,
        })
        .map_err(|e| format!("Serialize header failed: {}", e))?;
        let header_line = format!("{:<width$}\n", header, width = HEADER_WIDTH - 1);

        let tmp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| format!("Create temp failed: {}", e))?;

        file.write_all(header_line.as_bytes())
            .map_err(|e| format!("Write header failed: {}", e))?;
        file.write_all(&body)
            .map_err(|e| format!("Write body failed: {}", e))?;
        file.sync_all().map_err(|e| format!("Sync failed: {}", e))?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| format!("Rename failed: {}", e))?;
        Ok(())
    }

    /// Reads rows back through a memory map.
    pub fn read(&self) -> std::result::Result<CatalogRows, String> {
        let file = File::open(&self.path).map_err(|e| format!("Open failed: {}", e))?;

        // The file is only ever replaced by rename, never written in place.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| format!("Mmap failed: {}", e))? };

        if mmap.len() < HEADER_WIDTH {
            return Err("File is too short for a header".to_string());
        }

        let header_str = std::str::from_utf8(&mmap[..HEADER_WIDTH])
            .map_err(|e| format!("Invalid UTF-8 in header: {}", e))?
            .trim();
        let header: Header = serde_json::from_str(header_str)
            .map_err(|e| format!("Parse header failed: {}", e))?;

        if header.magic != MAGIC {
            return Err("Invalid magic number".to_string());
        }
        if header.version != VERSION {
            return Err(format!("Unsupported version: {}", header.version));
        }

        let body = &mmap[HEADER_WIDTH..];
        if body.len() as u64 != header.body_len {
            return Err(format!(
                "Truncated body: {} bytes, header says {}",
                body.len(),
                header.body_len
            ));
        }

        bincode::deserialize(body).map_err(|e| format!("Deserialize rows failed: {}", e))
    }
}

impl CatalogLoader for SnapshotFile {
    fn load(&self, _hint: Option<DimensionSchema>) -> Result<CatalogRows> {
        self.read().map_err(BidderError::Reload)
    }

    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entities::{Creative, Folder};

    fn sample_rows() -> CatalogRows {
        let mut folder = Folder {
            id: 1,
            active: true,
            cpc: 500,
            creatives: vec![10],
            ..Default::default()
        };
        folder.assign_target("Country", 3).unwrap();
        CatalogRows {
            folders: vec![folder],
            creatives: vec![Creative {
                id: 10,
                redirect_url: "https://example.test/c10".to_string(),
                active: true,
            }],
            schema: DimensionSchema::Dimentions,
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_write_and_read() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(tmp_dir.path().join("nested/catalog.snap"));

        let rows = sample_rows();
        file.write(&rows).unwrap();
        assert!(file.exists());

        let back = file.read().unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("catalog.snap");
        std::fs::write(&path, vec![b'x'; 300]).unwrap();

        let err = SnapshotFile::new(&path).load(None).unwrap_err();
        assert!(matches!(err, BidderError::Reload(_)));
    }

    #[test]
    fn test_snapshot_rejects_truncated_body() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(tmp_dir.path().join("catalog.snap"));
        file.write(&sample_rows()).unwrap();

        let mut bytes = std::fs::read(file.path()).unwrap();
        bytes.truncate(bytes.len() - 4);
        std::fs::write(file.path(), bytes).unwrap();

        assert!(file.read().unwrap_err().contains("Truncated"));
    }
}
