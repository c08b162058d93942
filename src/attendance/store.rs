//! Document persistence
//!
//! One JSON file per calendar date, plus a dated device-identity snapshot.
//! Writes go to a temp file first and are swapped into place with a rename,
//! so a crash mid-write leaves the previous snapshot intact.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::device::DeviceInfo;
use crate::Result;

use super::AttendanceDocument;

/// Persists and retrieves the latest attendance document per date.
pub trait DocumentStore: Send + Sync {
    fn load(&self, date: NaiveDate) -> Result<Option<AttendanceDocument>>;
    fn save(&self, document: &AttendanceDocument) -> Result<()>;
    fn save_device_snapshot(&self, info: &DeviceInfo, date: NaiveDate) -> Result<()>;
}

/// File-backed document store.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("attendance_{date}.json"))
    }

    fn write_swapped(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, date: NaiveDate) -> Result<Option<AttendanceDocument>> {
        let path = self.document_path(date);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&text) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                // An unreadable snapshot starts the date over instead of
                // wedging every subsequent cycle.
                warn!(path = %path.display(), "discarding unparseable document: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, document: &AttendanceDocument) -> Result<()> {
        let path = self.document_path(document.date);
        self.write_swapped(&path, &serde_json::to_vec_pretty(document)?)?;
        debug!(path = %path.display(), users = document.users.len(), "document saved");
        Ok(())
    }

    fn save_device_snapshot(&self, info: &DeviceInfo, date: NaiveDate) -> Result<()> {
        let filename = format!(
            "device_{}_{}.json",
            sanitize_filename(&info.device_name),
            date.format("%Y%m%d")
        );
        let path = self.dir.join(filename);
        self.write_swapped(&path, &serde_json::to_vec_pretty(info)?)?;
        debug!(path = %path.display(), "device snapshot saved");
        Ok(())
    }
}

/// Device names come from user-editable firmware settings; anything that is
/// not filename-safe becomes an underscore.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
