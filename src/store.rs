use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::loop_state::LoopConfig;
use crate::core::snapshot::LoopSnapshot;
use crate::error::{OrbitError, Result};
use crate::org::convert::parse_snapshot;
use crate::org::writer::OrgWriter;

/// Read/write access to the loop and its markers.
pub trait LoopStore: Send + Sync {
    fn load(&self) -> Result<LoopSnapshot>;
    fn save(&self, snapshot: &LoopSnapshot) -> Result<()>;
}

/// Keeps the loop in an org file. A missing file reads as an idle loop.
pub struct OrgLoopStore {
    path: PathBuf,
    default_duration: u32,
}

impl OrgLoopStore {
    pub fn new(path: impl Into<PathBuf>, default_duration: u32) -> Self {
        Self {
            path: path.into(),
            default_duration,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LoopStore for OrgLoopStore {
    fn load(&self) -> Result<LoopSnapshot> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_snapshot(&content, self.default_duration)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(LoopSnapshot::new(LoopConfig::new(self.default_duration)))
            }
            Err(e) => Err(OrbitError::Store(format!(
                "reading {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Write through a temp file and rename, so a polling reader never sees
    /// a half-written loop.
    fn save(&self, snapshot: &LoopSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("org.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(OrgWriter::write_loop_file(snapshot).as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("Saved loop to {}", self.path.display());
        Ok(())
    }
}

/// In-process store, for embedding the engine without files.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<LoopSnapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: LoopSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl LoopStore for MemoryStore {
    fn load(&self) -> Result<LoopSnapshot> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| OrbitError::Store("memory store poisoned".into()))
    }

    fn save(&self, snapshot: &LoopSnapshot) -> Result<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| OrbitError::Store("memory store poisoned".into()))?;
        *guard = snapshot.clone();
        Ok(())
    }
}
