use std::path::{Path, PathBuf};

use luma_exdump::{MemorySink, SinkError};

/// Saves the Arm9 memory image next to the dump as `<stem>_arm9mem.bin`.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            path: dir.join(format!("{stem}_arm9mem.bin")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemorySink for FileSink {
    fn persist(&self, bytes: &[u8]) -> Result<String, SinkError> {
        std::fs::write(&self.path, bytes).map_err(|e| {
            SinkError::new(format!("failed to write `{}`: {e}", self.path.display()))
        })?;

        log::info!("wrote {} bytes to `{}`", bytes.len(), self.path.display());
        Ok(self.path.display().to_string())
    }
}
