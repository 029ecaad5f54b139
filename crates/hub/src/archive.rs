#![forbid(unsafe_code)]

use crate::clock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk journal of raw evidence payloads. Every submission is staged
/// under `<root>/<owner>/incoming/`; once the evidence is recorded the file
/// moves to `<root>/<owner>/accepted/`. Files for failed submissions stay
/// in `incoming/` for inspection.
#[derive(Debug)]
pub struct EvidenceArchive {
    root: PathBuf,
}

impl EvidenceArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage(&self, owner: &str, uuid: &str, payload_json: &str) -> io::Result<PathBuf> {
        let dir = self.root.join(owner).join("incoming");
        fs::create_dir_all(&dir)?;
        let name = format!(
            "{}_{}.json",
            clock::file_stamp(clock::now_ms_i64()),
            safe_name(uuid)
        );
        let path = dir.join(name);
        fs::write(&path, payload_json)?;
        Ok(path)
    }

    pub fn promote(&self, owner: &str, staged: &Path) -> io::Result<PathBuf> {
        let dir = self.root.join(owner).join("accepted");
        fs::create_dir_all(&dir)?;
        let name = staged.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "staged path has no file name")
        })?;
        let target = dir.join(name);
        fs::copy(staged, &target)?;
        let _ = fs::remove_file(staged);
        Ok(target)
    }
}

// The stage name takes the payload's uuid before validation has run;
// anything outside [0-9a-zA-Z-] is dropped.
fn safe_name(uuid: &str) -> String {
    uuid.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect()
}
