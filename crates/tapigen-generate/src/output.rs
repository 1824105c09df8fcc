use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tapigen_config::FileControls;

use crate::atomic::write_bytes_atomic;
use crate::errors::{GenerationError, Result};

/// Kind of source unit written to staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    PackageSpec,
    PackageBody,
    Trigger,
    View,
}

/// Rendered text with its target location under the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    pub kind: UnitKind,
    pub subdir: PathBuf,
    pub file_name: String,
    pub contents: String,
}

impl RenderedUnit {
    /// Place `contents` according to the file controls for `table`.
    pub fn new(kind: UnitKind, table: &str, files: &FileControls, contents: String) -> Self {
        let table_lc = table.to_lowercase();
        let (subdir, name_suffix, suffix) = match kind {
            UnitKind::PackageSpec => (
                &files.spec_dir,
                &files.package_name_suffix,
                &files.spec_suffix,
            ),
            UnitKind::PackageBody => (
                &files.body_dir,
                &files.package_name_suffix,
                &files.body_suffix,
            ),
            UnitKind::Trigger => (
                &files.trigger_dir,
                &files.trigger_name_suffix,
                &files.trigger_suffix,
            ),
            UnitKind::View => (&files.view_dir, &files.view_name_suffix, &files.view_suffix),
        };
        Self {
            kind,
            subdir: subdir.clone(),
            file_name: format!("{table_lc}{name_suffix}{suffix}"),
            contents,
        }
    }
}

/// Writes rendered units beneath an existing staging directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    staging_dir: PathBuf,
}

impl OutputWriter {
    /// The staging directory must already exist and be a directory.
    pub fn new(staging_dir: &Path) -> Result<Self> {
        if !staging_dir.exists() {
            return Err(GenerationError::Staging(format!(
                "staging directory {} does not exist",
                staging_dir.display()
            )));
        }
        if !staging_dir.is_dir() {
            return Err(GenerationError::Staging(format!(
                "staging path {} is not a directory",
                staging_dir.display()
            )));
        }
        Ok(Self {
            staging_dir: staging_dir.to_path_buf(),
        })
    }

    /// Write one unit, creating its subdirectory on demand.
    pub fn write(&self, unit: &RenderedUnit) -> Result<PathBuf> {
        let dir = self.staging_dir.join(&unit.subdir);
        if !dir.is_dir() {
            info!(path = %dir.display(), "creating staging subdirectory");
            fs::create_dir_all(&dir)?;
        }
        let path = dir.join(&unit.file_name);
        write_bytes_atomic(&path, unit.contents.as_bytes())?;
        debug!(path = %path.display(), bytes = unit.contents.len(), "unit written");
        Ok(path)
    }
}
