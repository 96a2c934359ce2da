//! On-disk tile layout.
//!
//! Paths stored in tile records are relative to the storage root:
//!
//! - zoom 0: `grids/{gridID}.png`, independent of the grid's coordinate so a
//!   merge only rewrites metadata
//! - zoom ≥ 1: `{mapID}/{zoom}/{x}_{y}.png`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use gridmap_types::{Coord, MapId};
use tracing::debug;

use crate::{PyramidError, Result};

const GRIDS_DIR: &str = "grids";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Whether a client-supplied grid id is safe to use as a file stem.
pub fn valid_grid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Whether a stored relative path stays inside the storage root.
pub fn is_safe_relative(rel: &str) -> bool {
    let path = Path::new(rel);
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

/// Tile storage rooted at one directory.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path of a native fragment image.
    pub fn grid_file(id: &str) -> Result<String> {
        if !valid_grid_id(id) {
            return Err(PyramidError::InvalidGridId(id.to_string()));
        }
        Ok(format!("{GRIDS_DIR}/{id}.png"))
    }

    /// Relative path of a pyramid tile at `zoom ≥ 1`.
    pub fn zoom_file(map: MapId, zoom: u8, coord: Coord) -> String {
        format!("{map}/{zoom}/{}.png", coord.name())
    }

    /// Absolute path of a stored relative path.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read(&self, rel: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.resolve(rel))?)
    }

    /// Write `bytes` so readers observe either the old or the new file.
    pub fn write_atomic(&self, rel: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(rel);
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, rel.to_string()))?;
        fs::create_dir_all(dir)?;
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".{}.{seq}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp);
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), len = bytes.len(), "tile written");
        Ok(())
    }

    /// Remove the pyramid directory of one map. Missing is fine.
    pub fn remove_map(&self, map: MapId) -> Result<()> {
        remove_dir_if_exists(&self.root.join(map.to_string()))
    }

    /// Remove every map's pyramid directory, keeping native fragments.
    pub fn remove_all_pyramids(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let is_map_dir = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.parse::<MapId>().is_ok());
            if is_map_dir && entry.file_type()?.is_dir() {
                remove_dir_if_exists(&entry.path())?;
            }
        }
        Ok(())
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
