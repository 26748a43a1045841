//! JSON file project store
//!
//! Stored at: <store_dir>/projects.json

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use embodied_domain::model::ProjectRecord;
use embodied_domain::repository::ProjectStore;
use embodied_types::{Result, StoreError};

const STORE_FILE: &str = "projects.json";

/// File-based implementation of [`ProjectStore`]
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    store_path: PathBuf,
}

impl FileProjectStore {
    /// Open the store, creating the directory if needed
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&store_dir)?;
        let store_path = store_dir.join(STORE_FILE);
        info!("project store: {}", store_path.display());
        Ok(Self { store_path })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn temp_path(&self) -> PathBuf {
        self.store_path.with_extension("json.tmp")
    }
}

fn write_json(path: &Path, projects: &[ProjectRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, projects)?;
    writer.flush()?;
    Ok(())
}

impl ProjectStore for FileProjectStore {
    fn get_projects(&self) -> Result<Option<Vec<ProjectRecord>>> {
        if !self.store_path.exists() {
            debug!("no saved projects at {}", self.store_path.display());
            return Ok(None);
        }

        let file = File::open(&self.store_path)?;
        let reader = BufReader::new(file);
        let projects: Vec<ProjectRecord> = serde_json::from_reader(reader).map_err(|e| {
            StoreError::Corrupted(format!("{}: {}", self.store_path.display(), e))
        })?;
        debug!("loaded {} projects", projects.len());
        Ok(Some(projects))
    }

    /// Write to a sibling temp file, then rename over the store file
    fn save_projects(&self, projects: &[ProjectRecord]) -> Result<()> {
        let temp_path = self.temp_path();
        let written = write_json(&temp_path, projects)
            .and_then(|()| fs::rename(&temp_path, &self.store_path).map_err(Into::into));
        if let Err(e) = written {
            if temp_path.exists() {
                if let Err(remove_err) = fs::remove_file(&temp_path) {
                    warn!("could not remove {}: {}", temp_path.display(), remove_err);
                }
            }
            return Err(e);
        }
        debug!("saved {} projects to {}", projects.len(), self.store_path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.store_path.display().to_string()
    }
}
