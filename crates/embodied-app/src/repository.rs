//! Repository adapters for persistence layer

use tracing::warn;

use embodied_domain::repository::ProjectStore;
use embodied_store::FileProjectStore;
use embodied_types::Result;

use crate::app::ProjectService;
use crate::config::Config;

/// Open the file-based project store, or `None` when persistence is disabled
pub fn open_project_store(config: &Config) -> Result<Option<Box<dyn ProjectStore>>> {
    if !config.persistence_enabled {
        return Ok(None);
    }
    let store_dir = config.store_dir()?;
    Ok(Some(Box::new(FileProjectStore::open(store_dir)?)))
}

/// Open the project service, falling back to in-memory operation when the
/// store is disabled or cannot be read
pub fn open_project_service(config: &Config) -> ProjectService {
    let store = match open_project_store(config) {
        Ok(Some(store)) => store,
        Ok(None) => return ProjectService::in_memory(),
        Err(e) => {
            warn!("project store unavailable: {}", e);
            return ProjectService::in_memory();
        }
    };

    match ProjectService::open(store) {
        Ok(service) => service,
        Err(e) => {
            warn!("failed to load saved projects: {}", e);
            ProjectService::in_memory()
        }
    }
}
