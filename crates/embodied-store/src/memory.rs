//! Process-local project store

use std::cell::RefCell;

use embodied_domain::model::ProjectRecord;
use embodied_domain::repository::ProjectStore;
use embodied_types::Result;

/// Keeps the collection in memory; contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RefCell<Option<Vec<ProjectRecord>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn get_projects(&self) -> Result<Option<Vec<ProjectRecord>>> {
        Ok(self.projects.borrow().clone())
    }

    fn save_projects(&self, projects: &[ProjectRecord]) -> Result<()> {
        *self.projects.borrow_mut() = Some(projects.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
