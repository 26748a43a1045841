//! Repository trait definitions for data persistence

use embodied_types::Result;

use crate::model::ProjectRecord;

/// Durable list of project records.
///
/// The caller always computes the full new list and hands it over in one
/// `save_projects` call; a completed save must be visible to the next
/// `get_projects`.
pub trait ProjectStore {
    /// Load all saved projects; `None` means nothing has been saved yet
    fn get_projects(&self) -> Result<Option<Vec<ProjectRecord>>>;

    /// Replace the stored collection
    fn save_projects(&self, projects: &[ProjectRecord]) -> Result<()>;

    /// Human-readable location of the store, for diagnostics
    fn location(&self) -> String;
}
