//! Project Service - list, save and delete project records
//!
//! Holds the in-memory project list and an optional [`ProjectStore`]. Every
//! mutation computes the full new list first, hands it to the store, and only
//! then replaces the in-memory list. Without a store, mutations still apply
//! in memory but are reported as [`Durability::InMemoryOnly`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use embodied_domain::model::{allocate_project_id, ProjectDraft, ProjectId, ProjectRecord};
use embodied_domain::repository::ProjectStore;
use embodied_types::{Error, Result};

use crate::reference::ReferenceData;

/// Number of projects shown in the dashboard's recent list
const RECENT_PROJECTS: usize = 5;

/// Whether a mutation reached durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    Durable,
    InMemoryOnly,
}

/// A project that can be placed on a map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: ProjectId,
    pub building_id: String,
    pub function: String,
    pub lat: f64,
    pub lng: f64,
    pub carbon_tonnes: f64,
}

/// Aggregate view over all saved projects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub project_count: usize,
    pub total_area_m2: f64,
    pub total_carbon_kg: f64,
    /// Newest first
    pub recent: Vec<ProjectRecord>,
    pub markers: Vec<MapMarker>,
}

pub struct ProjectService {
    projects: Vec<ProjectRecord>,
    store: Option<Box<dyn ProjectStore>>,
}

impl ProjectService {
    /// Load the project list from the store; a store with nothing saved
    /// yields an empty list
    pub fn open(store: Box<dyn ProjectStore>) -> Result<Self> {
        let projects = store.get_projects()?.unwrap_or_default();
        info!("{} projects loaded from {}", projects.len(), store.location());
        Ok(Self {
            projects,
            store: Some(store),
        })
    }

    /// Service without durable storage
    pub fn in_memory() -> Self {
        warn!("no project store available, changes will not be saved to disk");
        Self {
            projects: Vec::new(),
            store: None,
        }
    }

    pub fn durability(&self) -> Durability {
        if self.store.is_some() {
            Durability::Durable
        } else {
            Durability::InMemoryOnly
        }
    }

    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    pub fn find(&self, id: ProjectId) -> Option<&ProjectRecord> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Open a stored project for editing; `None` when it has vanished
    pub fn load_draft(&self, id: ProjectId) -> Option<ProjectDraft> {
        self.find(id).map(ProjectDraft::from_record)
    }

    /// Snapshot a draft and add or replace it in the list
    pub fn save_draft(
        &mut self,
        draft: &ProjectDraft,
        reference: &ReferenceData,
        now: DateTime<Utc>,
    ) -> Result<(ProjectRecord, Durability)> {
        let existing_ids = self.projects.iter().map(|p| p.id);
        let new_id = || allocate_project_id(existing_ids, now);
        let record = draft.to_record(&reference.intensity, &reference.factors, new_id, now);

        let durability = match draft.id() {
            Some(_) => self.update(record.clone())?,
            None => self.add(record.clone())?,
        };
        Ok((record, durability))
    }

    /// Prepend a new record
    pub fn add(&mut self, record: ProjectRecord) -> Result<Durability> {
        check_finite(&record)?;
        if self.find(record.id).is_some() {
            return Err(Error::InvalidInput(format!(
                "Project {} already exists",
                record.id
            )));
        }
        let mut updated = Vec::with_capacity(self.projects.len() + 1);
        updated.push(record);
        updated.extend(self.projects.iter().cloned());
        self.commit(updated)
    }

    /// Replace the record with the same id
    pub fn update(&mut self, record: ProjectRecord) -> Result<Durability> {
        check_finite(&record)?;
        if self.find(record.id).is_none() {
            return Err(Error::ProjectNotFound(record.id));
        }
        let updated = self
            .projects
            .iter()
            .map(|p| if p.id == record.id { record.clone() } else { p.clone() })
            .collect();
        self.commit(updated)
    }

    pub fn delete(&mut self, id: ProjectId) -> Result<Durability> {
        if self.find(id).is_none() {
            return Err(Error::ProjectNotFound(id));
        }
        let updated = self.projects.iter().filter(|p| p.id != id).cloned().collect();
        self.commit(updated)
    }

    /// Case-insensitive match on building id or function; empty term matches all
    pub fn search(&self, term: &str) -> Vec<&ProjectRecord> {
        let term = term.trim();
        self.projects
            .iter()
            .filter(|p| term.is_empty() || p.matches_search(term))
            .collect()
    }

    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary {
            project_count: self.projects.len(),
            total_area_m2: self.projects.iter().map(|p| p.area).sum(),
            total_carbon_kg: self.projects.iter().map(|p| p.calculated_carbon).sum(),
            recent: self.projects.iter().take(RECENT_PROJECTS).cloned().collect(),
            markers: self
                .projects
                .iter()
                .filter_map(|p| {
                    p.coordinates().map(|(lat, lng)| MapMarker {
                        id: p.id,
                        building_id: p.building_id.clone(),
                        function: p.function.clone(),
                        lat,
                        lng,
                        carbon_tonnes: p.calculated_carbon_tonnes(),
                    })
                })
                .collect(),
        }
    }

    fn commit(&mut self, updated: Vec<ProjectRecord>) -> Result<Durability> {
        let durability = match &self.store {
            Some(store) => {
                store.save_projects(&updated)?;
                Durability::Durable
            }
            None => {
                warn!("project list changed in memory only");
                Durability::InMemoryOnly
            }
        };
        self.projects = updated;
        Ok(durability)
    }
}

/// JSON has no representation for inf/NaN; one such value would make the
/// whole stored list unreadable
fn check_finite(record: &ProjectRecord) -> Result<()> {
    let scalars = [
        ("area", Some(record.area)),
        ("embodied carbon", Some(record.calculated_carbon)),
        ("latitude", record.lat),
        ("longitude", record.lng),
    ];
    for (field, value) in scalars {
        if let Some(v) = value.filter(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "{} of project {:?} is out of range ({})",
                field, record.building_id, v
            )));
        }
    }

    let per_material = record
        .material_selections
        .iter()
        .chain(record.custom_carbon_factors.iter());
    for (material, value) in per_material {
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "value for {} in project {:?} is out of range ({})",
                material, record.building_id, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use embodied_domain::model::{coerce_number, FactorRow, IntensityRow, Percentile};
    use embodied_store::MemoryProjectStore;

    fn reference() -> ReferenceData {
        ReferenceData::from_rows(
            vec![
                IntensityRow::new(
                    "residential multi-family",
                    "reinforced concrete structure",
                    "concrete",
                    [10.0, 20.0, 30.0, 40.0, 50.0].map(Some),
                ),
                IntensityRow::new(
                    "non-residential",
                    "steel frame",
                    "steel",
                    [1.0, 2.0, 3.0, 4.0, 5.0].map(Some),
                ),
            ],
            vec![FactorRow::new("Concrete", "0.1"), FactorRow::new("Steel", "2")],
        )
    }

    fn now(offset_ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
            + chrono::Duration::milliseconds(offset_ms)
    }

    fn draft(building_id: &str) -> ProjectDraft {
        let mut draft = ProjectDraft::new();
        draft.set_building_id(building_id);
        draft.set_area(100.0);
        draft
    }

    #[test]
    fn test_open_empty_store() {
        let service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();
        assert!(service.projects().is_empty());
        assert_eq!(service.durability(), Durability::Durable);
    }

    #[test]
    fn test_save_new_prepends() {
        let reference = reference();
        let mut service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();

        let (first, _) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();
        let (second, durability) = service.save_draft(&draft("B"), &reference, now(0)).unwrap();

        assert_eq!(durability, Durability::Durable);
        assert_ne!(first.id, second.id);
        assert_eq!(second.id, first.id + 1);
        assert_eq!(service.projects()[0].building_id, "B");
        assert_eq!(service.projects()[1].building_id, "A");
        // 30 kg/m² * 100 m² * 0.1
        assert!((first.calculated_carbon - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_edit_updates_in_place() {
        let reference = reference();
        let mut service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();
        let (a, _) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();
        service.save_draft(&draft("B"), &reference, now(5)).unwrap();

        let mut edit = service.load_draft(a.id).unwrap();
        edit.select_percentile(&reference.intensity, "concrete", Percentile::P100);
        let (updated, _) = service.save_draft(&edit, &reference, now(10)).unwrap();

        assert_eq!(updated.id, a.id);
        assert_eq!(service.projects().len(), 2);
        assert_eq!(service.projects()[1].id, a.id);
        assert!((service.projects()[1].calculated_carbon - 500.0).abs() < 1e-9);
        assert_eq!(service.projects()[1].timestamp, now(10));
    }

    #[test]
    fn test_update_vanished_project() {
        let reference = reference();
        let mut service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();
        let (a, _) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();
        let edit = service.load_draft(a.id).unwrap();
        service.delete(a.id).unwrap();

        assert!(service.load_draft(a.id).is_none());
        let err = service.save_draft(&edit, &reference, now(1)).unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(id) if id == a.id));
    }

    #[test]
    fn test_delete() {
        let reference = reference();
        let mut service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();
        let (a, _) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();
        let (b, _) = service.save_draft(&draft("B"), &reference, now(0)).unwrap();

        service.delete(a.id).unwrap();
        assert_eq!(service.projects().len(), 1);
        assert_eq!(service.projects()[0].id, b.id);
        assert!(matches!(service.delete(a.id), Err(Error::ProjectNotFound(_))));
    }

    #[test]
    fn test_in_memory_mode_reports_non_durable() {
        let reference = reference();
        let mut service = ProjectService::in_memory();
        let (record, durability) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();
        assert_eq!(durability, Durability::InMemoryOnly);
        assert_eq!(service.find(record.id).unwrap().building_id, "A");
        assert_eq!(service.delete(record.id).unwrap(), Durability::InMemoryOnly);
    }

    #[test]
    fn test_search() {
        let reference = reference();
        let mut service = ProjectService::in_memory();
        service.save_draft(&draft("Tower-A"), &reference, now(0)).unwrap();
        let mut office = draft("Depot");
        office.set_function("non-residential");
        office.set_structure("steel frame");
        service.save_draft(&office, &reference, now(1)).unwrap();

        assert_eq!(service.search("tower").len(), 1);
        assert_eq!(service.search("NON-RES")[0].building_id, "Depot");
        assert_eq!(service.search("residential").len(), 2);
        assert_eq!(service.search("").len(), 2);
        assert!(service.search("warehouse").is_empty());
    }

    #[test]
    fn test_dashboard() {
        let reference = reference();
        let mut service = ProjectService::in_memory();
        for i in 0..7 {
            let mut d = draft(&format!("B{}", i));
            if i == 0 {
                d.set_coordinates(None, None);
            }
            service.save_draft(&d, &reference, now(i)).unwrap();
        }

        let summary = service.dashboard();
        assert_eq!(summary.project_count, 7);
        assert!((summary.total_area_m2 - 700.0).abs() < 1e-9);
        assert!((summary.total_carbon_kg - 2100.0).abs() < 1e-9);
        assert_eq!(summary.recent.len(), 5);
        assert_eq!(summary.recent[0].building_id, "B6");
        assert_eq!(summary.markers.len(), 6);
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let reference = reference();
        let mut service = ProjectService::open(Box::new(MemoryProjectStore::new())).unwrap();
        service.save_draft(&draft("GOOD"), &reference, now(0)).unwrap();

        let mut huge = draft("HUGE");
        huge.set_area(coerce_number("1e308"));
        let err = service.save_draft(&huge, &reference, now(1)).unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(service.projects().len(), 1);
        assert_eq!(service.projects()[0].building_id, "GOOD");
    }

    #[test]
    fn test_non_finite_record_is_rejected() {
        let reference = reference();
        let mut service = ProjectService::in_memory();
        let (mut record, _) = service.save_draft(&draft("A"), &reference, now(0)).unwrap();

        record.lat = Some(f64::NAN);
        assert!(matches!(service.update(record.clone()), Err(Error::InvalidInput(_))));
        record.lat = None;
        record.custom_carbon_factors.insert("concrete".to_string(), f64::INFINITY);
        assert!(matches!(service.update(record), Err(Error::InvalidInput(_))));
        assert!(service.projects()[0].custom_carbon_factors.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_list_unchanged() {
        struct BrokenStore;
        impl ProjectStore for BrokenStore {
            fn get_projects(&self) -> Result<Option<Vec<ProjectRecord>>> {
                Ok(None)
            }
            fn save_projects(&self, _projects: &[ProjectRecord]) -> Result<()> {
                Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
            }
            fn location(&self) -> String {
                "broken".to_string()
            }
        }

        let reference = reference();
        let mut service = ProjectService::open(Box::new(BrokenStore)).unwrap();
        assert!(service.save_draft(&draft("A"), &reference, now(0)).is_err());
        assert!(service.projects().is_empty());
    }
}
