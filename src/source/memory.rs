use super::{ProjectData, ScheduleSource, project_not_found};
use crate::error::ScheduleResult;
use std::collections::BTreeMap;

/// Projects held in memory, listed in name order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    projects: BTreeMap<String, ProjectData>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, name: impl Into<String>, data: ProjectData) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: ProjectData) {
        self.projects.insert(name.into(), data);
    }
}

impl ScheduleSource for InMemorySource {
    fn list_project_names(&self) -> ScheduleResult<Vec<String>> {
        Ok(self.projects.keys().cloned().collect())
    }

    fn load_project(&self, project_name: &str) -> ScheduleResult<ProjectData> {
        self.projects
            .get(project_name)
            .cloned()
            .ok_or_else(|| project_not_found(project_name))
    }
}
