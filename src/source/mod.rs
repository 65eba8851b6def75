//! Schedule sources: where raw activities and relationships come from.
//!
//! The core never reads files itself. A [`ScheduleSource`] hands it the raw
//! records of one project, and [`ScheduleSource::load_index`] builds the
//! [`ScheduleIndex`] from them.

use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::ScheduleIndex;
use crate::task::{ActivityRecord, PrecedenceEdge};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod json;
pub mod memory;
pub mod xer;

pub use json::{JsonProjectFile, save_projects_to_json};
pub use memory::InMemorySource;
pub use xer::XerFile;

/// Raw records of one project snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub activities: Vec<ActivityRecord>,
    #[serde(default)]
    pub relationships: Vec<PrecedenceEdge>,
}

impl ProjectData {
    pub fn new(activities: Vec<ActivityRecord>, relationships: Vec<PrecedenceEdge>) -> Self {
        Self {
            activities,
            relationships,
        }
    }

    pub fn build_index(&self) -> ScheduleResult<ScheduleIndex> {
        ScheduleIndex::build(&self.activities, &self.relationships)
    }
}

pub trait ScheduleSource {
    fn list_project_names(&self) -> ScheduleResult<Vec<String>>;

    /// Fails with [`ScheduleError::ProjectNotFound`] when `project_name` is not in the source.
    fn load_project(&self, project_name: &str) -> ScheduleResult<ProjectData>;

    fn load_index(&self, project_name: &str) -> ScheduleResult<ScheduleIndex> {
        self.load_project(project_name)?.build_index()
    }
}

pub(crate) fn project_not_found(project_name: &str) -> ScheduleError {
    ScheduleError::ProjectNotFound {
        project: project_name.to_string(),
    }
}

/// Open a project file, choosing the reader from its extension.
pub fn open_source<P: AsRef<Path>>(path: P) -> ScheduleResult<Box<dyn ScheduleSource + Send + Sync>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xer") => Ok(Box::new(XerFile::open(path)?)),
        Some("json") => Ok(Box::new(JsonProjectFile::open(path)?)),
        _ => Err(ScheduleError::UnsupportedSource {
            path: path.to_path_buf(),
        }),
    }
}
