use super::{ProjectData, ScheduleSource, project_not_found};
use crate::error::ScheduleResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectEntry {
    name: String,
    #[serde(flatten)]
    data: ProjectData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectFileContents {
    projects: Vec<ProjectEntry>,
}

/// A JSON document holding one or more named projects:
///
/// ```json
/// {"projects": [{"name": "Plant", "activities": [...], "relationships": [...]}]}
/// ```
#[derive(Debug, Clone)]
pub struct JsonProjectFile {
    path: PathBuf,
    contents: ProjectFileContents,
}

impl JsonProjectFile {
    pub fn open<P: AsRef<Path>>(path: P) -> ScheduleResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let contents: ProjectFileContents = serde_json::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            projects = contents.projects.len(),
            "opened json project file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            contents,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write projects in the layout [`JsonProjectFile::open`] reads.
pub fn save_projects_to_json<P: AsRef<Path>>(
    projects: &[(&str, &ProjectData)],
    path: P,
) -> ScheduleResult<()> {
    let contents = ProjectFileContents {
        projects: projects
            .iter()
            .map(|(name, data)| ProjectEntry {
                name: name.to_string(),
                data: (*data).clone(),
            })
            .collect(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &contents)?;
    Ok(())
}

impl ScheduleSource for JsonProjectFile {
    fn list_project_names(&self) -> ScheduleResult<Vec<String>> {
        Ok(self
            .contents
            .projects
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }

    fn load_project(&self, project_name: &str) -> ScheduleResult<ProjectData> {
        self.contents
            .projects
            .iter()
            .find(|p| p.name == project_name)
            .map(|p| p.data.clone())
            .ok_or_else(|| project_not_found(project_name))
    }
}
