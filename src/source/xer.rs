use super::{ProjectData, ScheduleSource, project_not_found};
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{ActivityRecord, PrecedenceEdge, TaskId, TaskType, parse_timestamp};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const START_FIELDS: [&str; 3] = ["act_start_date", "early_start_date", "target_start_date"];
const END_FIELDS: [&str; 3] = ["act_end_date", "early_end_date", "target_end_date"];

/// One `%T` block: its `%F` header and `%R` rows.
#[derive(Debug, Clone, Default)]
struct XerTable {
    fields: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl XerTable {
    fn value<'r>(&self, row: &'r [String], field: &str) -> Option<&'r str> {
        self.fields
            .get(field)
            .and_then(|&i| row.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn require<'r>(&self, row: &'r [String], field: &str, table: &str) -> ScheduleResult<&'r str> {
        self.value(row, field).ok_or_else(|| {
            ScheduleError::InvalidData(format!("{table} row is missing '{field}'"))
        })
    }
}

/// A Primavera P6 XER export.
#[derive(Debug, Clone)]
pub struct XerFile {
    path: PathBuf,
    tables: HashMap<String, XerTable>,
}

impl XerFile {
    pub fn open<P: AsRef<Path>>(path: P) -> ScheduleResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let tables = read_tables(file)?;
        info!(
            path = %path.display(),
            tables = tables.len(),
            "opened xer file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            tables,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> ScheduleResult<Self> {
        Ok(Self {
            path: PathBuf::new(),
            tables: read_tables(reader)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&self, name: &str) -> Option<&XerTable> {
        self.tables.get(name)
    }

    fn project_id(&self, project_name: &str) -> ScheduleResult<String> {
        let projects = self
            .table("PROJECT")
            .ok_or_else(|| project_not_found(project_name))?;
        for row in &projects.rows {
            if projects.value(row, "proj_short_name") == Some(project_name) {
                return Ok(projects.require(row, "proj_id", "PROJECT")?.to_string());
            }
        }
        Err(project_not_found(project_name))
    }

    fn activities(&self, proj_id: &str) -> ScheduleResult<Vec<ActivityRecord>> {
        let Some(tasks) = self.table("TASK") else {
            return Ok(Vec::new());
        };
        let mut activities = Vec::new();
        for row in &tasks.rows {
            if tasks.value(row, "proj_id") != Some(proj_id) {
                continue;
            }
            let task_id = parse_id(tasks.require(row, "task_id", "TASK")?);
            let task_code = tasks.require(row, "task_code", "TASK")?;
            let task_name = tasks.value(row, "task_name").unwrap_or_default();
            let task_type: TaskType = tasks.require(row, "task_type", "TASK")?.parse()?;
            let start_date = first_timestamp(tasks, row, &START_FIELDS).ok_or_else(|| {
                ScheduleError::InvalidData(format!("task '{task_code}' has no start date"))
            })?;
            let end_date = first_timestamp(tasks, row, &END_FIELDS).ok_or_else(|| {
                ScheduleError::InvalidData(format!("task '{task_code}' has no end date"))
            })?;
            activities.push(ActivityRecord::new(
                task_id, task_code, task_name, task_type, start_date, end_date,
            ));
        }
        Ok(activities)
    }

    fn relationships(&self, proj_id: &str) -> ScheduleResult<Vec<PrecedenceEdge>> {
        let Some(preds) = self.table("TASKPRED") else {
            return Ok(Vec::new());
        };
        let mut edges = Vec::new();
        for row in &preds.rows {
            if preds.value(row, "proj_id").is_some_and(|p| p != proj_id) {
                continue;
            }
            let predecessor = parse_id(preds.require(row, "pred_task_id", "TASKPRED")?);
            let successor = parse_id(preds.require(row, "task_id", "TASKPRED")?);
            edges.push(PrecedenceEdge::new(predecessor, successor));
        }
        Ok(edges)
    }
}

impl ScheduleSource for XerFile {
    fn list_project_names(&self) -> ScheduleResult<Vec<String>> {
        let Some(projects) = self.table("PROJECT") else {
            return Ok(Vec::new());
        };
        Ok(projects
            .rows
            .iter()
            .filter_map(|row| projects.value(row, "proj_short_name"))
            .map(str::to_string)
            .collect())
    }

    fn load_project(&self, project_name: &str) -> ScheduleResult<ProjectData> {
        let proj_id = self.project_id(project_name)?;
        let activities = self.activities(&proj_id)?;
        let relationships = self.relationships(&proj_id)?;
        debug!(
            project = project_name,
            activities = activities.len(),
            relationships = relationships.len(),
            "loaded xer project"
        );
        Ok(ProjectData::new(activities, relationships))
    }
}

fn parse_id(raw: &str) -> TaskId {
    raw.parse::<i64>()
        .map(TaskId::Int)
        .unwrap_or_else(|_| TaskId::Text(raw.to_string()))
}

fn first_timestamp(
    table: &XerTable,
    row: &[String],
    fields: &[&str],
) -> Option<chrono::NaiveDateTime> {
    fields
        .iter()
        .filter_map(|field| table.value(row, field))
        .find_map(parse_timestamp)
}

fn read_tables<R: Read>(reader: R) -> ScheduleResult<HashMap<String, XerTable>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut tables: HashMap<String, XerTable> = HashMap::new();
    let mut current: Option<String> = None;

    for record in csv_reader.byte_records() {
        let record = record?;
        let mut cells = record.iter().map(|cell| String::from_utf8_lossy(cell).into_owned());
        let Some(marker) = cells.next() else {
            continue;
        };
        match marker.trim() {
            "%T" => {
                let name = cells.next().unwrap_or_default().trim().to_string();
                tables.entry(name.clone()).or_default();
                current = Some(name);
            }
            "%F" => {
                let table = current
                    .as_ref()
                    .and_then(|name| tables.get_mut(name))
                    .ok_or_else(|| ScheduleError::InvalidData("%F line outside a table".into()))?;
                table.fields = cells
                    .enumerate()
                    .map(|(i, field)| (field.trim().to_string(), i))
                    .collect();
            }
            "%R" => {
                let table = current
                    .as_ref()
                    .and_then(|name| tables.get_mut(name))
                    .ok_or_else(|| ScheduleError::InvalidData("%R line outside a table".into()))?;
                table.rows.push(cells.collect());
            }
            "%E" => break,
            // ERMHDR and anything unknown
            _ => {}
        }
    }

    Ok(tables)
}
