use crate::error::ScheduleError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names of the task table.
pub mod columns {
    pub const TASK_ID: &str = "task_id";
    pub const TASK_CODE: &str = "task_code";
    pub const TASK_NAME: &str = "task_name";
    pub const TASK_TYPE: &str = "task_type";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const PREDECESSORS: &str = "predecessors";
    pub const SUCCESSORS: &str = "successors";

    pub const ALL: [&str; 8] = [
        TASK_ID,
        TASK_CODE,
        TASK_NAME,
        TASK_TYPE,
        START_DATE,
        END_DATE,
        PREDECESSORS,
        SUCCESSORS,
    ];
}

/// Source-assigned activity identifier. Sources emit either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Int(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Int(v) => write!(f, "{v}"),
            TaskId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        TaskId::Int(value)
    }
}

impl From<i32> for TaskId {
    fn from(value: i32) -> Self {
        TaskId::Int(value as i64)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId::Text(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        TaskId::Text(value)
    }
}

/// Activity categories as exported by Primavera P6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "TT_Task")]
    TaskDependent,
    #[serde(rename = "TT_Rsrc")]
    ResourceDependent,
    #[serde(rename = "TT_Mile")]
    StartMilestone,
    #[serde(rename = "TT_FinMile")]
    FinishMilestone,
    #[serde(rename = "TT_LOE")]
    LevelOfEffort,
    #[serde(rename = "TT_WBS")]
    WbsSummary,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::TaskDependent,
        TaskType::ResourceDependent,
        TaskType::StartMilestone,
        TaskType::FinishMilestone,
        TaskType::LevelOfEffort,
        TaskType::WbsSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::TaskDependent => "TT_Task",
            TaskType::ResourceDependent => "TT_Rsrc",
            TaskType::StartMilestone => "TT_Mile",
            TaskType::FinishMilestone => "TT_FinMile",
            TaskType::LevelOfEffort => "TT_LOE",
            TaskType::WbsSummary => "TT_WBS",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ScheduleError::InvalidData(format!("unknown task type '{s}'")))
    }
}

/// One raw activity as produced by a schedule source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub task_id: TaskId,
    pub task_code: String,
    pub task_name: String,
    pub task_type: TaskType,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

impl ActivityRecord {
    pub fn new(
        task_id: impl Into<TaskId>,
        task_code: impl Into<String>,
        task_name: impl Into<String>,
        task_type: TaskType,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_code: task_code.into(),
            task_name: task_name.into(),
            task_type,
            start_date,
            end_date,
        }
    }
}

/// Directed precedence relation: `predecessor_task_id` must precede `successor_task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecedenceEdge {
    pub predecessor_task_id: TaskId,
    pub successor_task_id: TaskId,
}

impl PrecedenceEdge {
    pub fn new(predecessor: impl Into<TaskId>, successor: impl Into<TaskId>) -> Self {
        Self {
            predecessor_task_id: predecessor.into(),
            successor_task_id: successor.into(),
        }
    }
}

/// Hashable value of a single task column, used to build join keys.
///
/// Ids are held in their text form so that an integer id column and a text id
/// column compare equal on `7` and `"7"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Id(TaskId),
    Text(String),
    Timestamp(NaiveDateTime),
    Ids(Vec<TaskId>),
}

/// An owned row of a schedule index.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: TaskId,
    pub task_code: String,
    pub task_name: String,
    pub task_type: TaskType,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
}

impl Task {
    pub fn from_record(
        record: &ActivityRecord,
        predecessors: Vec<TaskId>,
        successors: Vec<TaskId>,
    ) -> Self {
        Self {
            task_id: record.task_id.clone(),
            task_code: record.task_code.clone(),
            task_name: record.task_name.clone(),
            task_type: record.task_type,
            start_date: record.start_date,
            end_date: record.end_date,
            predecessors,
            successors,
        }
    }

    pub fn duration(&self) -> chrono::TimeDelta {
        self.end_date - self.start_date
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            columns::TASK_ID => FieldValue::Id(id_key(&self.task_id)),
            columns::TASK_CODE => FieldValue::Text(self.task_code.clone()),
            columns::TASK_NAME => FieldValue::Text(self.task_name.clone()),
            columns::TASK_TYPE => FieldValue::Text(self.task_type.as_str().to_string()),
            columns::START_DATE => FieldValue::Timestamp(self.start_date),
            columns::END_DATE => FieldValue::Timestamp(self.end_date),
            columns::PREDECESSORS => FieldValue::Ids(self.predecessors.iter().map(id_key).collect()),
            columns::SUCCESSORS => FieldValue::Ids(self.successors.iter().map(id_key).collect()),
            _ => return None,
        };
        Some(value)
    }

    pub fn from_dataframe_row(df: &DataFrame, row_idx: usize) -> PolarsResult<Self> {
        let task_id = id_at(df.column(columns::TASK_ID)?, row_idx)?.ok_or_else(|| {
            PolarsError::ComputeError(format!("task row {row_idx} missing task_id").into())
        })?;

        let task_code = df
            .column(columns::TASK_CODE)?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();

        let task_name = df
            .column(columns::TASK_NAME)?
            .str()?
            .get(row_idx)
            .unwrap_or("")
            .to_string();

        let raw_type = df.column(columns::TASK_TYPE)?.str()?.get(row_idx).unwrap_or("");
        let task_type = raw_type
            .parse::<TaskType>()
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?;

        Ok(Self {
            task_id,
            task_code,
            task_name,
            task_type,
            start_date: timestamp_at(df.column(columns::START_DATE)?, row_idx)?,
            end_date: timestamp_at(df.column(columns::END_DATE)?, row_idx)?,
            predecessors: ids_at(df.column(columns::PREDECESSORS)?, row_idx)?,
            successors: ids_at(df.column(columns::SUCCESSORS)?, row_idx)?,
        })
    }
}

fn id_key(id: &TaskId) -> TaskId {
    match id {
        TaskId::Text(s) => TaskId::Text(s.clone()),
        TaskId::Int(v) => TaskId::Text(v.to_string()),
    }
}

pub(crate) fn id_at(column: &Column, row_idx: usize) -> PolarsResult<Option<TaskId>> {
    match column.dtype() {
        DataType::Int64 => Ok(column.i64()?.get(row_idx).map(TaskId::Int)),
        DataType::String => Ok(column
            .str()?
            .get(row_idx)
            .map(|s| TaskId::Text(s.to_owned()))),
        other => Err(PolarsError::ComputeError(
            format!("unsupported task id dtype {other}").into(),
        )),
    }
}

pub(crate) fn ids_at(column: &Column, row_idx: usize) -> PolarsResult<Vec<TaskId>> {
    match column.list()?.get_as_series(row_idx) {
        Some(series) => ids_from_series(&series),
        None => Ok(Vec::new()),
    }
}

fn ids_from_series(series: &Series) -> PolarsResult<Vec<TaskId>> {
    match series.dtype() {
        DataType::Int64 => Ok(series.i64()?.into_iter().flatten().map(TaskId::Int).collect()),
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .flatten()
            .map(|s| TaskId::Text(s.to_owned()))
            .collect()),
        // an empty list built without an inner type
        DataType::Null => Ok(Vec::new()),
        other => Err(PolarsError::ComputeError(
            format!("unsupported task id list dtype {other}").into(),
        )),
    }
}

fn timestamp_at(column: &Column, row_idx: usize) -> PolarsResult<NaiveDateTime> {
    column
        .datetime()?
        .get(row_idx)
        .and_then(millis_to_timestamp)
        .ok_or_else(|| {
            PolarsError::ComputeError(
                format!("task row {row_idx} missing {}", column.name()).into(),
            )
        })
}

pub(crate) fn timestamp_to_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub(crate) fn millis_to_timestamp(ms: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse the timestamp spellings used by schedule exports and the command line.
/// A bare date is taken as midnight.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
