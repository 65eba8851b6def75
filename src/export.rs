//! CSV export of query results and comparisons.

use crate::compare::{ComparisonResult, ComparisonRow};
use crate::error::ScheduleResult;
use crate::query::TaskSubset;
use crate::task::{Task, TaskId};
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct TaskCsvRecord {
    task_id: String,
    task_code: String,
    task_name: String,
    task_type: &'static str,
    start_date: String,
    end_date: String,
    predecessors: String,
    successors: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            task_code: task.task_code.clone(),
            task_name: task.task_name.clone(),
            task_type: task.task_type.as_str(),
            start_date: format_timestamp(task.start_date),
            end_date: format_timestamp(task.end_date),
            predecessors: join_ids(&task.predecessors),
            successors: join_ids(&task.successors),
        }
    }
}

#[derive(Serialize)]
struct ComparisonCsvRecord {
    task_code: String,
    task_name: String,
    task_type: &'static str,
    start_date: String,
    end_date: String,
    task_code_other: String,
    start_date_other: String,
    end_date_other: String,
    start_diff_minutes: Option<i64>,
    end_diff_minutes: Option<i64>,
}

impl From<&ComparisonRow> for ComparisonCsvRecord {
    fn from(row: &ComparisonRow) -> Self {
        let other = row.other.as_ref();
        Self {
            task_code: row.current.task_code.clone(),
            task_name: row.current.task_name.clone(),
            task_type: row.current.task_type.as_str(),
            start_date: format_timestamp(row.current.start_date),
            end_date: format_timestamp(row.current.end_date),
            task_code_other: other.map(|t| t.task_code.clone()).unwrap_or_default(),
            start_date_other: other.map(|t| format_timestamp(t.start_date)).unwrap_or_default(),
            end_date_other: other.map(|t| format_timestamp(t.end_date)).unwrap_or_default(),
            start_diff_minutes: row.start_diff.map(|d: TimeDelta| d.num_minutes()),
            end_diff_minutes: row.end_diff.map(|d: TimeDelta| d.num_minutes()),
        }
    }
}

pub fn write_subset_csv<W: Write>(subset: &TaskSubset<'_>, writer: W) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for task in subset.tasks()? {
        writer.serialize(TaskCsvRecord::from(&task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_subset_to_csv<P: AsRef<Path>>(subset: &TaskSubset<'_>, path: P) -> ScheduleResult<()> {
    write_subset_csv(subset, File::create(path)?)
}

/// Unmatched rows leave the `_other` and diff columns empty.
pub fn write_comparison_csv<W: Write>(result: &ComparisonResult, writer: W) -> ScheduleResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in result.rows() {
        writer.serialize(ComparisonCsvRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_comparison_to_csv<P: AsRef<Path>>(
    result: &ComparisonResult,
    path: P,
) -> ScheduleResult<()> {
    write_comparison_csv(result, File::create(path)?)
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
